//! The message port abstraction.
//!
//! A [`MessagePort`] is the transport half of the bridge: something
//! that can post a JSON body toward the other side. Inbound traffic
//! arrives on a plain mpsc channel of [`InboundMessage`]s, so the
//! bridge's receive pump is transport-agnostic. Production hosts back
//! this with the embedding environment's cross-window channel;
//! [`memory_pair`] builds a connected in-process pair for tests.

use crate::BridgeError;
use serde_json::Value;
use std::future::Future;
use tokio::sync::mpsc;

/// Channel capacity for in-memory port pairs.
const MEMORY_PORT_CAPACITY: usize = 64;

/// One message as observed at the port.
///
/// The body is raw JSON on purpose: envelope parsing happens inside
/// the bridge, after the origin check, so malformed traffic can be
/// reported instead of silently failing in the transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Origin the transport attributes the message to.
    pub origin: String,
    /// Raw message body.
    pub body: Value,
}

/// Transport capable of posting a message to the other side.
pub trait MessagePort: Send + Sync + 'static {
    /// Posts a serialized envelope toward the peer.
    ///
    /// Failing with [`BridgeError::PortClosed`] means the peer is gone
    /// for good; the bridge does not retry closed ports.
    fn post(&self, body: Value) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

/// In-process port: posts land on the peer's inbound channel, tagged
/// with this port's origin.
#[derive(Debug, Clone)]
pub struct MemoryPort {
    origin: String,
    peer: mpsc::Sender<InboundMessage>,
}

impl MessagePort for MemoryPort {
    async fn post(&self, body: Value) -> Result<(), BridgeError> {
        self.peer
            .send(InboundMessage {
                origin: self.origin.clone(),
                body,
            })
            .await
            .map_err(|_| BridgeError::PortClosed)
    }
}

/// Builds two connected in-memory ports.
///
/// Each side gets `(port, inbound)`: what the other side posts shows
/// up on `inbound`, attributed to the other side's origin.
#[must_use]
pub fn memory_pair(
    origin_a: &str,
    origin_b: &str,
) -> (
    (MemoryPort, mpsc::Receiver<InboundMessage>),
    (MemoryPort, mpsc::Receiver<InboundMessage>),
) {
    let (to_a, inbound_a) = mpsc::channel(MEMORY_PORT_CAPACITY);
    let (to_b, inbound_b) = mpsc::channel(MEMORY_PORT_CAPACITY);
    let port_a = MemoryPort {
        origin: origin_a.to_string(),
        peer: to_b,
    };
    let port_b = MemoryPort {
        origin: origin_b.to_string(),
        peer: to_a,
    };
    ((port_a, inbound_a), (port_b, inbound_b))
}
