//! The message bridge.
//!
//! Reliability layer over a [`MessagePort`]:
//!
//! ```text
//!  send(env) ──► validate ──► sign ──► post ──► await reply ──► Ok(reply)
//!                                │                  │ timeout
//!                                └◄─── retry, same id (≤ max_retries)
//!
//!  inbound ──► origin check ──► parse ──► payload check ──► signature
//!                 │ deny          │ fail       │ fail          │ fail
//!                 ▼               ▼            ▼               ▼
//!              dropped + reported to the security manager
//!                                                  │ pass
//!                    pending id? ── resolve send ◄─┘
//!                    duplicate id? ── re-ack, not re-dispatched
//!                    otherwise ── dispatched to subscribers
//! ```
//!
//! Retries reuse the message id, so the receiving side deduplicates
//! and the sender can never observe two deliveries of one logical
//! message. Dispatch order follows post order for sequential sends.

use crate::{BridgeError, InboundMessage, MessageEnvelope, MessageKind, MessagePort};
use framelink_event::Emitter;
use framelink_security::SecurityPolicyManager;
use framelink_types::MessageId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How many message ids the dedupe window remembers.
const DEDUPE_WINDOW: usize = 1024;

/// Bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// How long one attempt waits for a correlated reply.
    pub timeout: Duration,
    /// Additional attempts after the first timeout.
    pub max_retries: u32,
    /// Envelope signing key; `None` disables signing and verification.
    pub sign_key: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 2,
            sign_key: None,
        }
    }
}

/// Sliding window of recently seen message ids.
struct SeenIds {
    set: HashSet<MessageId>,
    order: VecDeque<MessageId>,
}

impl SeenIds {
    fn new() -> Self {
        Self {
            set: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Returns `false` if the id was already in the window.
    fn insert(&mut self, id: MessageId) -> bool {
        if !self.set.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > DEDUPE_WINDOW {
            if let Some(evicted) = self.order.pop_front() {
                self.set.remove(&evicted);
            }
        }
        true
    }
}

/// Reliable, origin-checked messaging over a [`MessagePort`].
///
/// Construction binds the port and spawns the receive pump; must be
/// created inside a tokio runtime.
pub struct MessageBridge<P: MessagePort> {
    port: Arc<P>,
    config: BridgeConfig,
    pending: Arc<Mutex<HashMap<MessageId, oneshot::Sender<MessageEnvelope>>>>,
    emitter: Emitter<MessageEnvelope>,
    alive: Arc<AtomicBool>,
    pump: Mutex<Option<JoinHandle<()>>>,
    /// Serializes posts so sequential sends reach the wire in order.
    post_order: tokio::sync::Mutex<()>,
}

impl<P: MessagePort> MessageBridge<P> {
    /// Binds `port` and starts pumping `inbound`.
    #[must_use]
    pub fn new(
        port: P,
        inbound: mpsc::Receiver<InboundMessage>,
        security: Arc<SecurityPolicyManager>,
        config: BridgeConfig,
    ) -> Self {
        let port = Arc::new(port);
        let pending: Arc<Mutex<HashMap<MessageId, oneshot::Sender<MessageEnvelope>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let emitter = Emitter::new();
        let alive = Arc::new(AtomicBool::new(true));

        let pump = tokio::spawn(Self::pump(
            Arc::clone(&port),
            inbound,
            security,
            config.sign_key.clone(),
            Arc::clone(&pending),
            emitter.clone(),
            Arc::clone(&alive),
        ));

        Self {
            port,
            config,
            pending,
            emitter,
            alive,
            pump: Mutex::new(Some(pump)),
            post_order: tokio::sync::Mutex::new(()),
        }
    }

    /// Sends an envelope and waits for the correlated reply.
    ///
    /// Times out per attempt and retries with the same id up to
    /// `max_retries` times; the receiving side deduplicates, so
    /// retries are safe.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::InvalidEnvelope`] before anything is posted
    /// - [`BridgeError::Timeout`] after all attempts go unanswered
    /// - [`BridgeError::PortClosed`] if the transport rejects a post
    /// - [`BridgeError::TornDown`] after [`cleanup`](Self::cleanup)
    pub async fn send(&self, envelope: MessageEnvelope) -> Result<MessageEnvelope, BridgeError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(BridgeError::TornDown);
        }
        envelope.validate()?;

        let mut envelope = envelope;
        if let Some(key) = &self.config.sign_key {
            envelope.signature = Some(envelope.compute_signature(key));
        }
        let body = serde_json::to_value(&envelope).map_err(|e| BridgeError::InvalidEnvelope {
            reason: format!("serialize failed: {e}"),
        })?;

        let attempts = self.config.max_retries + 1;
        for attempt in 1..=attempts {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().insert(envelope.id, tx);

            {
                let _order = self.post_order.lock().await;
                self.port.post(body.clone()).await?;
            }

            match tokio::time::timeout(self.config.timeout, rx).await {
                Ok(Ok(reply)) => return Ok(reply),
                Ok(Err(_)) => return Err(BridgeError::TornDown),
                Err(_) => {
                    self.pending.lock().remove(&envelope.id);
                    debug!(id = %envelope.id, attempt, "no reply, retrying");
                }
            }
        }

        warn!(id = %envelope.id, attempts, "message unanswered, giving up");
        Err(BridgeError::Timeout {
            id: envelope.id,
            attempts,
        })
    }

    /// Posts an envelope without waiting for a reply.
    ///
    /// Used for acks and fire-and-forget traffic (keyboard events,
    /// UI commands that need no confirmation).
    pub async fn notify(&self, envelope: MessageEnvelope) -> Result<(), BridgeError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(BridgeError::TornDown);
        }
        envelope.validate()?;

        let mut envelope = envelope;
        if let Some(key) = &self.config.sign_key {
            envelope.signature = Some(envelope.compute_signature(key));
        }
        let body = serde_json::to_value(&envelope).map_err(|e| BridgeError::InvalidEnvelope {
            reason: format!("serialize failed: {e}"),
        })?;

        let _order = self.post_order.lock().await;
        self.port.post(body).await
    }

    /// Hub for inbound envelopes that passed every check and are not
    /// replies to a pending send.
    #[must_use]
    pub fn events(&self) -> &Emitter<MessageEnvelope> {
        &self.emitter
    }

    /// Number of sends currently awaiting a reply.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Tears the bridge down: stops the pump, fails every pending
    /// send with [`BridgeError::TornDown`], detaches subscribers.
    pub fn cleanup(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            debug!("bridge cleaned up");
        }
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }
        self.pending.lock().clear();
        self.emitter.clear();
    }

    async fn pump(
        port: Arc<P>,
        mut inbound: mpsc::Receiver<InboundMessage>,
        security: Arc<SecurityPolicyManager>,
        sign_key: Option<String>,
        pending: Arc<Mutex<HashMap<MessageId, oneshot::Sender<MessageEnvelope>>>>,
        emitter: Emitter<MessageEnvelope>,
        alive: Arc<AtomicBool>,
    ) {
        let mut seen = SeenIds::new();

        while let Some(msg) = inbound.recv().await {
            if !alive.load(Ordering::SeqCst) {
                break;
            }

            // Origin first; the security manager records the denial.
            if !security.is_origin_allowed(&msg.origin) {
                continue;
            }

            let envelope: MessageEnvelope = match serde_json::from_value(msg.body) {
                Ok(envelope) => envelope,
                Err(err) => {
                    security.report_message_violation(
                        &msg.origin,
                        &format!("malformed envelope: {err}"),
                    );
                    continue;
                }
            };

            if let Err(reason) = envelope.kind.validate_payload(&envelope.payload) {
                security.report_message_violation(
                    &msg.origin,
                    &format!("{} rejected: {reason}", envelope.kind.tag()),
                );
                continue;
            }

            if let Some(key) = &sign_key {
                if !envelope.verify_signature(key) {
                    security.report_message_violation(&msg.origin, "signature mismatch");
                    continue;
                }
            }

            // Correlated reply to a pending send.
            if let Some(tx) = pending.lock().remove(&envelope.id) {
                let _ = tx.send(envelope);
                continue;
            }
            if envelope.kind == MessageKind::Ack {
                // Reply to a send that already timed out.
                debug!(id = %envelope.id, "late ack dropped");
                continue;
            }

            if !seen.insert(envelope.id) {
                // A retry of something already dispatched; re-ack so
                // the sender can settle, but do not re-dispatch.
                debug!(id = %envelope.id, "duplicate, re-acking");
                let mut ack = envelope.ack(serde_json::Value::Null);
                if let Some(key) = &sign_key {
                    ack.signature = Some(ack.compute_signature(key));
                }
                if let Ok(body) = serde_json::to_value(&ack) {
                    let _ = port.post(body).await;
                }
                continue;
            }

            emitter.emit(&envelope);
        }
    }
}

impl<P: MessagePort> Drop for MessageBridge<P> {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }
    }
}
