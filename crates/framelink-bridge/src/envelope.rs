//! The wire envelope.
//!
//! Every message crossing the host/frame boundary is a
//! [`MessageEnvelope`] with a closed [`MessageKind`]. Kinds the
//! receiving side does not know are not dispatched "just in case" —
//! deserialization fails on an unknown tag and the message is reported
//! as a security violation. The same goes for a known kind whose
//! payload fails its shape check.

use crate::BridgeError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use framelink_types::MessageId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Closed set of message kinds understood by both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Host → frame: a sealed context snapshot.
    ContextSet,
    /// Host → frame: the permission list changed mid-session.
    PermissionsUpdate,
    /// Host → frame: a forwarded keyboard event.
    KeyboardEvent,
    /// Host → frame: a UI command (fullscreen, resize, focus, ...).
    UiCommand,
    /// Frame → host: an annotation was created or edited.
    AnnotationEdit,
    /// Frame → host: an annotation was submitted for review.
    AnnotationSubmit,
    /// Either direction: reply correlated to a prior message by id.
    Ack,
    /// Either direction: the peer failed to process a message.
    Error,
}

impl MessageKind {
    /// Wire tag for this kind (the serde snake_case name).
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ContextSet => "context_set",
            Self::PermissionsUpdate => "permissions_update",
            Self::KeyboardEvent => "keyboard_event",
            Self::UiCommand => "ui_command",
            Self::AnnotationEdit => "annotation_edit",
            Self::AnnotationSubmit => "annotation_submit",
            Self::Ack => "ack",
            Self::Error => "error",
        }
    }

    /// Checks `payload` against this kind's shape requirements.
    ///
    /// `Ack` payloads are free-form (correlation happens by envelope
    /// id); every other kind requires specific fields.
    pub fn validate_payload(&self, payload: &Value) -> Result<(), String> {
        match self {
            Self::ContextSet => require_str_field(payload, "sealed"),
            Self::PermissionsUpdate => match payload.get("permissions") {
                Some(Value::Array(_)) => Ok(()),
                _ => Err("permissions_update payload requires a `permissions` array".into()),
            },
            Self::KeyboardEvent => require_str_field(payload, "key"),
            Self::UiCommand => require_str_field(payload, "command"),
            Self::AnnotationEdit => {
                require_str_field(payload, "annotation_id")?;
                if payload.get("data").is_none() {
                    return Err("annotation_edit payload requires a `data` field".into());
                }
                Ok(())
            }
            Self::AnnotationSubmit => require_str_field(payload, "annotation_id"),
            Self::Ack => Ok(()),
            Self::Error => require_str_field(payload, "message"),
        }
    }
}

fn require_str_field(payload: &Value, field: &str) -> Result<(), String> {
    match payload.get(field) {
        Some(Value::String(_)) => Ok(()),
        _ => Err(format!("payload requires a string `{field}` field")),
    }
}

/// One message on the wire.
///
/// The id is assigned by the sender and stays stable across retries;
/// the receiving side deduplicates by it and replies (kind
/// [`MessageKind::Ack`]) under the same id.
///
/// # Example
///
/// ```
/// use framelink_bridge::{MessageEnvelope, MessageKind};
/// use serde_json::json;
///
/// let msg = MessageEnvelope::new(
///     MessageKind::UiCommand,
///     json!({ "command": "fullscreen", "enabled": true }),
/// );
/// assert!(msg.validate().is_ok());
///
/// let reply = msg.ack(json!({ "applied": true }));
/// assert_eq!(reply.id, msg.id);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Sender-assigned id, stable across retries.
    pub id: MessageId,
    /// Message kind (closed set).
    pub kind: MessageKind,
    /// Kind-specific payload.
    pub payload: Value,
    /// When the envelope was built (not when it was (re)posted).
    pub timestamp: DateTime<Utc>,
    /// Keyed digest over the envelope, when signing is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Free-form sender label ("host", "frame").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl MessageEnvelope {
    /// Builds an envelope stamped now with a fresh id.
    #[must_use]
    pub fn new(kind: MessageKind, payload: Value) -> Self {
        Self {
            id: MessageId::new(),
            kind,
            payload,
            timestamp: Utc::now(),
            signature: None,
            source: None,
        }
    }

    /// Sets the sender label.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Builds the reply to this envelope: kind `Ack`, same id.
    #[must_use]
    pub fn ack(&self, payload: Value) -> Self {
        Self {
            id: self.id,
            kind: MessageKind::Ack,
            payload,
            timestamp: Utc::now(),
            signature: None,
            source: None,
        }
    }

    /// Validates the payload against the kind's shape requirements.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidEnvelope`] with the shape failure.
    pub fn validate(&self) -> Result<(), BridgeError> {
        self.kind
            .validate_payload(&self.payload)
            .map_err(|reason| BridgeError::InvalidEnvelope { reason })
    }

    /// Computes the keyed digest for this envelope.
    ///
    /// Covers id, kind, and payload; excludes the timestamp so a
    /// retried envelope keeps a valid signature after restamping.
    #[must_use]
    pub fn compute_signature(&self, key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hasher.update(self.id.uuid().as_bytes());
        hasher.update(self.kind.tag().as_bytes());
        hasher.update(self.payload.to_string().as_bytes());
        BASE64.encode(hasher.finalize())
    }

    /// Returns `true` if the envelope carries a digest matching `key`.
    #[must_use]
    pub fn verify_signature(&self, key: &str) -> bool {
        self.signature
            .as_deref()
            .is_some_and(|sig| sig == self.compute_signature(key))
    }
}
