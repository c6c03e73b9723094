//! Sealed transport codec for context snapshots.
//!
//! A context leaving the host crosses an untrusted boundary (the
//! frame's query string or a postMessage payload), so it is encoded
//! rather than shipped as raw JSON:
//!
//! 1. metadata keys matching the sensitive denylist are redacted,
//! 2. the snapshot is serialized to JSON,
//! 3. with a seal key configured, the bytes are XOR'd with a
//!    SHA-256-derived keystream,
//! 4. the result is base64-encoded behind a version prefix
//!    (`p1.` plain, `s1.` sealed).
//!
//! The keystream is obfuscation against casual inspection of embed
//! URLs, not cryptographic protection; authorization always happens
//! server-side against the token.

use crate::ContextError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use framelink_types::AnnotationContext;
use serde_json::Value;
use sha2::{Digest, Sha256};

const PLAIN_PREFIX: &str = "p1.";
const SEALED_PREFIX: &str = "s1.";

/// Metadata keys whose values never cross the boundary.
const SENSITIVE_KEY_FRAGMENTS: &[&str] = &["password", "token", "secret", "key", "auth"];

const REDACTED: &str = "[redacted]";

/// Returns `true` if a metadata key must be redacted before export.
#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEY_FRAGMENTS.iter().any(|f| lower.contains(f))
}

/// Returns a copy of `ctx` with sensitive metadata values replaced.
#[must_use]
pub fn redact(ctx: &AnnotationContext) -> AnnotationContext {
    let mut out = ctx.clone();
    for (key, value) in out.metadata.iter_mut() {
        if is_sensitive_key(key) {
            *value = Value::String(REDACTED.to_string());
        }
    }
    out
}

/// Encodes a redacted context for transport.
///
/// With `key = None` the output is versioned base64 JSON; with a key
/// it is additionally XOR'd with a keystream derived from the key.
pub fn seal(ctx: &AnnotationContext, key: Option<&str>) -> Result<String, ContextError> {
    let redacted = redact(ctx);
    let mut bytes =
        serde_json::to_vec(&redacted).map_err(|e| ContextError::InvalidSealedContext {
            reason: format!("serialize failed: {e}"),
        })?;

    match key {
        Some(key) => {
            apply_keystream(&mut bytes, key);
            Ok(format!("{SEALED_PREFIX}{}", BASE64.encode(bytes)))
        }
        None => Ok(format!("{PLAIN_PREFIX}{}", BASE64.encode(bytes))),
    }
}

/// Decodes transport data produced by [`seal`].
///
/// # Errors
///
/// [`ContextError::InvalidSealedContext`] on an unknown prefix, bad
/// base64, a key mismatch (sealed data without the matching key), or
/// JSON that does not describe a context.
pub fn unseal(data: &str, key: Option<&str>) -> Result<AnnotationContext, ContextError> {
    let (sealed, body) = if let Some(rest) = data.strip_prefix(SEALED_PREFIX) {
        (true, rest)
    } else if let Some(rest) = data.strip_prefix(PLAIN_PREFIX) {
        (false, rest)
    } else {
        return Err(ContextError::InvalidSealedContext {
            reason: "unrecognized prefix".into(),
        });
    };

    let mut bytes = BASE64
        .decode(body)
        .map_err(|_| ContextError::InvalidSealedContext {
            reason: "invalid base64".into(),
        })?;

    if sealed {
        let key = key.ok_or_else(|| ContextError::InvalidSealedContext {
            reason: "sealed data requires a key".into(),
        })?;
        apply_keystream(&mut bytes, key);
    }

    serde_json::from_slice(&bytes).map_err(|_| ContextError::InvalidSealedContext {
        reason: "payload is not a context snapshot".into(),
    })
}

/// XORs `data` in place with a SHA-256 keystream over (key, counter).
///
/// Symmetric: applying twice with the same key restores the input.
fn apply_keystream(data: &mut [u8], key: &str) {
    for (block_index, chunk) in data.chunks_mut(32).enumerate() {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hasher.update((block_index as u64).to_be_bytes());
        let block = hasher.finalize();
        for (byte, pad) in chunk.iter_mut().zip(block.iter()) {
            *byte ^= pad;
        }
    }
}
