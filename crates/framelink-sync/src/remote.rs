//! The remote annotation store client.
//!
//! [`RemoteStore`] is the transport seam of the sync engine: pushing
//! one operation and fetching everything for a full sync.
//! [`HttpRemoteStore`] speaks the REST interface (`POST
//! /api/annotations`, where HTTP 409 with the remote record as body
//! signals a version conflict); [`MemoryStore`] is the scripted
//! in-process implementation backing the tests.

use crate::{SyncError, SyncOperation};
use framelink_types::{AnnotationData, AnnotationId};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use tracing::debug;
use url::Url;

/// Result of pushing one operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    /// The remote store accepted the write.
    Accepted,
    /// The remote store holds a conflicting version.
    Conflict {
        /// The remote side of the conflict.
        remote: AnnotationData,
    },
}

/// Transport to the annotation backend.
pub trait RemoteStore: Send + Sync + 'static {
    /// Pushes one operation.
    ///
    /// A version conflict is a successful round-trip with
    /// [`PushOutcome::Conflict`]; errors are reserved for transport
    /// and server failures.
    fn push(&self, op: &SyncOperation) -> impl Future<Output = Result<PushOutcome, SyncError>> + Send;

    /// Fetches every annotation visible to this session.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<AnnotationData>, SyncError>> + Send;
}

/// REST client for the annotation backend.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpRemoteStore {
    /// Builds a client rooted at `base` (e.g. `https://api.example.com/`).
    ///
    /// # Errors
    ///
    /// [`SyncError::Persist`] is never returned here; a malformed base
    /// URL yields [`SyncError::Remote`] with status 0.
    pub fn new(base: &Url) -> Result<Self, SyncError> {
        let endpoint = base.join("api/annotations").map_err(|e| SyncError::Remote {
            status: 0,
            detail: format!("invalid base url: {e}"),
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }
}

impl RemoteStore for HttpRemoteStore {
    async fn push(&self, op: &SyncOperation) -> Result<PushOutcome, SyncError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({
                "op": op.kind,
                "annotation": op.data,
            }))
            .send()
            .await
            .map_err(|e| SyncError::Network {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if status.as_u16() == 409 {
            let remote: AnnotationData =
                response.json().await.map_err(|e| SyncError::Remote {
                    status: 409,
                    detail: format!("conflict body unreadable: {e}"),
                })?;
            debug!(id = %remote.id, remote_version = remote.version, "remote reported conflict");
            return Ok(PushOutcome::Conflict { remote });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SyncError::Remote {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(PushOutcome::Accepted)
    }

    async fn fetch_all(&self) -> Result<Vec<AnnotationData>, SyncError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| SyncError::Network {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SyncError::Remote {
                status: status.as_u16(),
                detail,
            });
        }
        response.json().await.map_err(|e| SyncError::Remote {
            status: status.as_u16(),
            detail: format!("response body unreadable: {e}"),
        })
    }
}

/// In-process store with scriptable failures.
///
/// Accepts a push when it is strictly newer than the stored version;
/// otherwise answers with a conflict carrying the stored record —
/// the same protocol the HTTP backend speaks.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<AnnotationId, AnnotationData>>,
    fail_next: AtomicU32,
    pushes: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-loads a record, bypassing the push protocol.
    pub fn seed(&self, data: AnnotationData) {
        self.records.lock().insert(data.id.clone(), data);
    }

    /// Makes the next `n` pushes fail with a network error.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Number of push attempts observed (including failed ones).
    #[must_use]
    pub fn push_count(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }

    /// Current record for `id`.
    #[must_use]
    pub fn get(&self, id: &AnnotationId) -> Option<AnnotationData> {
        self.records.lock().get(id).cloned()
    }
}

impl RemoteStore for MemoryStore {
    async fn push(&self, op: &SyncOperation) -> Result<PushOutcome, SyncError> {
        self.pushes.fetch_add(1, Ordering::SeqCst);

        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(SyncError::Network {
                detail: "scripted failure".into(),
            });
        }

        let mut records = self.records.lock();
        match op.kind {
            crate::OpKind::Delete => {
                records.remove(&op.data.id);
            }
            crate::OpKind::Create | crate::OpKind::Update => {
                if let Some(existing) = records.get(&op.data.id) {
                    if existing.version >= op.data.version {
                        return Ok(PushOutcome::Conflict {
                            remote: existing.clone(),
                        });
                    }
                }
                records.insert(op.data.id.clone(), op.data.clone());
            }
        }
        Ok(PushOutcome::Accepted)
    }

    async fn fetch_all(&self) -> Result<Vec<AnnotationData>, SyncError> {
        Ok(self.records.lock().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpKind;
    use serde_json::json;

    fn op(version: u64) -> SyncOperation {
        let mut data = AnnotationData::new("a1", "t1", "u1", json!({}));
        data.version = version;
        SyncOperation::new(OpKind::Update, data)
    }

    #[tokio::test]
    async fn newer_push_accepted_stale_push_conflicts() {
        let store = MemoryStore::new();
        assert_eq!(store.push(&op(1)).await.unwrap(), PushOutcome::Accepted);
        assert_eq!(store.push(&op(2)).await.unwrap(), PushOutcome::Accepted);

        match store.push(&op(2)).await.unwrap() {
            PushOutcome::Conflict { remote } => assert_eq!(remote.version, 2),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn scripted_failures_then_recovery() {
        let store = MemoryStore::new();
        store.fail_next(2);

        assert!(store.push(&op(1)).await.is_err());
        assert!(store.push(&op(1)).await.is_err());
        assert_eq!(store.push(&op(1)).await.unwrap(), PushOutcome::Accepted);
        assert_eq!(store.push_count(), 3);
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let store = MemoryStore::new();
        store.seed(AnnotationData::new("a1", "t1", "u1", json!({})));

        let mut delete = op(2);
        delete.kind = OpKind::Delete;
        store.push(&delete).await.unwrap();
        assert!(store.get(&AnnotationId::new("a1")).is_none());
        assert!(store.fetch_all().await.unwrap().is_empty());
    }
}
