//! The embedded-tool host.
//!
//! [`EmbedHost`] owns one embedded annotation session end to end:
//!
//! ```text
//!                 ┌────────────────── EmbedHost ──────────────────┐
//!  open(ctx) ──►  │ policy check → frame create → context seal    │
//!                 │        │                          │           │
//!                 │  FrameManager                MessageBridge ◄──┼── frame
//!                 │        │                          │           │
//!  edit/submit ─► │ PermissionController      inbound edits       │
//!                 │        │                          ▼           │
//!  UI calls ────► │  UiCoordinator ──────────► SyncManager ───────┼─► backend
//!                 └───────────────────────────────────────────────┘
//! ```
//!
//! Inbound `annotation_edit`/`annotation_submit` envelopes (already
//! origin-checked and shape-checked by the bridge) land in the sync
//! queue and are acknowledged back to the frame; host-side edits go
//! through the permission controller first.

use crate::{HostConfig, HostError};
use framelink_auth::{ControllerConfig, PermissionController, PermissionRule};
use framelink_bridge::{InboundMessage, MessageBridge, MessageEnvelope, MessageKind, MessagePort};
use framelink_context::{ContextConfig, ContextManager};
use framelink_frame::{
    FrameManager, FrameSurface, KeyboardInput, LoadState, UiCoordinator, UiState,
};
use framelink_security::SecurityPolicyManager;
use framelink_sync::{
    ConflictStrategy, FileStateStore, OpKind, RemoteStore, SyncConfig, SyncManager,
};
use framelink_types::{
    AnnotationContext, AnnotationData, AnnotationId, AnnotationStatus, OperationId, Permission,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One embedded annotation session.
///
/// Generic over the three environment seams: the frame surface `S`,
/// the message port `P`, and the remote store `R`. Production hosts
/// plug in their embedding environment; tests use the scripted
/// in-process doubles.
pub struct EmbedHost<S: FrameSurface, P: MessagePort, R: RemoteStore> {
    config: HostConfig,
    security: Arc<SecurityPolicyManager>,
    frames: FrameManager<S>,
    bridge: Arc<MessageBridge<P>>,
    context: ContextManager,
    permissions: PermissionController,
    sync: Arc<SyncManager<R>>,
    ui: UiCoordinator<S, P>,
}

impl<S: FrameSurface, P: MessagePort, R: RemoteStore> EmbedHost<S, P, R> {
    /// Wires the components together. Must run inside a tokio runtime.
    ///
    /// The security policy is applied immediately; everything else
    /// stays inert until [`open`](Self::open).
    #[must_use]
    pub fn new(
        config: HostConfig,
        surface: Arc<S>,
        port: P,
        inbound: mpsc::Receiver<InboundMessage>,
        remote: R,
        strategy: Box<dyn ConflictStrategy>,
    ) -> Self {
        let security = Arc::new(SecurityPolicyManager::new(config.policy.clone()));
        security.initialize();

        let bridge = Arc::new(MessageBridge::new(
            port,
            inbound,
            Arc::clone(&security),
            config.bridge.clone(),
        ));
        let frames = FrameManager::new(Arc::clone(&surface), Arc::clone(&security));
        let context = ContextManager::new(ContextConfig {
            session_timeout: config.session_timeout,
            seal_key: config.seal_key.clone(),
        });
        let permissions = PermissionController::new(ControllerConfig {
            strict_mode: config.strict_mode,
            ..ControllerConfig::default()
        });
        let sync = Arc::new(SyncManager::new(
            remote,
            strategy,
            SyncConfig {
                interval: config.sync_interval,
                max_retries: config.sync_max_retries,
            },
            config.state_path.as_ref().map(FileStateStore::new),
        ));
        let ui = UiCoordinator::new(Arc::clone(&surface), Arc::clone(&bridge));

        Self::wire_inbound(
            &bridge,
            &sync,
            config
                .frame
                .task_id
                .clone()
                .unwrap_or_else(|| config.frame.project_id.clone()),
            config.frame.user_id.clone(),
        );

        Self {
            config,
            security,
            frames,
            bridge,
            context,
            permissions,
            sync,
            ui,
        }
    }

    /// Routes inbound annotation envelopes into the sync queue and
    /// acknowledges them so the frame's send resolves.
    fn wire_inbound(
        bridge: &Arc<MessageBridge<P>>,
        sync: &Arc<SyncManager<R>>,
        default_task: String,
        default_user: String,
    ) {
        let sync = Arc::clone(sync);
        let replier = Arc::clone(bridge);
        bridge.events().subscribe(move |envelope: &MessageEnvelope| {
            let reply = match envelope.kind {
                MessageKind::AnnotationEdit => {
                    queue_edit(&sync, &envelope.payload, &default_task, &default_user)
                        .map(|op| envelope.ack(json!({ "queued": op.to_string() })))
                }
                MessageKind::AnnotationSubmit => queue_submit(&sync, &envelope.payload)
                    .map(|op| envelope.ack(json!({ "queued": op.to_string() }))),
                _ => None,
            };
            if let Some(reply) = reply {
                let bridge = Arc::clone(&replier);
                tokio::spawn(async move {
                    if let Err(err) = bridge.notify(reply).await {
                        warn!(error = %err, "edit acknowledgement failed");
                    }
                });
            }
        });
    }

    /// Opens the session: creates the frame, installs the context,
    /// restores any persisted sync state, starts periodic sync, and
    /// pushes the sealed context into the frame.
    ///
    /// # Errors
    ///
    /// Frame policy/lifecycle failures, context validation failures,
    /// sync restore failures, or a context push that goes unanswered.
    pub async fn open(&self, ctx: AnnotationContext) -> Result<(), HostError> {
        self.frames.create(self.config.frame.clone())?;
        self.context.set_context(ctx)?;
        self.sync.restore().await?;
        self.sync.start();
        self.push_context().await?;
        info!("session opened");
        Ok(())
    }

    /// Seals the active context and pushes it into the frame,
    /// waiting for the frame's acknowledgement.
    pub async fn push_context(&self) -> Result<(), HostError> {
        let sealed = self.context.sealed()?;
        let envelope = MessageEnvelope::new(MessageKind::ContextSet, json!({ "sealed": sealed }))
            .with_source("host");
        self.bridge.send(envelope).await?;
        debug!("context pushed");
        Ok(())
    }

    /// Checks the active context for `action` on `resource`.
    ///
    /// No active (or an expired) context denies everything.
    #[must_use]
    pub fn can(&self, action: &str, resource: &str) -> bool {
        self.context
            .get_context()
            .is_some_and(|ctx| self.permissions.check_permission(&ctx, action, resource))
    }

    /// Swaps the user's permission list mid-session and notifies the
    /// frame.
    pub async fn update_permissions(&self, permissions: Vec<Permission>) -> Result<(), HostError> {
        let ctx = self
            .context
            .get_context()
            .ok_or(framelink_context::ContextError::NoActiveContext)?;
        let updated = self.permissions.update_user_permissions(&ctx, permissions);
        let payload = json!({
            "permissions": serde_json::to_value(&updated.permissions)
                .unwrap_or_else(|_| Value::Array(Vec::new())),
        });
        self.context.set_context(updated)?;
        let envelope =
            MessageEnvelope::new(MessageKind::PermissionsUpdate, payload).with_source("host");
        self.bridge.send(envelope).await?;
        info!("permissions updated");
        Ok(())
    }

    /// Registers a permission rule on the controller.
    pub fn add_permission_rule(&self, rule: PermissionRule) -> Result<(), HostError> {
        self.permissions.add_rule(rule)?;
        Ok(())
    }

    /// Queues a host-side annotation write, permission-gated.
    ///
    /// # Errors
    ///
    /// [`HostError::PermissionDenied`] when the active context does
    /// not allow `edit` on `annotation`.
    pub fn edit_annotation(&self, data: AnnotationData) -> Result<OperationId, HostError> {
        self.gate("edit", "annotation")?;
        let kind = if data.version > 1 {
            OpKind::Update
        } else {
            OpKind::Create
        };
        Ok(self.sync.add_operation(kind, data))
    }

    /// Queues an annotation deletion, permission-gated.
    pub fn delete_annotation(&self, data: AnnotationData) -> Result<OperationId, HostError> {
        self.gate("delete", "annotation")?;
        Ok(self.sync.add_operation(OpKind::Delete, data))
    }

    fn gate(&self, action: &str, resource: &str) -> Result<(), HostError> {
        if self.can(action, resource) {
            Ok(())
        } else {
            Err(HostError::PermissionDenied {
                action: action.to_string(),
                resource: resource.to_string(),
            })
        }
    }

    /// Enters or leaves fullscreen.
    pub async fn set_fullscreen(&self, enabled: bool) -> Result<(), HostError> {
        self.ui.set_fullscreen(enabled).await?;
        Ok(())
    }

    /// Resizes the frame.
    pub async fn resize(&self, width: u32, height: u32) -> Result<(), HostError> {
        self.ui.resize(width, height).await?;
        Ok(())
    }

    /// Moves input focus into the frame.
    pub async fn focus_frame(&self) -> Result<(), HostError> {
        self.ui.focus_frame().await?;
        Ok(())
    }

    /// Forwards a host keyboard event into the frame.
    pub async fn forward_key(&self, input: KeyboardInput) -> Result<(), HostError> {
        self.ui.forward_key(input).await?;
        Ok(())
    }

    /// Snapshot of the UI state.
    #[must_use]
    pub fn ui_state(&self) -> UiState {
        self.ui.ui_state()
    }

    /// Snapshot of the frame's load state.
    #[must_use]
    pub fn frame_state(&self) -> Option<LoadState> {
        self.frames.load_state()
    }

    /// Closes the session: persists sync state, tears down the frame,
    /// the bridge, and the context. Safe to call more than once.
    pub async fn close(&self) {
        self.sync.destroy().await;
        self.frames.destroy().await;
        self.bridge.cleanup();
        self.context.destroy();
        info!("session closed");
    }

    /// The security policy manager.
    #[must_use]
    pub fn security(&self) -> &Arc<SecurityPolicyManager> {
        &self.security
    }

    /// The frame manager.
    #[must_use]
    pub fn frames(&self) -> &FrameManager<S> {
        &self.frames
    }

    /// The message bridge.
    #[must_use]
    pub fn bridge(&self) -> &Arc<MessageBridge<P>> {
        &self.bridge
    }

    /// The context manager.
    #[must_use]
    pub fn context(&self) -> &ContextManager {
        &self.context
    }

    /// The permission controller.
    #[must_use]
    pub fn permissions(&self) -> &PermissionController {
        &self.permissions
    }

    /// The sync engine.
    #[must_use]
    pub fn sync(&self) -> &Arc<SyncManager<R>> {
        &self.sync
    }

    /// The UI coordinator.
    #[must_use]
    pub fn ui(&self) -> &UiCoordinator<S, P> {
        &self.ui
    }
}

/// Turns an `annotation_edit` payload into a queued operation.
///
/// The bridge already guarantees `annotation_id` and `data` exist;
/// task/user fall back to the session defaults when absent.
fn queue_edit<R: RemoteStore>(
    sync: &SyncManager<R>,
    payload: &Value,
    default_task: &str,
    default_user: &str,
) -> Option<OperationId> {
    let id = payload.get("annotation_id")?.as_str()?;
    let body = payload.get("data")?.clone();
    let task = payload
        .get("task_id")
        .and_then(Value::as_str)
        .unwrap_or(default_task);
    let user = payload
        .get("user_id")
        .and_then(Value::as_str)
        .unwrap_or(default_user);
    let version = payload.get("version").and_then(Value::as_u64).unwrap_or(1);

    let mut data = AnnotationData::new(id, task, user, body);
    data.version = version;
    let kind = if version > 1 {
        OpKind::Update
    } else {
        OpKind::Create
    };
    debug!(annotation = %data.id, ?kind, "inbound edit queued");
    Some(sync.add_operation(kind, data))
}

/// Turns an `annotation_submit` payload into a queued status update.
///
/// Submission only makes sense for an annotation the session has seen;
/// unknown ids are dropped with a warning.
fn queue_submit<R: RemoteStore>(sync: &SyncManager<R>, payload: &Value) -> Option<OperationId> {
    let id = AnnotationId::new(payload.get("annotation_id")?.as_str()?);
    let Some(cached) = sync.cached(&id) else {
        warn!(annotation = %id, "submit for unknown annotation dropped");
        return None;
    };
    let mut submitted = cached.bump_version();
    submitted.status = AnnotationStatus::Submitted;
    debug!(annotation = %id, version = submitted.version, "submission queued");
    Some(sync.add_operation(OpKind::Update, submitted))
}
