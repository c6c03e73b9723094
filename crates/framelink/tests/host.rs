//! End-to-end tests of one embedded session: scripted frame surface,
//! in-memory message port pair, in-memory remote store. The "frame
//! side" is a responder task that logs every envelope it receives and
//! acknowledges anything that expects a reply.

use framelink::{EmbedHost, HostConfig, HostError};
use framelink_bridge::{
    memory_pair, InboundMessage, MemoryPort, MessageEnvelope, MessageKind, MessagePort,
};
use framelink_frame::{FrameConfig, FrameError, KeyboardInput, LoadStatus, ScriptedSurface};
use framelink_security::SecurityPolicy;
use framelink_sync::{Manual, MemoryStore};
use framelink_types::{
    AnnotationContext, AnnotationData, AnnotationId, Permission, ProjectRef, UserRef,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

type Host = EmbedHost<ScriptedSurface, MemoryPort, MemoryStore>;

const TOOL_ORIGIN: &str = "https://tool.example.com";
const HOST_ORIGIN: &str = "https://host.app";

fn base_config() -> HostConfig {
    HostConfig::new(
        FrameConfig::new(
            Url::parse("https://tool.example.com/embed").unwrap(),
            "p1",
            "u1",
            "tok",
        )
        .with_task("t1"),
        SecurityPolicy::new()
            .trust_domain("tool.example.com")
            .allow_origin(TOOL_ORIGIN)
            .with_own_origin(HOST_ORIGIN),
    )
}

fn build_host(config: HostConfig) -> (Host, MemoryPort, mpsc::Receiver<InboundMessage>) {
    let ((host_port, host_inbound), (frame_port, frame_inbound)) =
        memory_pair(HOST_ORIGIN, TOOL_ORIGIN);
    let host = EmbedHost::new(
        config,
        ScriptedSurface::always_ready(),
        host_port,
        host_inbound,
        MemoryStore::new(),
        Box::new(Manual),
    );
    (host, frame_port, frame_inbound)
}

/// Plays the embedded tool: logs everything, acks non-ack envelopes.
fn spawn_responder(
    port: MemoryPort,
    mut inbound: mpsc::Receiver<InboundMessage>,
) -> Arc<Mutex<Vec<MessageEnvelope>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&log);
    tokio::spawn(async move {
        while let Some(msg) = inbound.recv().await {
            let Ok(envelope) = serde_json::from_value::<MessageEnvelope>(msg.body) else {
                continue;
            };
            let wants_reply = envelope.kind != MessageKind::Ack;
            seen.lock().push(envelope.clone());
            if wants_reply {
                let reply = envelope.ack(json!({ "ok": true }));
                let _ = port.post(serde_json::to_value(&reply).unwrap()).await;
            }
        }
    });
    log
}

fn ctx_with(permissions: Vec<Permission>) -> AnnotationContext {
    AnnotationContext::new(UserRef::new("u1", "Ada"), ProjectRef::new("p1", "Scenes"))
        .with_permissions(permissions)
}

#[tokio::test]
async fn open_loads_frame_and_pushes_sealed_context() {
    let (host, frame_port, frame_inbound) = build_host(
        base_config()
            .with_seal_key("k1")
            .with_session_timeout(Duration::from_secs(60)),
    );
    let frame_log = spawn_responder(frame_port, frame_inbound);

    let ctx = ctx_with(vec![Permission::allow("edit", "annotation")])
        .with_metadata("api_token", json!("sekrit"))
        .with_metadata("color", json!("red"));
    host.open(ctx).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(host.frames().is_ready());
    assert_eq!(host.frame_state().unwrap().status, LoadStatus::Ready);

    // The frame received exactly one sealed context snapshot.
    let sealed = {
        let log = frame_log.lock();
        let msg = log
            .iter()
            .find(|e| e.kind == MessageKind::ContextSet)
            .expect("context pushed");
        msg.payload["sealed"].as_str().unwrap().to_string()
    };
    let restored = host.context().from_sealed(&sealed).unwrap();
    assert_eq!(restored.user.id, "u1");
    // Sensitive metadata never crosses the boundary in the clear.
    assert_eq!(restored.metadata["api_token"], json!("[redacted]"));
    assert_eq!(restored.metadata["color"], json!("red"));

    host.close().await;
}

#[tokio::test]
async fn untrusted_frame_url_is_blocked_and_logged() {
    let mut config = base_config();
    config.frame.url = Url::parse("https://evil.example.org/embed").unwrap();
    let (host, _frame_port, _frame_inbound) = build_host(config);

    let err = host.open(ctx_with(Vec::new())).await.unwrap_err();
    assert!(matches!(err, HostError::Frame(FrameError::Blocked { .. })));
    assert!(host.security().violation_count() > 0);
    assert!(host.frame_state().is_none());
}

#[tokio::test]
async fn inbound_edit_lands_in_sync_queue_and_is_acked() {
    let (host, frame_port, frame_inbound) = build_host(base_config());
    let frame_log = spawn_responder(frame_port.clone(), frame_inbound);
    host.open(ctx_with(Vec::new())).await.unwrap();

    let edit = MessageEnvelope::new(
        MessageKind::AnnotationEdit,
        json!({
            "annotation_id": "a1",
            "data": { "label": "car" },
            "version": 1,
        }),
    )
    .with_source("frame");
    frame_port
        .post(serde_json::to_value(&edit).unwrap())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Queued without blocking, defaults filled from the session.
    assert_eq!(host.sync().pending_count(), 1);
    let cached = host.sync().cached(&AnnotationId::new("a1")).unwrap();
    assert_eq!(cached.task_id, "t1");
    assert_eq!(cached.user_id, "u1");

    // The frame got an acknowledgement under the edit's id.
    assert!(frame_log
        .lock()
        .iter()
        .any(|e| e.kind == MessageKind::Ack && e.id == edit.id));

    // A flush pushes the edit to the remote store.
    host.sync().sync_incremental().await;
    assert_eq!(host.sync().stats().completed, 1);

    host.close().await;
}

#[tokio::test]
async fn submit_bumps_version_and_queues_update() {
    let (host, frame_port, frame_inbound) = build_host(base_config());
    spawn_responder(frame_port.clone(), frame_inbound);
    host.open(ctx_with(Vec::new())).await.unwrap();

    let edit = MessageEnvelope::new(
        MessageKind::AnnotationEdit,
        json!({ "annotation_id": "a1", "data": { "label": "car" } }),
    );
    frame_port
        .post(serde_json::to_value(&edit).unwrap())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let submit = MessageEnvelope::new(
        MessageKind::AnnotationSubmit,
        json!({ "annotation_id": "a1" }),
    );
    frame_port
        .post(serde_json::to_value(&submit).unwrap())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(host.sync().pending_count(), 2);
    let cached = host.sync().cached(&AnnotationId::new("a1")).unwrap();
    assert_eq!(cached.version, 2);

    host.close().await;
}

#[tokio::test]
async fn host_edits_are_permission_gated() {
    let (host, frame_port, frame_inbound) = build_host(base_config());
    spawn_responder(frame_port, frame_inbound);
    host.open(ctx_with(Vec::new())).await.unwrap();

    let data = AnnotationData::new("a1", "t1", "u1", json!({ "label": "car" }));
    let err = host.edit_annotation(data.clone()).unwrap_err();
    assert!(matches!(err, HostError::PermissionDenied { .. }));
    assert_eq!(host.sync().pending_count(), 0);

    host.update_permissions(vec![Permission::allow("edit", "annotation")])
        .await
        .unwrap();
    assert!(host.can("edit", "annotation"));
    host.edit_annotation(data).unwrap();
    assert_eq!(host.sync().pending_count(), 1);

    // Delete stays denied: no permission and strict mode.
    let err = host
        .delete_annotation(AnnotationData::new("a1", "t1", "u1", json!({})))
        .unwrap_err();
    assert!(matches!(err, HostError::PermissionDenied { .. }));

    host.close().await;
}

#[tokio::test]
async fn permission_update_is_pushed_to_the_frame() {
    let (host, frame_port, frame_inbound) = build_host(base_config());
    let frame_log = spawn_responder(frame_port, frame_inbound);
    host.open(ctx_with(Vec::new())).await.unwrap();

    host.update_permissions(vec![Permission::allow("edit", "annotation")])
        .await
        .unwrap();

    let log = frame_log.lock();
    let msg = log
        .iter()
        .find(|e| e.kind == MessageKind::PermissionsUpdate)
        .expect("permissions pushed");
    let perms = msg.payload["permissions"].as_array().unwrap();
    assert_eq!(perms.len(), 1);
    drop(log);

    host.close().await;
}

#[tokio::test]
async fn ui_calls_mirror_state_and_forward_keys() {
    let (host, frame_port, frame_inbound) = build_host(base_config());
    let frame_log = spawn_responder(frame_port, frame_inbound);
    host.open(ctx_with(Vec::new())).await.unwrap();

    host.set_fullscreen(true).await.unwrap();
    host.resize(1280, 720).await.unwrap();
    host.focus_frame().await.unwrap();
    assert!(host.ui_state().fullscreen);
    assert_eq!(host.ui_state().width, 1280);
    assert!(host.ui_state().focused);

    host.forward_key(KeyboardInput::key("Escape")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(frame_log
        .lock()
        .iter()
        .any(|e| e.kind == MessageKind::KeyboardEvent && e.payload["key"] == json!("Escape")));

    host.close().await;
}

#[tokio::test]
async fn close_persists_pending_work_for_the_next_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("framelink-sync.json");

    let (host, frame_port, frame_inbound) = build_host(
        base_config()
            .with_state_path(&path)
            .with_sync(Duration::from_secs(300), 3),
    );
    spawn_responder(frame_port, frame_inbound);
    host.open(ctx_with(vec![Permission::allow("edit", "annotation")]))
        .await
        .unwrap();

    host.edit_annotation(AnnotationData::new("a1", "t1", "u1", json!({ "label": "car" })))
        .unwrap();
    host.close().await;
    assert!(path.exists());

    let (next, frame_port, frame_inbound) = build_host(
        base_config()
            .with_state_path(&path)
            .with_sync(Duration::from_secs(300), 3),
    );
    spawn_responder(frame_port, frame_inbound);
    next.open(ctx_with(Vec::new())).await.unwrap();

    assert_eq!(next.sync().pending_count(), 1);
    next.sync().sync_incremental().await;
    assert_eq!(next.sync().stats().completed, 1);

    next.close().await;
}

#[tokio::test]
async fn messages_from_unlisted_origins_never_reach_the_queue() {
    let ((host_port, host_inbound), _frame_side) = memory_pair(HOST_ORIGIN, TOOL_ORIGIN);
    // A rogue channel claiming a different origin.
    let (rogue_tx, rogue_inbound) = mpsc::channel::<InboundMessage>(8);
    drop(host_inbound);

    let host: Host = EmbedHost::new(
        base_config(),
        ScriptedSurface::always_ready(),
        host_port,
        rogue_inbound,
        MemoryStore::new(),
        Box::new(Manual),
    );

    let edit = MessageEnvelope::new(
        MessageKind::AnnotationEdit,
        json!({ "annotation_id": "a1", "data": {} }),
    );
    rogue_tx
        .send(InboundMessage {
            origin: "https://attacker.example.org".into(),
            body: serde_json::to_value(&edit).unwrap(),
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(host.sync().pending_count(), 0);
    assert!(host.security().violation_count() > 0);

    host.close().await;
}
