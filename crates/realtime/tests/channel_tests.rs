//! End-to-end sync channel tests over an in-memory socket pair.
//!
//! The "backend" side is a plain server-role WebSocket on the other half
//! of a `tokio::io::duplex` pipe.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use futures::{SinkExt, StreamExt};
use manga_core::model::{Chapter, Layout, MangaStyle, Page, Panel, Project};
use manga_core::patch::PanelPatch;
use manga_realtime::reconcile::{reconcile_message, Reconciled};
use manga_realtime::{
    ConnectionState, OutboundMessage, OverflowPolicy, QueueConfig, SyncChannel, SyncError,
};
use manga_store::ProjectStore;
use tokio::io::DuplexStream;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

const WAIT: Duration = Duration::from_secs(5);

async fn pair(queue: QueueConfig) -> (SyncChannel, WebSocketStream<DuplexStream>) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let client_ws = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
    let server_ws = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
    let channel = SyncChannel::from_stream(uuid::Uuid::new_v4(), client_ws, queue);
    (channel, server_ws)
}

async fn next_text(server: &mut WebSocketStream<DuplexStream>) -> serde_json::Value {
    loop {
        let frame = tokio::time::timeout(WAIT, server.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("receive error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn wait_for_state(channel: &SyncChannel, want: ConnectionState) {
    let mut rx = channel.state_watch();
    tokio::time::timeout(WAIT, rx.wait_for(|s| *s == want))
        .await
        .expect("timed out waiting for state")
        .unwrap();
}

#[tokio::test]
async fn outbound_messages_arrive_as_json() {
    let (channel, mut server) = pair(QueueConfig::default()).await;
    assert_eq!(channel.state(), ConnectionState::Connected);

    let panel_id = uuid::Uuid::new_v4();
    channel.send(&OutboundMessage::StartGeneration).unwrap();
    channel
        .send(&OutboundMessage::EditPanel {
            panel_id,
            changes: PanelPatch::description("close-up"),
        })
        .unwrap();

    assert_eq!(next_text(&mut server).await, serde_json::json!({"type": "start_generation"}));
    let edit = next_text(&mut server).await;
    assert_eq!(edit["type"], "edit_panel");
    assert_eq!(edit["panelId"], panel_id.to_string());
    assert_eq!(edit["changes"]["description"], "close-up");
}

#[tokio::test]
async fn inbound_frames_are_queued_in_order() {
    let (channel, mut server) = pair(QueueConfig::default()).await;

    for percent in [10, 20, 30] {
        let frame = serde_json::json!({"type": "generation_progress", "data": {"percent": percent}});
        server.send(Message::Text(frame.to_string())).await.unwrap();
    }

    for percent in [10, 20, 30] {
        let msg = tokio::time::timeout(WAIT, channel.recv()).await.unwrap().unwrap();
        assert_eq!(msg.kind, "generation_progress");
        assert_eq!(msg.data["percent"], percent);
    }
}

#[tokio::test]
async fn malformed_inbound_frames_are_skipped() {
    let (channel, mut server) = pair(QueueConfig::default()).await;

    server.send(Message::Text("{broken".into())).await.unwrap();
    server
        .send(Message::Text(r#"{"type":"heartbeat"}"#.into()))
        .await
        .unwrap();

    let msg = tokio::time::timeout(WAIT, channel.recv()).await.unwrap().unwrap();
    assert_eq!(msg.kind, "heartbeat");
}

#[tokio::test]
async fn overflow_keeps_latest_with_drop_oldest() {
    let (channel, mut server) = pair(QueueConfig {
        capacity: 2,
        policy: OverflowPolicy::DropOldest,
    })
    .await;

    for i in 0..5 {
        let frame = serde_json::json!({"type": "tick", "data": {"i": i}});
        server.send(Message::Text(frame.to_string())).await.unwrap();
    }
    // A close frame marks the end of the burst.
    server.close(None).await.unwrap();
    wait_for_state(&channel, ConnectionState::Disconnected).await;

    let queue = channel.inbound();
    assert_eq!(queue.dropped(), 3);
    let seen: Vec<i64> = queue
        .drain()
        .into_iter()
        .map(|m| m.data["i"].as_i64().unwrap())
        .collect();
    assert_eq!(seen, vec![3, 4]);
}

#[tokio::test]
async fn peer_close_disconnects_and_rejects_sends() {
    let (channel, mut server) = pair(QueueConfig::default()).await;

    server.close(None).await.unwrap();
    wait_for_state(&channel, ConnectionState::Disconnected).await;

    assert_matches!(
        channel.send(&OutboundMessage::StartGeneration),
        Err(SyncError::NotConnected {
            state: ConnectionState::Disconnected
        })
    );
    assert!(tokio::time::timeout(WAIT, channel.recv()).await.unwrap().is_none());
}

#[tokio::test]
async fn close_sends_close_frame_to_peer() {
    let (mut channel, mut server) = pair(QueueConfig::default()).await;

    channel.close().await;
    assert_eq!(channel.state(), ConnectionState::Disconnected);

    let frame = tokio::time::timeout(WAIT, server.next()).await.unwrap();
    assert_matches!(frame, Some(Ok(Message::Close(_))));
}

#[tokio::test]
async fn inbound_events_reconcile_into_store() {
    let (channel, mut server) = pair(QueueConfig::default()).await;

    let page = Page::new(1, Layout::standard(1, 2), vec![Panel::new(1, "x"), Panel::new(2, "y")]);
    let project = Project::new("Relay", "", MangaStyle::Shojo)
        .with_chapters(vec![Chapter::new(1, "Start", vec![page])]);
    let page_id = project.chapters[0].pages[0].id;
    let panel_id = project.chapters[0].pages[0].panels[0].id;
    let mut store = ProjectStore::new();
    store.set_project(project);
    let before = Arc::clone(store.current_project().unwrap());

    let frames = [
        serde_json::json!({"type": "panel_generated", "data": {"panelId": panel_id, "imageUrl": "https://cdn/1.png"}}),
        serde_json::json!({"type": "page_completed", "data": {"pageId": page_id, "fullPageImage": "https://cdn/page.png"}}),
    ];
    for frame in &frames {
        server.send(Message::Text(frame.to_string())).await.unwrap();
    }

    for _ in &frames {
        let msg = tokio::time::timeout(WAIT, channel.recv()).await.unwrap().unwrap();
        assert_eq!(reconcile_message(&mut store, &msg).unwrap(), Reconciled::Applied);
    }

    assert_eq!(
        store.panel(panel_id).unwrap().image_url.as_deref(),
        Some("https://cdn/1.png")
    );
    assert_eq!(
        store.page(page_id).unwrap().full_page_image.as_deref(),
        Some("https://cdn/page.png")
    );
    assert_eq!(
        store.page(page_id).unwrap().panel_ids(),
        before.chapters[0].pages[0].panel_ids()
    );
}
