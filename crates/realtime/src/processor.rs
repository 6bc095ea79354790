//! Socket loop for one sync channel.
//!
//! Writes queued outbound frames, reads inbound frames into the
//! [`InboundQueue`], and exits on close, receive error, or cancellation.

use futures::{SinkExt, StreamExt};
use manga_core::types::ProjectId;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

use crate::messages::parse_inbound;
use crate::queue::InboundQueue;

/// Drive `ws` until it closes or `cancel` fires.
///
/// Outbound text arrives already serialized. Inbound text frames are
/// parsed into envelopes and queued; frames that fail to parse are logged
/// and skipped.
pub async fn run_session<S>(
    ws: WebSocketStream<S>,
    project_id: ProjectId,
    mut outbound: mpsc::UnboundedReceiver<String>,
    inbound: &InboundQueue,
    cancel: &CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(project_id = %project_id, "Session cancelled, sending close frame");
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            Some(text) = outbound.recv() => {
                if let Err(e) = sink.send(Message::Text(text)).await {
                    tracing::error!(project_id = %project_id, error = %e, "WebSocket send error");
                    break;
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_text(&text, project_id, inbound);
                }
                Some(Ok(Message::Binary(_))) => {
                    tracing::trace!(project_id = %project_id, "Ignoring binary frame");
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    // Handled by tungstenite.
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(project_id = %project_id, ?frame, "Sync channel closed by peer");
                    break;
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => {
                    tracing::error!(project_id = %project_id, error = %e, "WebSocket receive error");
                    break;
                }
                None => {
                    tracing::info!(project_id = %project_id, "Sync channel stream ended");
                    break;
                }
            },
        }
    }
}

/// Parse one text frame and queue it. Returns whether it was queued
/// without loss.
pub(crate) fn handle_text(text: &str, project_id: ProjectId, inbound: &InboundQueue) -> bool {
    match parse_inbound(text) {
        Ok(message) => {
            tracing::debug!(project_id = %project_id, kind = %message.kind, "Inbound message");
            inbound.push(message)
        }
        Err(e) => {
            tracing::warn!(
                project_id = %project_id,
                error = %e,
                raw_message = %text,
                "Failed to parse inbound message",
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueConfig;

    #[test]
    fn valid_frame_is_queued() {
        let queue = InboundQueue::new(QueueConfig::default());
        let id = uuid::Uuid::new_v4();
        assert!(handle_text(
            r#"{"type":"generation_progress","data":{"percent":40}}"#,
            id,
            &queue
        ));
        let msg = queue.try_pop().unwrap();
        assert_eq!(msg.kind, "generation_progress");
        assert_eq!(msg.data["percent"], 40);
    }

    #[test]
    fn malformed_frame_is_skipped() {
        let queue = InboundQueue::new(QueueConfig::default());
        assert!(!handle_text("{oops", uuid::Uuid::new_v4(), &queue));
        assert!(queue.is_empty());
        assert_eq!(queue.dropped(), 0);
    }
}
