//! WebSocket client for the backend's project sync endpoint.
//!
//! [`SyncClient`] holds the base URL only. Each call to
//! [`SyncClient::connect`] dials `{ws_url}/ws/{project_id}` and hands back
//! the raw stream; [`SyncChannel`](crate::channel::SyncChannel) owns it
//! from there.

use manga_core::types::ProjectId;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::channel::SyncError;

pub type SyncStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, Clone)]
pub struct SyncClient {
    ws_url: String,
}

impl SyncClient {
    /// * `ws_url` - WebSocket base URL, e.g. `ws://localhost:8000`.
    pub fn new(ws_url: impl Into<String>) -> Self {
        let ws_url: String = ws_url.into();
        Self {
            ws_url: ws_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Full channel URL for a project.
    pub fn channel_url(&self, project_id: ProjectId) -> String {
        format!("{}/ws/{}", self.ws_url, project_id)
    }

    pub async fn connect(&self, project_id: ProjectId) -> Result<SyncStream, SyncError> {
        let url = self.channel_url(project_id);
        let (ws_stream, _response) = connect_async(&url)
            .await
            .map_err(|e| SyncError::Connection(format!("Failed to connect to {url}: {e}")))?;

        tracing::info!(project_id = %project_id, url = %url, "Sync channel connected");
        Ok(ws_stream)
    }
}
