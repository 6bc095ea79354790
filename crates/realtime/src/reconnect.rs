//! Exponential-backoff reconnection for sync channels.
//!
//! Channels never reconnect themselves. A caller that wants to keep a
//! project's channel alive calls [`reconnect_loop`] after a channel
//! reaches `Disconnected`; it keeps opening fresh channels with growing
//! delays until one connects or the [`CancellationToken`] fires.

use std::time::Duration;

use manga_core::types::ProjectId;
use tokio_util::sync::CancellationToken;

use crate::channel::{ConnectionState, SyncChannel};
use crate::client::SyncClient;
use crate::queue::QueueConfig;

pub struct ReconnectConfig {
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Next backoff delay, clamped to [`ReconnectConfig::max_delay`]. A
/// product that is not a valid duration also yields the ceiling.
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    Duration::try_from_secs_f64(current.as_secs_f64() * config.multiplier)
        .map_or(config.max_delay, |next| next.min(config.max_delay))
}

/// Open channels for `project_id` until one connects.
///
/// Returns `Some(channel)` in `Connected` state, or `None` if `cancel`
/// fires first.
pub async fn reconnect_loop(
    client: &SyncClient,
    project_id: ProjectId,
    queue: QueueConfig,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
) -> Option<SyncChannel> {
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        tracing::info!(project_id = %project_id, attempt, "Reconnecting sync channel");

        let mut channel = SyncChannel::open(client, project_id, queue);
        let settled = tokio::select! {
            _ = cancel.cancelled() => None,
            state = channel.wait_settled() => Some(state),
        };

        match settled {
            None => {
                tracing::info!(project_id = %project_id, "Reconnect cancelled");
                channel.close().await;
                return None;
            }
            Some(ConnectionState::Connected) => {
                tracing::info!(project_id = %project_id, attempt, "Sync channel reconnected");
                return Some(channel);
            }
            Some(_) => {
                tracing::warn!(
                    project_id = %project_id,
                    delay_ms = delay.as_millis() as u64,
                    "Reconnect attempt {attempt} failed",
                );
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        delay = next_delay(delay, config);
    }
}
