//! `manga-editor` -- headless editor session.
//!
//! Restores the persisted project state, keeps the realtime channel for
//! the current project open, and reconciles backend events into the
//! store until interrupted. Configuration is read from the environment
//! (see [`EditorConfig::from_env`]).

use manga_editor::{EditorConfig, EditorSession};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "manga_editor=info,manga_realtime=info,manga_store=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EditorConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        api_url = %config.api_url,
        ws_url = %config.ws_url,
        storage_dir = %config.storage_dir.display(),
        reconnect = config.reconnect,
        "Starting manga-editor",
    );

    let mut session = EditorSession::start(config).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to start editor session");
        std::process::exit(1);
    });

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
        }
        trigger.cancel();
    });

    if let Err(e) = session.run(shutdown).await {
        tracing::error!(error = %e, "Editor session failed");
    }

    if let Err(e) = session.shutdown().await {
        tracing::error!(error = %e, "Failed to persist state on shutdown");
        std::process::exit(1);
    }
}
