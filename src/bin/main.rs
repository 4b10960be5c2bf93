use std::sync::Arc;

use anyhow::Result;
use bzzr::{AppState, build_app, cleanup_inactive_rooms, config::ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bzzr=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(?config, "Starting server on {}", config.bind_addr());

    let state = Arc::new(AppState::from_config(&config));
    let cleanup_state = state.clone();
    let app = build_app(state);

    let cleanup_interval = config.cleanup_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            cleanup_inactive_rooms(&cleanup_state).await;
        }
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("Server running on http://{}", config.bind_addr());
    axum::serve(listener, app).await?;
    Ok(())
}
