//! Wirebench relay server binary.

use std::sync::Arc;
use tracing::info;
use wirebench_server::{AppState, ServerConfig, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wirebench_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let state = Arc::new(AppState::new());
    let app = router(state, &config);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Wirebench relay listening on {}", addr);
    info!("Serving static files from {}", config.static_dir.display());
    info!("WebSocket endpoint: ws://localhost:{}/ws", config.port);

    axum::serve(listener, app).await?;
    Ok(())
}
