//! Monad Snake server
//!
//! Pay-to-play snake: a player connects a wallet, pays the entry fee, plays
//! against the clock for reward tokens and claims them through the server.
//! Each WebSocket connection runs its own game session on the server.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod game;
mod identity;
mod journal;
mod protocol;
mod routes;
mod session;
mod settlement;
mod state;
mod wallet;
mod ws;

use config::ServerConfig;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "monad_snake=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let port = config.port;
    info!(
        "Treasury {}, entry fee {} MON, {} reward tokens",
        config.runtime.treasury,
        config.runtime.pay_amount,
        config.token_addresses.len()
    );

    let state = Arc::new(AppState::new(config));
    let app = routes::router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Snake server running on http://{}", addr);
    info!("   WebSocket endpoint: ws://localhost:{}/ws/snake", port);

    axum::serve(listener, app).await?;
    Ok(())
}
