//! Dogfight Server - Authoritative multiplayer flight-combat server
//!
//! This is the main entry point for the game server. It handles:
//! - Loading the terrain heightmap and game parameters
//! - Spawning the world simulation actor
//! - WebSocket connections for real-time gameplay
//! - The /health endpoint

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dogfight_server::app::AppState;
use dogfight_server::config::{Config, GameParameters};
use dogfight_server::http::build_router;
use dogfight_server::store::PlayerRegistry;
use dogfight_server::util::time::{init_server_time, simulation_interval, snapshot_interval};
use dogfight_server::world::{Terrain, World};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Dogfight Server");
    info!("Server address: {}", config.server_addr);

    // The world cannot run without terrain or parameters; fail fast.
    let terrain = Terrain::load(&config.terrain_path)
        .with_context(|| format!("loading terrain from {}", config.terrain_path.display()))?;
    let parameters = GameParameters::load(&config.parameters_path)
        .with_context(|| format!("loading game parameters from {}", config.parameters_path.display()))?;

    info!(
        game_id = %parameters.game_id,
        registered_players = parameters.players.len(),
        "Game parameters loaded"
    );

    let registry = PlayerRegistry::new(parameters.players);

    // Spawn the world actor
    let (world, world_handle) = World::new(Arc::new(terrain));
    tokio::spawn(world.run(simulation_interval(), snapshot_interval()));

    // Create application state
    let state = AppState::new(registry, world_handle.clone(), parameters.game_id);

    // Build router
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    world_handle.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
