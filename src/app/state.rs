//! Application state shared across routes

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::store::PlayerRegistry;
use crate::world::WorldHandle;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<PlayerRegistry>,
    /// Handle into the running world actor.
    pub world: WorldHandle,
    /// Connect/disconnect announces, fanned out to every socket writer
    /// alongside the world's snapshot stream.
    pub announce_tx: broadcast::Sender<Bytes>,
    pub game_id: String,
}

impl AppState {
    pub fn new(registry: PlayerRegistry, world: WorldHandle, game_id: String) -> Self {
        let (announce_tx, _) = broadcast::channel(64);

        Self {
            registry: Arc::new(registry),
            world,
            announce_tx,
            game_id,
        }
    }
}
