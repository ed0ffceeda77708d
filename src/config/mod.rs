//! Configuration: environment variables and the game-parameters file

use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::store::PlayerProfile;

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address.
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Path to the binary terrain heightmap.
    pub terrain_path: PathBuf,
    /// Path to the JSON game-parameters file.
    pub parameters_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT; fall back to SERVER_ADDR or the
        // default.
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            terrain_path: env::var("TERRAIN_PATH")
                .unwrap_or_else(|_| "./map.esmap".to_string())
                .into(),

            parameters_path: env::var("GAME_PARAMETERS_PATH")
                .unwrap_or_else(|_| "./game.json".to_string())
                .into(),
        })
    }
}

/// The game-parameters file: one game id plus every registered player
/// profile, each embedding its plane model.
#[derive(Debug, Clone, Deserialize)]
pub struct GameParameters {
    #[serde(rename = "gameId")]
    pub game_id: String,
    #[serde(rename = "profiles")]
    pub players: Vec<PlayerProfile>,
}

impl GameParameters {
    /// Load and decode the parameters file. Fatal at startup on any
    /// failure.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("failed to read game parameters: {0}")]
    Io(#[from] io::Error),

    #[error("failed to decode game parameters: {0}")]
    Json(#[from] serde_json::Error),
}
