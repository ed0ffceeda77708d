//! In-memory registry of registered player profiles
//!
//! Profiles come from the game-parameters file. A connecting client
//! checks its profile out of the pool, which also enforces one session
//! per access key; the profile goes back when the session ends.

use dashmap::DashMap;
use serde::Deserialize;
use uuid::Uuid;

use crate::world::PlaneModel;

/// A registered player, as declared in the game-parameters file.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerProfile {
    #[serde(rename = "username")]
    pub name: String,
    #[serde(rename = "accessKey")]
    pub access_key: Uuid,
    pub uid: u8,
    #[serde(rename = "planeModel")]
    pub plane_model: PlaneModel,
}

/// Concurrent profile pool plus the set of connected players.
pub struct PlayerRegistry {
    pool: DashMap<Uuid, PlayerProfile>,
    connected: DashMap<u8, PlayerProfile>,
}

impl PlayerRegistry {
    pub fn new(profiles: Vec<PlayerProfile>) -> Self {
        let pool = DashMap::new();
        for profile in profiles {
            pool.insert(profile.access_key, profile);
        }
        Self {
            pool,
            connected: DashMap::new(),
        }
    }

    /// Claim the profile for `access_key`. Returns None for an unknown
    /// key or one whose session is already live.
    pub fn checkout(&self, access_key: &Uuid) -> Option<PlayerProfile> {
        self.pool.remove(access_key).map(|(_, profile)| profile)
    }

    /// Return a claimed profile to the pool without it ever having
    /// connected (e.g. the world rejected the join).
    pub fn putback(&self, profile: PlayerProfile) {
        self.pool.insert(profile.access_key, profile);
    }

    /// Record a claimed profile as connected.
    pub fn connect(&self, profile: PlayerProfile) {
        self.connected.insert(profile.uid, profile);
    }

    /// Remove a connected player and return its profile to the pool.
    pub fn disconnect(&self, uid: u8) {
        if let Some((_, profile)) = self.connected.remove(&uid) {
            self.pool.insert(profile.access_key, profile);
        }
    }

    /// Uids of everyone currently connected.
    pub fn roster(&self) -> Vec<u8> {
        self.connected.iter().map(|entry| *entry.key()).collect()
    }

    pub fn connected_count(&self) -> usize {
        self.connected.len()
    }
}
