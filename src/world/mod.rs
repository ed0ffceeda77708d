//! World simulation actor
//!
//! The world owns every mutable entity. All access goes through one
//! `tokio::select!` loop over the command channel and the two periodic
//! timers, so no two operations ever touch entity state concurrently;
//! message passing replaces locking. Physics integrates on the
//! simulation timer; the snapshot timer serializes and broadcasts on an
//! independent, slower cadence.

pub mod bullet;
pub mod plane;
pub mod snapshot;
pub mod terrain;

pub use bullet::Bullet;
pub use plane::{Plane, PlaneInput, PlaneModel};
pub use terrain::{Terrain, TerrainError};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Raw control bytes addressed to one plane.
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub uid: u8,
    pub data: Bytes,
}

/// Errors surfaced over the world boundary.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("uid {0} already flies in this world")]
    AlreadyJoined(u8),

    #[error("world is no longer running")]
    Closed,
}

enum WorldCommand {
    Join {
        uid: u8,
        model: PlaneModel,
        ack: oneshot::Sender<Result<(), WorldError>>,
    },
    Leave {
        uid: u8,
    },
    Input(PlayerInput),
    Fire(Bullet),
    Shutdown,
}

/// Cloneable boundary API to a running world. Consumed by the transport
/// layer; every call is an asynchronous message into the world loop.
#[derive(Clone)]
pub struct WorldHandle {
    command_tx: mpsc::Sender<WorldCommand>,
    snapshot_tx: broadcast::Sender<Bytes>,
}

impl WorldHandle {
    /// Insert a plane for `uid`. A uid already flying is rejected; a
    /// retired plane that has not been reaped yet may be replaced.
    pub async fn join(&self, uid: u8, model: PlaneModel) -> Result<(), WorldError> {
        let (ack, response) = oneshot::channel();
        self.command_tx
            .send(WorldCommand::Join { uid, model, ack })
            .await
            .map_err(|_| WorldError::Closed)?;
        response.await.map_err(|_| WorldError::Closed)?
    }

    /// Retire the plane. Idempotent; unknown uids are ignored.
    pub async fn leave(&self, uid: u8) {
        let _ = self.command_tx.send(WorldCommand::Leave { uid }).await;
    }

    /// Route raw control bytes to a plane. Input for an unknown or
    /// departed plane is dropped without error.
    pub async fn apply_input(&self, uid: u8, data: Bytes) {
        let _ = self
            .command_tx
            .send(WorldCommand::Input(PlayerInput { uid, data }))
            .await;
    }

    /// Add a bullet to the live collection.
    pub async fn fire(&self, bullet: Bullet) {
        let _ = self.command_tx.send(WorldCommand::Fire(bullet)).await;
    }

    /// Stop the world loop.
    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(WorldCommand::Shutdown).await;
    }

    /// Subscribe to the binary snapshot stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Bytes> {
        self.snapshot_tx.subscribe()
    }
}

/// The authoritative world state. Created with [`World::new`], consumed
/// by [`World::run`].
pub struct World {
    terrain: Arc<Terrain>,
    planes: BTreeMap<u8, Plane>,
    bullets: Vec<Bullet>,
    command_rx: mpsc::Receiver<WorldCommand>,
    snapshot_tx: broadcast::Sender<Bytes>,
}

impl World {
    pub fn new(terrain: Arc<Terrain>) -> (World, WorldHandle) {
        let (command_tx, command_rx) = mpsc::channel(256);
        let (snapshot_tx, _) = broadcast::channel(64);

        let handle = WorldHandle {
            command_tx,
            snapshot_tx: snapshot_tx.clone(),
        };

        let world = World {
            terrain,
            planes: BTreeMap::new(),
            bullets: Vec::new(),
            command_rx,
            snapshot_tx,
        };

        (world, handle)
    }

    /// Run the world loop until shutdown or until every handle is gone.
    /// Physics advances by a fixed step derived from the simulation
    /// interval; snapshots go out on their own timer and never trigger a
    /// simulation step.
    pub async fn run(mut self, simulation_interval: Duration, snapshot_interval: Duration) {
        let mut simulation_timer = interval(simulation_interval);
        simulation_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut snapshot_timer = interval(snapshot_interval);
        snapshot_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let delta_t = simulation_interval.as_secs_f64();

        info!("world started");

        loop {
            tokio::select! {
                _ = simulation_timer.tick() => {
                    self.update(delta_t);
                }
                _ = snapshot_timer.tick() => {
                    // No receivers is fine; clients come and go.
                    let _ = self.snapshot_tx.send(snapshot::encode_snapshot(&self.planes));
                }
                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => {
                            if self.handle_command(command) {
                                break;
                            }
                        }
                        // Every handle dropped.
                        None => break,
                    }
                }
            }
        }

        info!("world stopped");
    }

    /// Apply one command. Returns true on shutdown.
    fn handle_command(&mut self, command: WorldCommand) -> bool {
        match command {
            WorldCommand::Join { uid, model, ack } => {
                let _ = ack.send(self.add_plane(uid, model));
            }
            WorldCommand::Leave { uid } => self.retire_plane(uid),
            WorldCommand::Input(input) => self.apply_input(&input),
            WorldCommand::Fire(bullet) => self.bullets.push(bullet),
            WorldCommand::Shutdown => {
                info!("world shutting down");
                return true;
            }
        }
        false
    }

    fn add_plane(&mut self, uid: u8, model: PlaneModel) -> Result<(), WorldError> {
        if let Some(existing) = self.planes.get(&uid) {
            if !existing.is_retired() {
                warn!(uid, "join rejected, uid already in world");
                return Err(WorldError::AlreadyJoined(uid));
            }
        }

        self.planes.insert(uid, Plane::new(uid, model));
        info!(uid, "plane joined");
        Ok(())
    }

    fn retire_plane(&mut self, uid: u8) {
        if let Some(plane) = self.planes.get_mut(&uid) {
            plane.retire();
            info!(uid, "plane leaving");
        }
    }

    fn apply_input(&mut self, input: &PlayerInput) {
        // May be a race with leave; input for a gone plane is dropped.
        if let Some(plane) = self.planes.get_mut(&input.uid) {
            plane.apply_input(&input.data);
        }
    }

    /// One simulation tick: reap retired planes, advance all bullets,
    /// then all planes in uid order. The order is fixed so runs are
    /// reproducible.
    fn update(&mut self, delta_t: f64) {
        self.planes.retain(|_, plane| !plane.is_retired());

        self.bullets.retain_mut(|bullet| {
            let live = bullet.update(delta_t);
            if live {
                bullet.advance(delta_t);
            }
            live
        });

        for plane in self.planes.values_mut() {
            plane.update(delta_t, &self.terrain);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::matrix::Matrix3;
    use crate::math::vector::Vec3;

    fn model() -> PlaneModel {
        PlaneModel {
            max_thrust: 50_000.0,
            mass: 4_000.0,
            max_rotations: Vec3::new(0.314159265358979, 0.314159265358979, 1.0),
            drag_factors: Vec3::new(0.05, 0.005, 0.05),
            lift_min: 0.0005,
            lift_max: 0.0007,
            default_speed: 150.0,
        }
    }

    /// Flat 4x4 grid at height zero, 1000 units apart.
    fn wide_terrain() -> Arc<Terrain> {
        let mut data = Vec::new();
        data.extend_from_slice(&4u16.to_le_bytes());
        data.extend_from_slice(&4u16.to_le_bytes());
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&1000.0f32.to_le_bytes());
        for _ in 0..16 {
            data.extend_from_slice(&0u16.to_le_bytes());
        }
        Arc::new(Terrain::from_bytes(&data).unwrap())
    }

    fn test_world() -> World {
        World::new(wide_terrain()).0
    }

    #[test]
    fn duplicate_join_is_rejected() {
        let mut world = test_world();

        assert!(world.add_plane(1, model()).is_ok());
        assert!(matches!(
            world.add_plane(1, model()),
            Err(WorldError::AlreadyJoined(1))
        ));
    }

    #[test]
    fn retired_plane_may_be_replaced_before_reap() {
        let mut world = test_world();

        world.add_plane(1, model()).unwrap();
        world.retire_plane(1);
        assert!(world.add_plane(1, model()).is_ok());
    }

    #[test]
    fn leave_is_idempotent_and_reaped_on_tick() {
        let mut world = test_world();

        world.add_plane(1, model()).unwrap();
        world.retire_plane(1);
        world.retire_plane(1);
        world.retire_plane(42);

        assert_eq!(world.planes.len(), 1);
        world.update(0.01);
        assert!(world.planes.is_empty());
    }

    #[test]
    fn input_after_leave_is_dropped_without_touching_others() {
        let mut world = test_world();

        world.add_plane(1, model()).unwrap();
        world.add_plane(2, model()).unwrap();
        world.retire_plane(1);
        world.update(0.01);

        let before = *world.planes.get(&2).unwrap().input();
        world.apply_input(&PlayerInput {
            uid: 1,
            data: Bytes::from_static(&[0x3, 50, 50, 50, 200, 0x80]),
        });
        world.update(0.01);

        assert_eq!(*world.planes.get(&2).unwrap().input(), before);
        assert!(!world.planes.contains_key(&1));
    }

    #[test]
    fn input_reaches_the_addressed_plane() {
        let mut world = test_world();
        world.add_plane(1, model()).unwrap();

        world.apply_input(&PlayerInput {
            uid: 1,
            data: Bytes::from_static(&[0x3, 12, 12, 12, 26, 0x80]),
        });

        assert!(world.planes.get(&1).unwrap().input().is_firing);
    }

    #[test]
    fn bullets_expire_and_are_dropped() {
        let mut world = test_world();
        world.bullets.push(Bullet::new(
            1,
            Vec3::default(),
            &Matrix3::IDENTITY,
            400.0,
            12,
        ));

        for _ in 0..499 {
            world.update(0.01);
        }
        assert_eq!(world.bullets.len(), 1);

        world.update(0.01);
        assert!(world.bullets.is_empty());
    }
}
