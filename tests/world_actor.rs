//! End-to-end tests of the world actor over its public handle:
//! join, input, snapshots and lifecycle, driven by real timers.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::timeout;

use dogfight_server::math::matrix::Matrix3;
use dogfight_server::math::vector::Vec3;
use dogfight_server::world::plane::PLANE_SNAPSHOT_SIZE;
use dogfight_server::world::{Bullet, PlaneModel, Terrain, World, WorldError};
use dogfight_server::ws::protocol::OP_STATE;

const SIM_INTERVAL: Duration = Duration::from_millis(2);
const SNAP_INTERVAL: Duration = Duration::from_millis(5);
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn test_model() -> PlaneModel {
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

/// Flat 4x4 grid at height zero, vertices 1000 units apart.
fn test_terrain() -> Arc<Terrain> {
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

/// Pull snapshots until one matches, or fail on timeout.
async fn wait_for_snapshot(
    rx: &mut tokio::sync::broadcast::Receiver<Bytes>,
    matches: impl Fn(&Bytes) -> bool,
) -> Bytes {
    timeout(RECV_TIMEOUT, async {
        loop {
            match rx.recv().await {
                Ok(snapshot) if matches(&snapshot) => return snapshot,
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("snapshot stream closed: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for a matching snapshot")
}

#[tokio::test]
async fn snapshots_track_joins_and_leaves() {
    let (world, handle) = World::new(test_terrain());
    let runner = tokio::spawn(world.run(SIM_INTERVAL, SNAP_INTERVAL));

    let mut snapshots = handle.subscribe();

    // Empty world broadcasts bare opcode frames.
    let empty = wait_for_snapshot(&mut snapshots, |s| s.len() == 1).await;
    assert_eq!(empty[0], OP_STATE);

    handle.join(7, test_model()).await.unwrap();

    let one = wait_for_snapshot(&mut snapshots, |s| s.len() > 1).await;
    assert_eq!(one.len(), 1 + PLANE_SNAPSHOT_SIZE);
    assert_eq!(one[0], OP_STATE);
    assert_eq!(one[1], 7);

    handle.join(9, test_model()).await.unwrap();
    let two = wait_for_snapshot(&mut snapshots, |s| s.len() == 1 + 2 * PLANE_SNAPSHOT_SIZE).await;
    // Records come out in uid order.
    assert_eq!(two[1], 7);
    assert_eq!(two[1 + PLANE_SNAPSHOT_SIZE], 9);

    handle.leave(7).await;
    let after_leave = wait_for_snapshot(&mut snapshots, |s| s.len() == 1 + PLANE_SNAPSHOT_SIZE).await;
    assert_eq!(after_leave[1], 9);

    handle.shutdown().await;
    runner.await.unwrap();
}

#[tokio::test]
async fn duplicate_join_is_rejected_over_the_handle() {
    let (world, handle) = World::new(test_terrain());
    let runner = tokio::spawn(world.run(SIM_INTERVAL, SNAP_INTERVAL));

    handle.join(1, test_model()).await.unwrap();
    let duplicate = handle.join(1, test_model()).await;
    assert!(matches!(duplicate, Err(WorldError::AlreadyJoined(1))));

    handle.shutdown().await;
    runner.await.unwrap();
}

#[tokio::test]
async fn input_after_leave_is_harmless() {
    let (world, handle) = World::new(test_terrain());
    let runner = tokio::spawn(world.run(SIM_INTERVAL, SNAP_INTERVAL));

    let mut snapshots = handle.subscribe();

    handle.join(1, test_model()).await.unwrap();
    handle.join(2, test_model()).await.unwrap();
    wait_for_snapshot(&mut snapshots, |s| s.len() == 1 + 2 * PLANE_SNAPSHOT_SIZE).await;

    handle.leave(1).await;
    wait_for_snapshot(&mut snapshots, |s| s.len() == 1 + PLANE_SNAPSHOT_SIZE).await;

    // Late input for the departed plane: dropped, nothing breaks.
    handle
        .apply_input(1, Bytes::from_static(&[0x3, 127, 127, 127, 255, 0x80]))
        .await;

    let snapshot = wait_for_snapshot(&mut snapshots, |s| s.len() == 1 + PLANE_SNAPSHOT_SIZE).await;
    assert_eq!(snapshot[1], 2);

    handle.shutdown().await;
    runner.await.unwrap();
}

#[tokio::test]
async fn gravity_pulls_an_uncontrolled_plane_down() {
    let (world, handle) = World::new(test_terrain());
    let runner = tokio::spawn(world.run(SIM_INTERVAL, SNAP_INTERVAL));

    let mut snapshots = handle.subscribe();
    handle.join(1, test_model()).await.unwrap();

    let read_y_z = |s: &Bytes| {
        let y = f32::from_be_bytes([s[6], s[7], s[8], s[9]]);
        let z = f32::from_be_bytes([s[10], s[11], s[12], s[13]]);
        (y, z)
    };

    let first = wait_for_snapshot(&mut snapshots, |s| s.len() == 1 + PLANE_SNAPSHOT_SIZE).await;
    let (y0, z0) = read_y_z(&first);

    // Let a couple hundred milliseconds of simulation pass.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let later = wait_for_snapshot(&mut snapshots, |s| s.len() == 1 + PLANE_SNAPSHOT_SIZE).await;
    let (y1, z1) = read_y_z(&later);

    assert!(z1 > z0, "forward flight should continue: {z0} -> {z1}");
    assert!(y1 < y0, "gravity should pull the plane down: {y0} -> {y1}");

    handle.shutdown().await;
    runner.await.unwrap();
}

#[tokio::test]
async fn fired_bullets_do_not_disturb_the_snapshot_stream() {
    let (world, handle) = World::new(test_terrain());
    let runner = tokio::spawn(world.run(SIM_INTERVAL, SNAP_INTERVAL));

    let mut snapshots = handle.subscribe();
    handle.join(4, test_model()).await.unwrap();

    // Bullets are simulated but not part of the snapshot wire format.
    handle
        .fire(Bullet::new(4, Vec3::new(0.0, 1500.0, 0.0), &Matrix3::IDENTITY, 400.0, 12))
        .await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    let snapshot = wait_for_snapshot(&mut snapshots, |s| s.len() > 1).await;
    assert_eq!(snapshot.len(), 1 + PLANE_SNAPSHOT_SIZE);
    assert_eq!(snapshot[1], 4);

    handle.shutdown().await;
    runner.await.unwrap();
}

#[tokio::test]
async fn world_stops_when_every_handle_is_dropped() {
    let (world, handle) = World::new(test_terrain());
    let runner = tokio::spawn(world.run(SIM_INTERVAL, SNAP_INTERVAL));

    drop(handle);

    timeout(RECV_TIMEOUT, runner)
        .await
        .expect("world loop should stop on its own")
        .unwrap();
}
