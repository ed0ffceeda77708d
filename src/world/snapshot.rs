//! Binary world-snapshot encoding

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};

use crate::ws::protocol::OP_STATE;
use crate::world::plane::{Plane, PLANE_SNAPSHOT_SIZE};

/// Serialize every live plane into one wire buffer: the opcode byte
/// followed by a fixed-size record per plane, in uid order.
pub fn encode_snapshot(planes: &BTreeMap<u8, Plane>) -> Bytes {
    let live: Vec<&Plane> = planes.values().filter(|p| !p.is_retired()).collect();

    let mut buf = BytesMut::with_capacity(1 + live.len() * PLANE_SNAPSHOT_SIZE);
    buf.put_u8(OP_STATE);

    for plane in live {
        plane.write_snapshot(&mut buf);
    }

    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::vector::Vec3;
    use crate::world::plane::PlaneModel;

    fn model() -> PlaneModel {
        PlaneModel {
            max_thrust: 50_000.0,
            mass: 4_000.0,
            max_rotations: Vec3::new(0.3, 0.3, 1.0),
            drag_factors: Vec3::new(0.05, 0.005, 0.05),
            lift_min: 0.0005,
            lift_max: 0.0007,
            default_speed: 150.0,
        }
    }

    #[test]
    fn empty_world_is_just_the_opcode() {
        let snapshot = encode_snapshot(&BTreeMap::new());
        assert_eq!(&snapshot[..], &[OP_STATE]);
    }

    #[test]
    fn one_record_per_live_plane_in_uid_order() {
        let mut planes = BTreeMap::new();
        planes.insert(9, Plane::new(9, model()));
        planes.insert(2, Plane::new(2, model()));

        let snapshot = encode_snapshot(&planes);

        assert_eq!(snapshot.len(), 1 + 2 * PLANE_SNAPSHOT_SIZE);
        assert_eq!(snapshot[0], OP_STATE);
        assert_eq!(snapshot[1], 2);
        assert_eq!(snapshot[1 + PLANE_SNAPSHOT_SIZE], 9);
    }

    #[test]
    fn retired_planes_are_skipped() {
        let mut planes = BTreeMap::new();
        planes.insert(2, Plane::new(2, model()));
        planes.insert(9, Plane::new(9, model()));
        planes.get_mut(&2).unwrap().retire();

        let snapshot = encode_snapshot(&planes);

        assert_eq!(snapshot.len(), 1 + PLANE_SNAPSHOT_SIZE);
        assert_eq!(snapshot[1], 9);
    }
}
