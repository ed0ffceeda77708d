//! Flight model for a single plane entity
//!
//! A plane owns its kinematic state and is mutated only by the world
//! loop: raw input bytes overwrite the pending input slot, and every
//! simulation tick integrates rotation, forces and terrain collision.

use bytes::BufMut;
use serde::Deserialize;

use crate::math::matrix::Matrix3;
use crate::math::vector::{self, Vec3};
use crate::world::terrain::Terrain;

/// Per-plane wire record: uid + damage + 3 x f32 location + 4 x f32
/// orientation quaternion.
pub const PLANE_SNAPSHOT_SIZE: usize = 1 + 1 + 3 * 4 + 4 * 4;

/// Clearance kept between a plane and the terrain surface.
const TERRAIN_MARGIN: f64 = 5.0;

/// World-frame gravity on the Y axis, units/s^2.
const GRAVITY: f64 = -9.8;

/// Air density fed into the drag model.
fn air_density(_altitude: f64) -> f64 {
    // Altitude-independent placeholder; the drag model does not attempt
    // a real atmosphere.
    1.2
}

/// Latest decoded control axes. Overwritten in place by each accepted
/// input message; between ticks the last write wins.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaneInput {
    /// Roll command, [-1, 1].
    pub roll: f64,
    /// Pitch command, [-1, 1].
    pub pitch: f64,
    /// Yaw command, [-1, 1].
    pub yaw: f64,
    /// Thrust command, [0, 1].
    pub thrust: f64,
    pub is_firing: bool,
}

/// Static per-model configuration, loaded once from the game-parameters
/// file and shared by every plane flying that model.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaneModel {
    /// Maximum engine thrust, newtons.
    pub max_thrust: f64,
    /// Mass, kilograms.
    pub mass: f64,
    /// Maximum rotation rate per axis, radians/s.
    pub max_rotations: Vec3,
    /// Quadratic drag factor per local axis.
    pub drag_factors: Vec3,
    pub lift_min: f64,
    pub lift_max: f64,
    /// Forward speed a plane spawns with, units/s.
    pub default_speed: f64,
}

/// One connected player's plane.
#[derive(Debug, Clone)]
pub struct Plane {
    uid: u8,
    input: PlaneInput,
    model: PlaneModel,
    location: Vec3,
    speed: Vec3,
    orientation: Matrix3,
    retired: bool,
}

impl Plane {
    /// Spawn a plane at the default location, flying forward at the
    /// model's default speed.
    pub fn new(uid: u8, model: PlaneModel) -> Plane {
        let speed = Vec3::new(0.0, 0.0, model.default_speed);
        Plane {
            uid,
            input: PlaneInput::default(),
            model,
            location: Vec3::new(0.0, 1500.0, 0.0),
            speed,
            orientation: Matrix3::IDENTITY,
            retired: false,
        }
    }

    pub fn uid(&self) -> u8 {
        self.uid
    }

    pub fn location(&self) -> Vec3 {
        self.location
    }

    pub fn speed(&self) -> Vec3 {
        self.speed
    }

    pub fn orientation(&self) -> &Matrix3 {
        &self.orientation
    }

    pub fn input(&self) -> &PlaneInput {
        &self.input
    }

    /// Mark the plane dead. The world drops it on its next lifecycle pass.
    pub fn retire(&mut self) {
        self.retired = true;
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Decode a control message:
    /// `opcode | i8 roll | i8 pitch | i8 yaw | u8 thrust | [u8 flags]`.
    /// Any other length is ignored and the previous input stays in effect.
    pub fn apply_input(&mut self, data: &[u8]) {
        if data.len() != 5 && data.len() != 6 {
            return;
        }

        self.input = PlaneInput {
            // Stick convention: positive wire roll banks the other way.
            roll: -f64::from(data[1] as i8) / 127.0,
            pitch: f64::from(data[2] as i8) / 127.0,
            yaw: f64::from(data[3] as i8) / 127.0,
            thrust: f64::from(data[4]) / 255.0,
            is_firing: data.len() == 6 && data[5] & 0x80 != 0,
        };
    }

    /// Advance the plane by one simulation step and resolve terrain
    /// collision.
    pub fn update(&mut self, delta_t: f64, terrain: &Terrain) {
        self.orientation = self.next_orientation(delta_t);
        self.speed = self.next_speed(delta_t);
        self.location = self.location + self.speed * delta_t;
        self.correct_from_collision(terrain);
    }

    fn next_orientation(&self, delta_t: f64) -> Matrix3 {
        let pitch = Matrix3::rotation_x(self.model.max_rotations.x * self.input.pitch * delta_t);
        let yaw = Matrix3::rotation_y(self.model.max_rotations.y * self.input.yaw * delta_t);
        let roll = Matrix3::rotation_z(self.model.max_rotations.z * self.input.roll * delta_t);

        // Composition order matters: yaw onto pitch, then roll onto both.
        let local_rotation = roll * (yaw * pitch);
        self.orientation * local_rotation
    }

    fn next_speed(&self, delta_t: f64) -> Vec3 {
        let mut local_acceleration = Vec3::new(0.0, self.lift(), self.thrust());
        local_acceleration = local_acceleration + self.drag() / self.model.mass;

        let mut acceleration = local_acceleration.rotated_by(&self.orientation);
        acceleration.y += GRAVITY;

        self.speed + acceleration * delta_t
    }

    fn lift(&self) -> f64 {
        // Nose-down pitch increases lift in this model.
        self.model.lift_min + -self.input.pitch * (self.model.lift_max - self.model.lift_min)
    }

    fn thrust(&self) -> f64 {
        self.input.thrust * self.model.max_thrust / self.model.mass
    }

    /// Quadratic drag in the plane's local frame, in newtons, always
    /// opposing motion.
    fn drag(&self) -> Vec3 {
        let local_speed = self.local_speed();
        let density = air_density(self.location.y);

        Vec3::new(
            -(self.model.drag_factors.x * local_speed.x * local_speed.x * density),
            -(self.model.drag_factors.y * local_speed.y * local_speed.y * density),
            -(self.model.drag_factors.z * local_speed.z * local_speed.z * density),
        )
    }

    fn local_speed(&self) -> Vec3 {
        self.speed.rotated_by(&self.orientation.inverse())
    }

    /// Clamp the plane back above the terrain. A hard floor, not a
    /// bounce: vertical speed is zeroed.
    fn correct_from_collision(&mut self, terrain: &Terrain) {
        let triangle = terrain.overred_triangle(self.location);

        // Out of the grid, nothing to collide with.
        if triangle[0].x.is_nan() {
            return;
        }

        if self.location.y >= vector::highest_in_triangle(&triangle) + TERRAIN_MARGIN {
            return;
        }

        let height = vector::height_on_triangle(self.location, &triangle);

        if self.location.y < height + TERRAIN_MARGIN {
            self.location.y = height + TERRAIN_MARGIN;
            self.speed.y = 0.0;
        }
    }

    /// Append this plane's snapshot record: uid, damage, location and
    /// orientation quaternion as big-endian f32.
    pub fn write_snapshot(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.uid);
        // Damage byte is reserved until impact resolution exists.
        buf.put_u8(0);

        buf.put_f32(self.location.x as f32);
        buf.put_f32(self.location.y as f32);
        buf.put_f32(self.location.z as f32);

        let rotation = self.orientation.to_quaternion();
        buf.put_f32(rotation.x as f32);
        buf.put_f32(rotation.y as f32);
        buf.put_f32(rotation.z as f32);
        buf.put_f32(rotation.w as f32);
    }
}
