//! Ballistic projectile entity
//!
//! Bullets carry a damage amount for impact resolution, which does not
//! exist yet; today they fly, fall and expire.

use crate::math::matrix::Matrix3;
use crate::math::vector::Vec3;

/// Number of simulation ticks a bullet stays live.
const BULLET_LIFETIME_TICKS: u16 = 500;

/// One fired shot, owned by the world loop.
#[derive(Debug, Clone)]
pub struct Bullet {
    /// Uid of the plane that fired.
    pub source: u8,
    pub location: Vec3,
    pub speed: Vec3,
    pub damage: u8,
    ticks_to_live: u16,
}

impl Bullet {
    /// Muzzle speed points along the firer's local up axis, rotated into
    /// world space by the firing orientation.
    pub fn new(source: u8, origin: Vec3, orientation: &Matrix3, muzzle_speed: f64, damage: u8) -> Bullet {
        let speed = Vec3::new(0.0, muzzle_speed, 0.0).rotated_by(orientation);
        Bullet {
            source,
            location: origin,
            speed,
            damage,
            ticks_to_live: BULLET_LIFETIME_TICKS,
        }
    }

    /// Update the ballistic state by one tick. Returns whether the bullet
    /// is still live.
    pub fn update(&mut self, delta_t: f64) -> bool {
        self.speed = self.speed + Vec3::new(0.0, 9.8 * delta_t, 0.0);
        self.ticks_to_live = self.ticks_to_live.saturating_sub(1);
        self.ticks_to_live > 0
    }

    /// Position integration, driven by the world loop after the ballistic
    /// update.
    pub fn advance(&mut self, delta_t: f64) {
        self.location = self.location + self.speed * delta_t;
    }
}
