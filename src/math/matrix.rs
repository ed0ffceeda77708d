//! 3×3 rotation matrices
//!
//! Orientation is stored as a matrix and accumulated multiplicatively;
//! Euler angles and quaternions are only extracted at snapshot time.
//! Repeated composition may drift off orthonormal; that is accepted.

use std::ops::Mul;

use super::quaternion::Quaternion;
use super::vector::Vec3;

/// Row-major 3×3 f64 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3 {
    pub m11: f64,
    pub m12: f64,
    pub m13: f64,
    pub m21: f64,
    pub m22: f64,
    pub m23: f64,
    pub m31: f64,
    pub m32: f64,
    pub m33: f64,
}

/// Euler extraction switches to the gimbal-lock branch once |m21| reaches
/// this threshold. Clients rely on the exact value for frame-to-frame
/// angle continuity.
const GIMBAL_LOCK_THRESHOLD: f64 = 0.999999;

impl Matrix3 {
    pub const IDENTITY: Matrix3 = Matrix3 {
        m11: 1.0,
        m12: 0.0,
        m13: 0.0,
        m21: 0.0,
        m22: 1.0,
        m23: 0.0,
        m31: 0.0,
        m32: 0.0,
        m33: 1.0,
    };

    /// Rotation around the X axis (pitch).
    pub fn rotation_x(angle: f64) -> Matrix3 {
        let (sin, cos) = angle.sin_cos();
        Matrix3 {
            m11: 1.0,
            m12: 0.0,
            m13: 0.0,
            m21: 0.0,
            m22: cos,
            m23: -sin,
            m31: 0.0,
            m32: sin,
            m33: cos,
        }
    }

    /// Rotation around the Y axis (yaw).
    pub fn rotation_y(angle: f64) -> Matrix3 {
        let (sin, cos) = angle.sin_cos();
        Matrix3 {
            m11: cos,
            m12: 0.0,
            m13: sin,
            m21: 0.0,
            m22: 1.0,
            m23: 0.0,
            m31: -sin,
            m32: 0.0,
            m33: cos,
        }
    }

    /// Rotation around the Z axis (roll).
    pub fn rotation_z(angle: f64) -> Matrix3 {
        let (sin, cos) = angle.sin_cos();
        Matrix3 {
            m11: cos,
            m12: -sin,
            m13: 0.0,
            m21: sin,
            m22: cos,
            m23: 0.0,
            m31: 0.0,
            m32: 0.0,
            m33: 1.0,
        }
    }

    /// Inverse via the classical adjugate/determinant method. A singular
    /// matrix falls back to the identity instead of failing.
    pub fn inverse(&self) -> Matrix3 {
        let t11 = self.m33 * self.m22 - self.m23 * self.m32;
        let t12 = self.m23 * self.m31 - self.m33 * self.m21;
        let t13 = self.m32 * self.m21 - self.m22 * self.m31;

        let det = self.m11 * t11 + self.m12 * t12 + self.m13 * t13;

        if det == 0.0 {
            return Matrix3::IDENTITY;
        }

        let det_inv = 1.0 / det;

        Matrix3 {
            m11: t11 * det_inv,
            m12: (self.m13 * self.m32 - self.m33 * self.m12) * det_inv,
            m13: (self.m23 * self.m12 - self.m13 * self.m22) * det_inv,
            m21: t12 * det_inv,
            m22: (self.m33 * self.m11 - self.m13 * self.m31) * det_inv,
            m23: (self.m13 * self.m21 - self.m23 * self.m11) * det_inv,
            m31: t13 * det_inv,
            m32: (self.m12 * self.m31 - self.m32 * self.m11) * det_inv,
            m33: (self.m22 * self.m11 - self.m12 * self.m21) * det_inv,
        }
    }

    /// Extract Euler angles. The z angle comes from asin of the clamped
    /// m21 element; x and y switch to the gimbal-lock branch when |m21|
    /// reaches the threshold.
    pub fn to_euler_angles(&self) -> Vec3 {
        let z = self.m21.clamp(-1.0, 1.0).asin();

        let (x, y) = if self.m21.abs() < GIMBAL_LOCK_THRESHOLD {
            ((-self.m23).atan2(self.m22), (-self.m31).atan2(self.m11))
        } else {
            (0.0, self.m13.atan2(self.m33))
        };

        Vec3::new(x, y, z)
    }

    /// Convert to a quaternion. Four branches keyed on the trace and the
    /// dominant diagonal element keep the square root well conditioned.
    pub fn to_quaternion(&self) -> Quaternion {
        let trace = self.m11 + self.m22 + self.m33;

        if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0; // s = 4 * w
            Quaternion {
                w: 0.25 * s,
                x: (self.m32 - self.m23) / s,
                y: (self.m13 - self.m31) / s,
                z: (self.m21 - self.m12) / s,
            }
        } else if self.m11 > self.m22 && self.m11 > self.m33 {
            let s = (1.0 + self.m11 - self.m22 - self.m33).sqrt() * 2.0; // s = 4 * x
            Quaternion {
                w: (self.m32 - self.m23) / s,
                x: 0.25 * s,
                y: (self.m12 + self.m21) / s,
                z: (self.m13 + self.m31) / s,
            }
        } else if self.m22 > self.m33 {
            let s = (1.0 + self.m22 - self.m11 - self.m33).sqrt() * 2.0; // s = 4 * y
            Quaternion {
                w: (self.m13 - self.m31) / s,
                x: (self.m12 + self.m21) / s,
                y: 0.25 * s,
                z: (self.m23 + self.m32) / s,
            }
        } else {
            let s = (1.0 + self.m33 - self.m11 - self.m22).sqrt() * 2.0; // s = 4 * z
            Quaternion {
                w: (self.m21 - self.m12) / s,
                x: (self.m13 + self.m31) / s,
                y: (self.m23 + self.m32) / s,
                z: 0.25 * s,
            }
        }
    }
}

impl Default for Matrix3 {
    fn default() -> Self {
        Matrix3::IDENTITY
    }
}

impl Mul for Matrix3 {
    type Output = Matrix3;

    fn mul(self, rhs: Matrix3) -> Matrix3 {
        Matrix3 {
            m11: self.m11 * rhs.m11 + self.m12 * rhs.m21 + self.m13 * rhs.m31,
            m12: self.m11 * rhs.m12 + self.m12 * rhs.m22 + self.m13 * rhs.m32,
            m13: self.m11 * rhs.m13 + self.m12 * rhs.m23 + self.m13 * rhs.m33,
            m21: self.m21 * rhs.m11 + self.m22 * rhs.m21 + self.m23 * rhs.m31,
            m22: self.m21 * rhs.m12 + self.m22 * rhs.m22 + self.m23 * rhs.m32,
            m23: self.m21 * rhs.m13 + self.m22 * rhs.m23 + self.m23 * rhs.m33,
            m31: self.m31 * rhs.m11 + self.m32 * rhs.m21 + self.m33 * rhs.m31,
            m32: self.m31 * rhs.m12 + self.m32 * rhs.m22 + self.m33 * rhs.m32,
            m33: self.m31 * rhs.m13 + self.m32 * rhs.m23 + self.m33 * rhs.m33,
        }
    }
}
