//! Vector, matrix and quaternion math for the flight simulation

pub mod matrix;
pub mod quaternion;
pub mod vector;

pub use matrix::Matrix3;
pub use quaternion::Quaternion;
pub use vector::{Triangle, Vec3};
