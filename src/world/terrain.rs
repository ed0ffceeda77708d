//! Terrain height-field loaded from a binary heightmap file
//!
//! File layout, little-endian: u16 width | u16 depth | u16 reserved |
//! f32 distance | width*depth u16 height samples, row-major. Sample
//! `[row*width + col]` is the vertex height at `(col*distance, row*distance)`.

use std::io;
use std::path::Path;

use bytes::Buf;

use crate::math::vector::{Triangle, Vec3};

/// Terrain loading failures. Fatal at startup; the server cannot run
/// without a terrain.
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("failed to read terrain file: {0}")]
    Io(#[from] io::Error),

    #[error("terrain file is truncated")]
    Truncated,
}

/// Immutable height-field grid. Shared read-only by every plane's
/// collision check, so it carries no interior mutability.
#[derive(Debug)]
pub struct Terrain {
    width: usize,
    depth: usize,
    distance: f64,
    points: Vec<u16>,
}

impl Terrain {
    /// Read a terrain from a heightmap file.
    pub fn load(path: impl AsRef<Path>) -> Result<Terrain, TerrainError> {
        let data = std::fs::read(path)?;
        Terrain::from_bytes(&data)
    }

    /// Parse a terrain from raw heightmap bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Terrain, TerrainError> {
        let mut buf = data;

        if buf.remaining() < 10 {
            return Err(TerrainError::Truncated);
        }

        let width = buf.get_u16_le() as usize;
        let depth = buf.get_u16_le() as usize;
        buf.advance(2); // reserved
        let distance = f64::from(buf.get_f32_le());

        let sample_count = width * depth;
        if buf.remaining() < sample_count * 2 {
            return Err(TerrainError::Truncated);
        }

        let mut points = Vec::with_capacity(sample_count);
        for _ in 0..sample_count {
            points.push(buf.get_u16_le());
        }

        Ok(Terrain {
            width,
            depth,
            distance,
            points,
        })
    }

    /// Find the triangle under `pos`. The returned triangle's first corner
    /// has a NaN x when `pos` falls outside the grid; callers must check
    /// before interpolating.
    pub fn overred_triangle(&self, pos: Vec3) -> Triangle {
        let col = (pos.x / self.distance).ceil() as i64;
        let row = (pos.z / self.distance).ceil() as i64;

        if col < 0 || col >= self.width as i64 - 1 || row < 0 || row >= self.depth as i64 - 1 {
            let mut sentinel = [Vec3::default(); 3];
            sentinel[0].x = f64::NAN;
            return sentinel;
        }

        let (col, row) = (col as usize, row as usize);

        let up_left = Vec3::new(
            col as f64 * self.distance,
            f64::from(self.sample(col, row)),
            row as f64 * self.distance,
        );

        // The quad splits along its diagonal; the remainders decide which
        // half the point is over.
        if pos.x % self.distance > pos.z % self.distance {
            let down_right = Vec3::new(
                up_left.x + self.distance,
                f64::from(self.sample(col + 1, row + 1)),
                up_left.z + self.distance,
            );
            let up_right = Vec3::new(
                up_left.x + self.distance,
                f64::from(self.sample(col + 1, row)),
                up_left.z,
            );
            [up_left, down_right, up_right]
        } else {
            let down_left = Vec3::new(
                up_left.x,
                f64::from(self.sample(col, row + 1)),
                up_left.z + self.distance,
            );
            let down_right = Vec3::new(
                up_left.x + self.distance,
                f64::from(self.sample(col + 1, row + 1)),
                down_left.z,
            );
            [up_left, down_left, down_right]
        }
    }

    fn sample(&self, col: usize, row: usize) -> u16 {
        self.points[row * self.width + col]
    }
}
