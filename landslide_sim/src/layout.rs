//! Grid placement of nodes, with optional seeded jitter.

use nalgebra::Vector3;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Fill order of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutType {
    /// Fill a row of `grid_width` cells, then move to the next row
    RowFirst,

    /// Fill a column of `grid_width` cells, then move to the next column
    ColumnFirst,
}

/// Places nodes on a regular grid in the z = 0 plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    pub min_x: f64,
    pub min_y: f64,
    pub delta_x: f64,
    pub delta_y: f64,

    /// Cells per row (or per column for `ColumnFirst`)
    pub grid_width: u32,

    pub layout: LayoutType,

    /// Standard deviation of Gaussian jitter added to x and y (0 = exact grid)
    pub jitter_std: f64,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::mountain()
    }
}

impl GridLayout {
    /// Mountain slope: one row starting at (0, 10), 20 m apart.
    pub fn mountain() -> Self {
        Self {
            min_x: 0.0,
            min_y: 10.0,
            delta_x: 20.0,
            delta_y: 10.0,
            grid_width: 4,
            layout: LayoutType::RowFirst,
            jitter_std: 0.0,
        }
    }

    /// City below the slope: rows of five starting at (10, 59).
    pub fn city() -> Self {
        Self {
            min_x: 10.0,
            min_y: 59.0,
            delta_x: 10.0,
            delta_y: 10.0,
            grid_width: 5,
            layout: LayoutType::RowFirst,
            jitter_std: 0.0,
        }
    }

    /// Checks the layout can place nodes.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.grid_width == 0 {
            return Err(SimError::config("grid_width must be at least 1"));
        }
        if !(self.jitter_std >= 0.0 && self.jitter_std.is_finite()) {
            return Err(SimError::config(format!(
                "jitter_std must be a non-negative number, got {}",
                self.jitter_std
            )));
        }
        Ok(())
    }

    /// Exact grid cell of the `index`-th node.
    pub fn cell(&self, index: usize) -> Vector3<f64> {
        let width = self.grid_width.max(1) as usize;
        let (major, minor) = (index / width, index % width);
        let (col, row) = match self.layout {
            LayoutType::RowFirst => (minor, major),
            LayoutType::ColumnFirst => (major, minor),
        };
        Vector3::new(
            self.min_x + self.delta_x * col as f64,
            self.min_y + self.delta_y * row as f64,
            0.0,
        )
    }

    /// Positions for `count` nodes, jittered from `rng` when `jitter_std > 0`.
    pub fn positions(&self, count: usize, rng: &mut ChaCha8Rng) -> Result<Vec<Vector3<f64>>, SimError> {
        self.validate()?;
        if self.jitter_std == 0.0 {
            return Ok((0..count).map(|i| self.cell(i)).collect());
        }

        let normal = Normal::new(0.0, self.jitter_std)
            .map_err(|e| SimError::config(format!("jitter distribution: {}", e)))?;
        Ok((0..count)
            .map(|i| {
                let noise = Vector3::new(normal.sample(rng), normal.sample(rng), 0.0);
                self.cell(i) + noise
            })
            .collect())
    }
}
