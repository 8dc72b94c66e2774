//! Grid cells and toroidal playfield geometry

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::direction::Direction;
use crate::config::{DEFAULT_COLS, DEFAULT_ROWS, MAX_GRID_DIM, MIN_GRID_DIM};

/// A cell on the game grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub col: i32,
    pub row: i32,
}

impl Location {
    /// Create a new location
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Get the cell adjacent to this one in the given direction.
    /// Both axes wrap around the grid edges.
    pub fn adjacent(&self, direction: Direction, grid: Grid) -> Location {
        let (dc, dr) = direction.delta();
        Location::new(
            (self.col + dc).rem_euclid(grid.cols),
            (self.row + dr).rem_euclid(grid.rows),
        )
    }
}

/// Playfield dimensions in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grid {
    pub cols: i32,
    pub rows: i32,
}

impl Grid {
    pub fn new(cols: i32, rows: i32) -> Self {
        Self { cols, rows }
    }

    /// Grid with dimensions forced into the supported range
    pub fn clamped(cols: i32, rows: i32) -> Self {
        Self {
            cols: cols.clamp(MIN_GRID_DIM, MAX_GRID_DIM),
            rows: rows.clamp(MIN_GRID_DIM, MAX_GRID_DIM),
        }
    }

    pub fn cell_count(&self) -> usize {
        (self.cols.max(0) as usize) * (self.rows.max(0) as usize)
    }

    pub fn center(&self) -> Location {
        Location::new(self.cols / 2, self.rows / 2)
    }

    #[cfg(test)]
    pub fn contains(&self, loc: Location) -> bool {
        (0..self.cols).contains(&loc.col) && (0..self.rows).contains(&loc.row)
    }

    /// Uniformly random cell
    pub fn random_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Location {
        Location::new(rng.gen_range(0..self.cols), rng.gen_range(0..self.rows))
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(DEFAULT_COLS, DEFAULT_ROWS)
    }
}
