//! Item placement on free cells

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::item::{RegularItem, SpecialItem, Token};
use super::location::{Grid, Location};
use super::snake::Snake;

/// Places regular and special items on cells the snake does not occupy
#[derive(Debug)]
pub struct ItemSpawner<R = StdRng> {
    rng: R,
}

impl ItemSpawner<StdRng> {
    /// Spawner seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Spawner with a fixed seed, for reproducible games
    #[cfg(test)]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ItemSpawner<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Regular item with a uniformly drawn token, on a free cell
    pub fn spawn_regular(&mut self, grid: Grid, snake: &Snake, avoid: Option<Location>) -> Option<RegularItem> {
        let location = self.free_cell(grid, snake, avoid)?;
        let token = *Token::ALL.choose(&mut self.rng)?;
        Some(RegularItem { location, token })
    }

    /// Special item on a free cell
    pub fn spawn_special(&mut self, grid: Grid, snake: &Snake, avoid: Option<Location>) -> Option<SpecialItem> {
        let location = self.free_cell(grid, snake, avoid)?;
        Some(SpecialItem { location })
    }

    /// Rejection-sample a cell that is neither on the snake nor `avoid`.
    /// Returns `None` when every cell is taken.
    fn free_cell(&mut self, grid: Grid, snake: &Snake, avoid: Option<Location>) -> Option<Location> {
        let blocked = snake.len() + avoid.filter(|loc| !snake.occupies(*loc)).map_or(0, |_| 1);
        if blocked >= grid.cell_count() {
            return None;
        }

        loop {
            let cell = grid.random_cell(&mut self.rng);
            if !snake.occupies(cell) && Some(cell) != avoid {
                return Some(cell);
            }
        }
    }
}
