//! One game's board state and the deterministic tick step

use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::Decimal;

use super::direction::Direction;
use super::item::{ItemKind, RegularItem, SpecialItem};
use super::ledger::InventoryLedger;
use super::lives::{LifeLoss, Lives};
use super::location::{Grid, Location};
use super::snake::{MoveResult, Snake};
use super::spawner::ItemSpawner;

/// An item picked up during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collected {
    pub kind: ItemKind,
    /// Ledger total for the kind after crediting
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Moved {
        head: Location,
        collected: Option<Collected>,
    },
    /// Self-collision; the board is left as it was
    Collided { at: Location },
}

/// Snake, items, hearts and ledger of a single paid game
#[derive(Debug)]
pub struct World<R = StdRng> {
    grid: Grid,
    snake: Snake,
    regular: Option<RegularItem>,
    special: Option<SpecialItem>,
    lives: Lives,
    ledger: InventoryLedger,
    spawner: ItemSpawner<R>,
}

impl<R: Rng> World<R> {
    /// Fresh board: one-segment snake in the center heading right, one
    /// regular item, no special item, full hearts, empty ledger.
    pub fn new(grid: Grid, max_lives: u32, mut spawner: ItemSpawner<R>) -> Self {
        let snake = Snake::new(grid.center(), Direction::Right);
        let regular = spawner.spawn_regular(grid, &snake, None);

        Self {
            grid,
            snake,
            regular,
            special: None,
            lives: Lives::new(max_lives),
            ledger: InventoryLedger::new(),
            spawner,
        }
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    pub fn regular(&self) -> Option<&RegularItem> {
        self.regular.as_ref()
    }

    pub fn special(&self) -> Option<&SpecialItem> {
        self.special.as_ref()
    }

    pub fn lives(&self) -> &Lives {
        &self.lives
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut InventoryLedger {
        &mut self.ledger
    }

    /// Buffer a direction change; reversals and repeats are dropped
    pub fn steer(&mut self, direction: Direction) -> bool {
        self.snake.steer(direction)
    }

    /// Advance the snake one cell and resolve item pickup
    pub fn tick(&mut self) -> TickOutcome {
        let regular_at = self.regular.map(|item| item.location);
        let special_at = self.special.map(|item| item.location);

        let head = match self
            .snake
            .advance(self.grid, |head| Some(head) == regular_at || Some(head) == special_at)
        {
            MoveResult::Collided { at } => return TickOutcome::Collided { at },
            MoveResult::Moved { new_head, .. } => new_head,
        };

        let collected = if Some(head) == regular_at {
            self.regular
                .take()
                .map(|item| self.collect(item.kind()))
        } else if Some(head) == special_at {
            self.special.take().map(|_| self.collect(ItemKind::Special))
        } else {
            None
        };

        if self.regular.is_none() {
            self.regular = self
                .spawner
                .spawn_regular(self.grid, &self.snake, self.special.map(|s| s.location));
        }

        TickOutcome::Moved { head, collected }
    }

    /// Put a special item on the board if none is there.
    /// Returns `false` when one is already present or no cell is free.
    pub fn spawn_special(&mut self) -> bool {
        if self.special.is_some() {
            return false;
        }
        self.special = self
            .spawner
            .spawn_special(self.grid, &self.snake, self.regular.map(|r| r.location));
        self.special.is_some()
    }

    /// Remove an uncollected special item and charge one heart.
    /// Returns `None` when there was nothing to expire.
    pub fn expire_special(&mut self) -> Option<LifeLoss> {
        self.special.take().map(|_| self.lives.lose_life())
    }

    fn collect(&mut self, kind: ItemKind) -> Collected {
        let total = self.ledger.credit(kind);
        Collected { kind, total }
    }

    #[cfg(test)]
    pub(crate) fn place_regular(&mut self, item: RegularItem) {
        self.regular = Some(item);
    }

    #[cfg(test)]
    pub(crate) fn place_special(&mut self, item: SpecialItem) {
        self.special = Some(item);
    }

    #[cfg(test)]
    pub(crate) fn replace_snake(&mut self, snake: Snake) {
        self.snake = snake;
    }
}
