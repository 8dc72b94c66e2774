//! Snake entity: body, committed and pending direction, per-tick movement

use std::collections::VecDeque;

use super::direction::Direction;
use super::location::{Grid, Location};

/// Result of advancing the snake one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResult {
    /// The head moved to `new_head`. `old_tail` is `None` when the snake grew.
    Moved {
        new_head: Location,
        old_tail: Option<Location>,
    },
    /// The next head cell is already part of the body; nothing was changed
    Collided { at: Location },
}

/// A snake on the grid
#[derive(Debug, Clone)]
pub struct Snake {
    /// Body segments (head is front, tail is back)
    body: VecDeque<Location>,
    /// Direction used by the last tick
    direction: Direction,
    /// Direction requested by input, applied at the start of the next tick
    pending: Option<Direction>,
}

impl Snake {
    /// Create a one-segment snake
    pub fn new(head: Location, direction: Direction) -> Self {
        let mut body = VecDeque::new();
        body.push_front(head);

        Self {
            body,
            direction,
            pending: None,
        }
    }

    /// Create a snake from explicit segments, head first
    #[cfg(test)]
    pub fn from_segments<I>(segments: I, direction: Direction) -> Option<Self>
    where
        I: IntoIterator<Item = Location>,
    {
        let body: VecDeque<Location> = segments.into_iter().collect();
        if body.is_empty() {
            return None;
        }
        Some(Self {
            body,
            direction,
            pending: None,
        })
    }

    /// Get the snake's head location
    pub fn head(&self) -> Location {
        *self.body.front().expect("Snake must have a head")
    }

    pub fn body(&self) -> &VecDeque<Location> {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Direction committed by the last tick
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn pending_direction(&self) -> Option<Direction> {
        self.pending
    }

    pub fn occupies(&self, loc: Location) -> bool {
        self.body.contains(&loc)
    }

    /// Buffer a direction change for the next tick.
    ///
    /// Returns `false` when the request is dropped: it would reverse the
    /// committed direction, or it is already the pending one.
    pub fn steer(&mut self, direction: Direction) -> bool {
        if direction.is_opposite(&self.direction) || self.pending == Some(direction) {
            return false;
        }
        self.pending = Some(direction);
        true
    }

    /// Move one cell. `grows` is asked whether the new head cell holds an item;
    /// if so the tail stays put this tick.
    pub fn advance<F>(&mut self, grid: Grid, grows: F) -> MoveResult
    where
        F: FnOnce(Location) -> bool,
    {
        if let Some(next) = self.pending.take() {
            self.direction = next;
        }

        let new_head = self.head().adjacent(self.direction, grid);

        // Checked against the body before insertion, tail included
        if self.occupies(new_head) {
            return MoveResult::Collided { at: new_head };
        }

        let grow = grows(new_head);
        self.body.push_front(new_head);

        let old_tail = if grow { None } else { self.body.pop_back() };
        MoveResult::Moved { new_head, old_tail }
    }

    /// True when no two segments share a cell
    #[cfg(test)]
    pub fn segments_unique(&self) -> bool {
        let mut seen = std::collections::HashSet::with_capacity(self.body.len());
        self.body.iter().all(|loc| seen.insert(*loc))
    }
}
