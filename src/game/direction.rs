//! Direction enum for snake movement

use serde::{Deserialize, Serialize};

/// Direction of movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Moving up (row decreases)
    Up,
    /// Moving down (row increases)
    Down,
    /// Moving left (column decreases)
    Left,
    /// Moving right (column increases)
    #[default]
    Right,
}

impl Direction {
    /// Parse a direction from a command or key name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "up" | "north" | "w" | "arrowup" => Some(Direction::Up),
            "down" | "south" | "s" | "arrowdown" => Some(Direction::Down),
            "left" | "west" | "a" | "arrowleft" => Some(Direction::Left),
            "right" | "east" | "d" | "arrowright" => Some(Direction::Right),
            _ => None,
        }
    }

    /// Unit step as (column delta, row delta)
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Check if this direction is opposite to another
    pub fn is_opposite(&self, other: &Direction) -> bool {
        self.opposite() == *other
    }
}
