//! Hearts: a bounded life counter

use serde::Serialize;

/// Outcome of losing a life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifeLoss {
    pub remaining: u32,
    /// Set only by the loss that took the counter to zero
    pub exhausted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Lives {
    remaining: u32,
    max: u32,
}

impl Lives {
    /// Counter starting full
    pub fn new(max: u32) -> Self {
        Self { remaining: max, max }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    #[cfg(test)]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Take one life. At zero this is a no-op that reports nothing new.
    pub fn lose_life(&mut self) -> LifeLoss {
        if self.remaining == 0 {
            return LifeLoss {
                remaining: 0,
                exhausted: false,
            };
        }

        self.remaining -= 1;
        LifeLoss {
            remaining: self.remaining,
            exhausted: self.remaining == 0,
        }
    }
}
