//! One-shot session timers
//!
//! Each timer is a task that sleeps until its deadline and posts
//! [`SessionEvent::TimerFired`] to the owning session. Every arm gets a fresh
//! [`TimerId`]; [`Timers::take_fired`] only accepts the id that is currently
//! armed, so events from cancelled or replaced timers are ignored even if they
//! were already queued.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use super::event::SessionEvent;

pub type TimerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Next special item appearance
    SpecialSpawn,
    /// Special item expiry
    SpecialDwell,
    /// Decay of one floating text
    FloatText(u64),
}

impl TimerKind {
    /// Timers that belong to the running game and stop with it
    pub fn is_gameplay(&self) -> bool {
        matches!(self, TimerKind::SpecialSpawn | TimerKind::SpecialDwell)
    }
}

struct Armed {
    id: TimerId,
    deadline: Instant,
    task: JoinHandle<()>,
}

pub struct Timers {
    events: mpsc::Sender<SessionEvent>,
    armed: HashMap<TimerKind, Armed>,
    /// Gameplay timers paused by `suspend`, with their remaining time
    suspended: Vec<(TimerKind, Duration)>,
    next_id: TimerId,
}

impl Timers {
    pub fn new(events: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            events,
            armed: HashMap::new(),
            suspended: Vec::new(),
            next_id: 1,
        }
    }

    /// Arm `kind` to fire after `after`, replacing any timer of the same kind
    pub fn arm(&mut self, kind: TimerKind, after: Duration) -> TimerId {
        self.cancel(kind);

        let id = self.next_id;
        self.next_id += 1;

        let deadline = Instant::now() + after;
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            sleep_until(deadline).await;
            let _ = events.send(SessionEvent::TimerFired { kind, id }).await;
        });

        self.armed.insert(kind, Armed { id, deadline, task });
        id
    }

    /// Returns `true` if a timer of `kind` was armed
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.armed.remove(&kind) {
            Some(armed) => {
                armed.task.abort();
                true
            }
            None => false,
        }
    }

    /// Accept a fired event. Stale ids return `false` and change nothing.
    pub fn take_fired(&mut self, kind: TimerKind, id: TimerId) -> bool {
        if self.armed.get(&kind).map(|a| a.id) != Some(id) {
            debug!("Ignoring stale timer {:?} #{}", kind, id);
            return false;
        }
        self.armed.remove(&kind);
        true
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.contains_key(&kind)
    }

    /// Time left before `kind` fires
    pub fn remaining(&self, kind: TimerKind) -> Option<Duration> {
        self.armed
            .get(&kind)
            .map(|a| a.deadline.saturating_duration_since(Instant::now()))
    }

    /// Stop the game's timers, including suspended ones
    pub fn cancel_gameplay(&mut self) {
        self.armed.retain(|kind, armed| {
            if kind.is_gameplay() {
                armed.task.abort();
                false
            } else {
                true
            }
        });
        self.suspended.clear();
    }

    pub fn cancel_all(&mut self) {
        for (_, armed) in self.armed.drain() {
            armed.task.abort();
        }
        self.suspended.clear();
    }

    /// Pause the game's timers, remembering how long each had left
    pub fn suspend(&mut self) {
        let now = Instant::now();
        let kinds: Vec<TimerKind> = self.armed.keys().copied().filter(TimerKind::is_gameplay).collect();

        for kind in kinds {
            if let Some(armed) = self.armed.remove(&kind) {
                armed.task.abort();
                self.suspended
                    .push((kind, armed.deadline.saturating_duration_since(now)));
            }
        }
    }

    /// Re-arm everything paused by `suspend`
    pub fn resume(&mut self) {
        for (kind, remaining) in std::mem::take(&mut self.suspended) {
            self.arm(kind, remaining);
        }
    }

    pub fn is_suspended(&self) -> bool {
        !self.suspended.is_empty()
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        for armed in self.armed.values() {
            armed.task.abort();
        }
    }
}
