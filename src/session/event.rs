//! Inputs consumed by a session actor

use super::claim::ClaimOutcome;
use super::timers::{TimerId, TimerKind};
use crate::game::Direction;
use crate::identity::Address;
use crate::wallet::{PaymentReceipt, WalletError};

/// Player commands forwarded from the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Pay,
    Steer(Direction),
    Claim,
    Restart,
    /// Board size for the next game
    Resize { cols: i32, rows: i32 },
}

/// Results posted back to the actor by timers and background operations
#[derive(Debug)]
pub enum SessionEvent {
    TimerFired { kind: TimerKind, id: TimerId },
    WalletConnected(Result<Address, WalletError>),
    PaymentSettled(Result<PaymentReceipt, WalletError>),
    ClaimSettled(ClaimOutcome),
}
