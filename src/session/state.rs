//! Session lifecycle states and the allowed transitions between them

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No wallet attached
    #[default]
    Disconnected,
    /// Wallet attached, entry fee not paid
    Connected,
    /// Entry payment submitted, waiting for confirmation
    AwaitingPayment,
    /// Game running
    Playing,
    /// Game finished; board frozen
    GameOver,
}

/// Events that move a session between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    WalletConnected,
    PaymentRequested,
    PaymentConfirmed,
    PaymentFailed,
    /// Self-collision or hearts exhausted
    Ended,
    Restart,
}

impl SessionState {
    /// Target state for `transition`, or `None` when it does not apply here
    pub fn next(self, transition: Transition) -> Option<SessionState> {
        use SessionState::*;
        use Transition::*;

        match (self, transition) {
            (Disconnected, WalletConnected) => Some(Connected),
            (Connected, PaymentRequested) => Some(AwaitingPayment),
            (AwaitingPayment, PaymentConfirmed) => Some(Playing),
            (AwaitingPayment, PaymentFailed) => Some(Connected),
            (Playing, Ended) => Some(GameOver),
            (GameOver, Restart) => Some(Disconnected),
            _ => None,
        }
    }

    pub fn is_playing(self) -> bool {
        self == SessionState::Playing
    }
}
