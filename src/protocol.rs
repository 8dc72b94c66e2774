//! Protocol messages for WebSocket communication

use serde::{Deserialize, Serialize};

use crate::game::{Direction, Grid, ItemKind, LedgerSnapshot, Location};
use crate::session::event::Command;
use crate::session::state::SessionState;
use crate::wallet::{WalletReply, WalletRequest};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Connect,
    Pay,
    Steer { direction: Direction },
    Claim,
    Restart,
    /// Grid size the page can display
    Resize { cols: i32, rows: i32 },
    /// Browser wallet's answer to a [`ServerMessage::WalletRequest`]
    WalletResponse {
        id: u64,
        ok: bool,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
    /// Keep-alive
    Ping,
}

impl ClientMessage {
    /// Parse a text frame. Bare direction words and `ping` are accepted
    /// alongside JSON objects.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        if let Some(direction) = Direction::parse(s) {
            return Some(ClientMessage::Steer { direction });
        }

        if s == "ping" {
            return Some(ClientMessage::Ping);
        }

        serde_json::from_str(s).ok()
    }

    /// Session command carried by this message, if any
    pub fn command(&self) -> Option<Command> {
        match *self {
            ClientMessage::Connect => Some(Command::Connect),
            ClientMessage::Pay => Some(Command::Pay),
            ClientMessage::Steer { direction } => Some(Command::Steer(direction)),
            ClientMessage::Claim => Some(Command::Claim),
            ClientMessage::Restart => Some(Command::Restart),
            ClientMessage::Resize { cols, rows } => Some(Command::Resize { cols, rows }),
            ClientMessage::WalletResponse { .. } | ClientMessage::Ping => None,
        }
    }

    /// Request id and reply of a `wallet_response`
    pub fn into_wallet_reply(self) -> Option<(u64, WalletReply)> {
        match self {
            ClientMessage::WalletResponse { id, ok, value, error } => Some((id, WalletReply { ok, value, error })),
            _ => None,
        }
    }
}

/// Item on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemView {
    pub kind: ItemKind,
    pub col: i32,
    pub row: i32,
    /// Milliseconds before a special item expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_ms: Option<u64>,
}

/// Short-lived text drawn over the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FloatText {
    pub id: u64,
    pub text: String,
    pub col: i32,
    pub row: i32,
}

/// Everything the page needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub state: SessionState,
    pub identity: Option<String>,
    pub grid: Grid,
    /// Head first
    pub snake: Vec<Location>,
    pub regular: Option<ItemView>,
    pub special: Option<ItemView>,
    pub lives: u32,
    pub max_lives: u32,
    pub ledger: LedgerSnapshot,
    pub float_texts: Vec<FloatText>,
    /// A wallet or claim request is in flight
    pub busy: bool,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Session snapshot
    State { data: SessionView },
    /// Request for the browser wallet; answered with `wallet_response`
    WalletRequest { id: u64, request: WalletRequest },
    /// User-visible message
    Notice { message: String },
    /// Claim result
    Claimed {
        references: Vec<String>,
        reset: Vec<ItemKind>,
        /// Still in the ledger after a failed transfer
        unsettled: Vec<ItemKind>,
        /// Cleared without a payout; no reward contract is configured
        #[serde(skip_serializing_if = "Vec::is_empty")]
        skipped: Vec<ItemKind>,
    },
}

impl ServerMessage {
    /// Serialize message to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn notice(message: impl Into<String>) -> Self {
        ServerMessage::Notice {
            message: message.into(),
        }
    }
}
