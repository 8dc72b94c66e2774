//! Append-only JSON-lines journal of session and payout events

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::game::ItemKind;

/// Events worth keeping after the process exits
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JournalEvent {
    /// Wallet connected to a session
    WalletConnected { session: Uuid, address: String },
    /// Entry fee confirmed, a game started
    GameStarted {
        session: Uuid,
        address: String,
        payment: String,
    },
    /// Item picked up
    ItemCollected {
        session: Uuid,
        kind: ItemKind,
        total: Decimal,
    },
    /// Special item expired
    LifeLost { session: Uuid, remaining: u32 },
    /// Game ended
    GameOver {
        session: Uuid,
        cause: String,
        length: usize,
    },
    /// Claim answered by the settlement service
    ClaimSettled {
        address: String,
        settled: Vec<String>,
        references: Vec<String>,
    },
    /// Payout instruction for one reward token
    RewardTransfer {
        reference: String,
        token: String,
        to: String,
        amount: Decimal,
    },
}

#[derive(Debug, Serialize)]
struct JournalEntry<'a> {
    /// Unix timestamp in milliseconds
    timestamp_ms: u128,
    #[serde(flatten)]
    event: &'a JournalEvent,
}

/// Event journal writer; a disabled journal drops everything
pub struct EventJournal {
    writer: Option<Mutex<BufWriter<File>>>,
}

impl EventJournal {
    /// Open (append) the journal at `path`, or build a disabled one for `None`.
    /// An unopenable file disables the journal instead of failing startup.
    pub fn open(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("Event journal is disabled");
            return Self::disabled();
        };

        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                info!("Event journal enabled, writing to {}", path.display());
                Self {
                    writer: Some(Mutex::new(BufWriter::new(file))),
                }
            }
            Err(e) => {
                error!("Failed to open event journal {}: {}", path.display(), e);
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { writer: None }
    }

    #[cfg(test)]
    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    /// Append one event
    pub fn record(&self, event: JournalEvent) {
        let Some(writer) = self.writer.as_ref() else {
            return;
        };

        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let entry = JournalEntry {
            timestamp_ms,
            event: &event,
        };

        let line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize journal entry: {}", e);
                return;
            }
        };

        if let Ok(mut w) = writer.lock() {
            if let Err(e) = writeln!(w, "{}", line).and_then(|_| w.flush()) {
                error!("Failed to write journal entry: {}", e);
            }
        }
    }
}

impl Default for EventJournal {
    fn default() -> Self {
        Self::disabled()
    }
}
