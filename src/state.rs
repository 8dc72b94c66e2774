//! Application state shared across all handlers

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::config::{ServerConfig, REWARD_UNIT};
use crate::journal::EventJournal;
use crate::session::{ClaimCoordinator, SessionDeps, SessionHandle};
use crate::settlement::{JournalTransfer, SettlementService};
use crate::wallet::Wallet;

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    /// Event journal for sessions and payouts
    pub journal: Arc<EventJournal>,
    /// Server-side reward settlement
    pub settlement: Arc<SettlementService>,
    /// Live sessions, keyed by connection id
    pub sessions: DashMap<Uuid, SessionHandle>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let journal = Arc::new(EventJournal::open(config.event_log_file.as_deref()));
        let transfer = Arc::new(JournalTransfer::new(journal.clone()));
        let settlement = Arc::new(SettlementService::new(
            config.token_addresses.clone(),
            REWARD_UNIT,
            transfer,
            journal.clone(),
        ));

        Self {
            config,
            journal,
            settlement,
            sessions: DashMap::new(),
        }
    }

    /// Collaborators for a new session using `wallet`
    pub fn session_deps(&self, wallet: Arc<dyn Wallet>) -> SessionDeps {
        SessionDeps {
            wallet,
            claims: ClaimCoordinator::new(self.settlement.clone()),
            journal: self.journal.clone(),
            runtime: self.config.runtime.clone(),
        }
    }

    /// Get the number of active sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
