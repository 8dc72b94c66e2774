//! Token transfer backend

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::identity::Address;
use crate::journal::{EventJournal, JournalEvent};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("transfer rejected: {0}")]
    Rejected(String),

    #[error("transfer backend unavailable: {0}")]
    Unavailable(String),
}

/// Executes one reward payout and returns its settlement reference
#[async_trait]
pub trait TokenTransfer: Send + Sync {
    async fn transfer(&self, token: &Address, to: &Address, amount: Decimal) -> Result<String, TransferError>;
}

/// Records payout instructions in the event journal for the signer that
/// holds the treasury key. Each instruction gets a fresh reference.
pub struct JournalTransfer {
    journal: Arc<EventJournal>,
}

impl JournalTransfer {
    pub fn new(journal: Arc<EventJournal>) -> Self {
        Self { journal }
    }
}

#[async_trait]
impl TokenTransfer for JournalTransfer {
    async fn transfer(&self, token: &Address, to: &Address, amount: Decimal) -> Result<String, TransferError> {
        if amount <= Decimal::ZERO {
            return Err(TransferError::Rejected(format!("non-positive amount {amount}")));
        }

        let reference = format!("payout-{}", Uuid::new_v4());
        info!("Payout {}: {} of {} to {}", reference, amount, token, to);

        self.journal.record(JournalEvent::RewardTransfer {
            reference: reference.clone(),
            token: token.to_string(),
            to: to.to_string(),
            amount,
        });

        Ok(reference)
    }
}
