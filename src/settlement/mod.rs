//! Reward settlement: the server-side collaborator that turns claimed counts
//! into token payouts.
//!
//! Clients only ever submit counts. The payout amount per kind is computed
//! here as `count × REWARD_UNIT`, and the transfer itself is delegated to a
//! [`TokenTransfer`] backend that holds the signing credential.

pub mod service;
pub mod transfer;

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::IdentityError;

pub use service::SettlementService;
pub use transfer::{JournalTransfer, TokenTransfer, TransferError};

/// Body of `POST /claim`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRequest {
    #[serde(alias = "identity")]
    pub address: String,
    /// Item label (e.g. `YAKI`) to collected count
    #[serde(default)]
    pub counts: BTreeMap<String, Decimal>,
}

/// One settled reward transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub kind: String,
    pub amount: Decimal,
    pub reference: String,
}

/// Result of a fully settled claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClaimReceipt {
    pub settlements: Vec<Settlement>,
    /// Non-zero kinds with no reward contract configured
    pub skipped: Vec<String>,
}

impl ClaimReceipt {
    pub fn references(&self) -> Vec<String> {
        self.settlements.iter().map(|s| s.reference.clone()).collect()
    }

    pub fn settled_kinds(&self) -> Vec<String> {
        self.settlements.iter().map(|s| s.kind.clone()).collect()
    }
}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] IdentityError),

    #[error("Invalid count for {kind}: {count}")]
    InvalidCount { kind: String, count: Decimal },

    /// A transfer failed; transfers before it went through
    #[error("Transfer of {kind} failed: {source}")]
    Transfer {
        kind: String,
        settled: Vec<Settlement>,
        #[source]
        source: TransferError,
    },
}

impl SettlementError {
    /// Transfers that completed before the failure
    pub fn settled(&self) -> &[Settlement] {
        match self {
            SettlementError::Transfer { settled, .. } => settled,
            _ => &[],
        }
    }
}

/// Client side of the settlement boundary
#[async_trait]
pub trait SettlementClient: Send + Sync {
    async fn claim(&self, request: &ClaimRequest) -> Result<ClaimReceipt, SettlementError>;
}

/// JSON answer of `POST /claim`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub ok: bool,
    #[serde(rename = "settlementRefs", default)]
    pub settlement_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settled: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClaimResponse {
    pub fn success(receipt: &ClaimReceipt) -> Self {
        Self {
            ok: true,
            settlement_refs: receipt.references(),
            settled: receipt.settled_kinds(),
            skipped: receipt.skipped.clone(),
            error: None,
        }
    }

    pub fn failure(error: &SettlementError) -> Self {
        let settled = error.settled();
        Self {
            ok: false,
            settlement_refs: settled.iter().map(|s| s.reference.clone()).collect(),
            settled: settled.iter().map(|s| s.kind.clone()).collect(),
            skipped: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}
