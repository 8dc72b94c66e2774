//! Reward claim coordination between a session's ledger and settlement

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::warn;

use crate::game::{InventoryLedger, ItemKind, LedgerSnapshot};
use crate::identity::Address;
use crate::settlement::{ClaimRequest, SettlementClient};

/// How a claim ended, from the ledger's point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Ledger was empty; settlement was not contacted
    Nothing,
    /// Settlement accepted the claim. `skipped` kinds have no reward
    /// contract and are cleared along with the rest.
    Settled {
        references: Vec<String>,
        kinds: Vec<ItemKind>,
        skipped: Vec<ItemKind>,
    },
    /// A transfer failed midway; only the kinds paid before it are cleared
    Partial {
        settled: Vec<ItemKind>,
        unsettled: Vec<ItemKind>,
        references: Vec<String>,
        error: String,
    },
    Failed { error: String },
}

impl ClaimOutcome {
    /// Zero what was paid out. Returns the kinds that were reset.
    pub fn apply(&self, ledger: &mut InventoryLedger) -> Vec<ItemKind> {
        match self {
            ClaimOutcome::Settled { kinds, .. } => {
                ledger.reset_all();
                kinds.clone()
            }
            ClaimOutcome::Partial { settled, .. } => {
                ledger.reset(settled);
                settled.clone()
            }
            ClaimOutcome::Nothing | ClaimOutcome::Failed { .. } => Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct ClaimCoordinator {
    client: Arc<dyn SettlementClient>,
}

impl ClaimCoordinator {
    pub fn new(client: Arc<dyn SettlementClient>) -> Self {
        Self { client }
    }

    /// Send the non-zero part of `snapshot` for `identity`
    pub async fn submit(&self, identity: &Address, snapshot: &LedgerSnapshot) -> ClaimOutcome {
        let counts: BTreeMap<String, Decimal> = snapshot
            .iter()
            .filter(|(_, count)| !count.is_zero())
            .map(|(kind, count)| (kind.label().to_string(), *count))
            .collect();

        if counts.is_empty() {
            return ClaimOutcome::Nothing;
        }

        let submitted: Vec<ItemKind> = counts.keys().filter_map(|label| ItemKind::from_label(label)).collect();
        let request = ClaimRequest {
            address: identity.to_string(),
            counts,
        };

        match self.client.claim(&request).await {
            Ok(receipt) => ClaimOutcome::Settled {
                references: receipt.references(),
                kinds: submitted,
                skipped: to_kinds(&receipt.skipped),
            },
            Err(e) => {
                warn!("Claim for {} failed: {}", identity, e);
                let done = e.settled();
                if done.is_empty() {
                    return ClaimOutcome::Failed { error: e.to_string() };
                }

                let settled = to_kinds(&done.iter().map(|s| s.kind.clone()).collect::<Vec<_>>());
                let unsettled = submitted.into_iter().filter(|k| !settled.contains(k)).collect();
                ClaimOutcome::Partial {
                    references: done.iter().map(|s| s.reference.clone()).collect(),
                    error: e.to_string(),
                    settled,
                    unsettled,
                }
            }
        }
    }
}

fn to_kinds(labels: &[String]) -> Vec<ItemKind> {
    labels.iter().filter_map(|label| ItemKind::from_label(label)).collect()
}
