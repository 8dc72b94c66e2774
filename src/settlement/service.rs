//! Server-side settlement service

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::{ClaimReceipt, ClaimRequest, Settlement, SettlementClient, SettlementError, TokenTransfer};
use crate::identity::Address;
use crate::journal::{EventJournal, JournalEvent};

/// Validates claims, prices them and runs the transfers one kind at a time
pub struct SettlementService {
    /// Item label to reward token contract
    tokens: HashMap<String, Address>,
    /// Reward units per collected count
    unit: Decimal,
    transfer: Arc<dyn TokenTransfer>,
    journal: Arc<EventJournal>,
}

impl SettlementService {
    pub fn new(
        tokens: HashMap<String, Address>,
        unit: Decimal,
        transfer: Arc<dyn TokenTransfer>,
        journal: Arc<EventJournal>,
    ) -> Self {
        let tokens = tokens
            .into_iter()
            .map(|(label, address)| (label.to_ascii_uppercase(), address))
            .collect();
        Self {
            tokens,
            unit,
            transfer,
            journal,
        }
    }

    /// Payout for `count` collected units
    pub fn payout_for(&self, count: Decimal) -> Decimal {
        (count * self.unit).normalize()
    }

    async fn settle(&self, request: &ClaimRequest) -> Result<ClaimReceipt, SettlementError> {
        let to = Address::parse(&request.address)?;

        // Reject the whole claim before moving anything
        if let Some((kind, count)) = request.counts.iter().find(|(_, c)| c.is_sign_negative() && !c.is_zero()) {
            return Err(SettlementError::InvalidCount {
                kind: kind.clone(),
                count: *count,
            });
        }

        let mut receipt = ClaimReceipt::default();
        for (kind, count) in request.counts.iter().filter(|(_, c)| !c.is_zero()) {
            let kind = kind.to_ascii_uppercase();
            let Some(token) = self.tokens.get(&kind) else {
                receipt.skipped.push(kind);
                continue;
            };

            let amount = self.payout_for(*count);
            match self.transfer.transfer(token, &to, amount).await {
                Ok(reference) => receipt.settlements.push(Settlement {
                    kind,
                    amount,
                    reference,
                }),
                Err(source) => {
                    return Err(SettlementError::Transfer {
                        kind,
                        settled: receipt.settlements,
                        source,
                    });
                }
            }
        }

        Ok(receipt)
    }
}

#[async_trait]
impl SettlementClient for SettlementService {
    async fn claim(&self, request: &ClaimRequest) -> Result<ClaimReceipt, SettlementError> {
        let result = self.settle(request).await;

        let settled = match &result {
            Ok(receipt) => {
                info!(
                    "Claim for {} settled: {:?} (skipped {:?})",
                    request.address,
                    receipt.settled_kinds(),
                    receipt.skipped
                );
                receipt.settlements.as_slice()
            }
            Err(e) => {
                warn!("Claim for {} failed: {}", request.address, e);
                e.settled()
            }
        };

        if !settled.is_empty() {
            self.journal.record(JournalEvent::ClaimSettled {
                address: request.address.clone(),
                settled: settled.iter().map(|s| s.kind.clone()).collect(),
                references: settled.iter().map(|s| s.reference.clone()).collect(),
            });
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::TransferError;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    const PLAYER: &str = "0x0F0BDEbF0F83cD1EE3974779Bcb7315f9808c714";
    const YAKI_TOKEN: &str = "0xfe140e1dCe99Be9F4F15d657CD9b7BF622270C50";
    const CHOG_TOKEN: &str = "0xE0590015A873bF326bd645c3E1266d4db41C4E6B";

    /// Records transfers; fails for one token if asked to
    #[derive(Default)]
    struct RecordingTransfer {
        calls: Mutex<Vec<(String, Decimal)>>,
        fail_token: Option<String>,
    }

    #[async_trait]
    impl TokenTransfer for RecordingTransfer {
        async fn transfer(&self, token: &Address, _to: &Address, amount: Decimal) -> Result<String, TransferError> {
            if self.fail_token.as_deref() == Some(token.as_str()) {
                return Err(TransferError::Unavailable("rpc down".to_string()));
            }
            let mut calls = self.calls.lock().unwrap();
            calls.push((token.to_string(), amount));
            Ok(format!("tx-{}", calls.len()))
        }
    }

    fn service(transfer: Arc<RecordingTransfer>) -> SettlementService {
        let tokens = HashMap::from([
            ("YAKI".to_string(), Address::parse(YAKI_TOKEN).unwrap()),
            ("chog".to_string(), Address::parse(CHOG_TOKEN).unwrap()),
        ]);
        SettlementService::new(tokens, dec!(0.01), transfer, Arc::new(EventJournal::disabled()))
    }

    fn request(counts: &[(&str, Decimal)]) -> ClaimRequest {
        ClaimRequest {
            address: PLAYER.to_string(),
            counts: counts
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn test_only_nonzero_kinds_are_paid() {
        let transfer = Arc::new(RecordingTransfer::default());
        let svc = service(transfer.clone());

        let receipt = svc
            .claim(&request(&[("YAKI", dec!(2)), ("CHOG", Decimal::ZERO)]))
            .await
            .unwrap();

        assert_eq!(receipt.settled_kinds(), vec!["YAKI".to_string()]);
        let calls = transfer.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(YAKI_TOKEN.to_string(), dec!(0.02))]);
    }

    #[tokio::test]
    async fn test_unknown_kinds_are_skipped() {
        let transfer = Arc::new(RecordingTransfer::default());
        let svc = service(transfer.clone());

        let receipt = svc
            .claim(&request(&[("MON", dec!(0.03)), ("chog", dec!(1))]))
            .await
            .unwrap();
        assert_eq!(receipt.skipped, vec!["MON".to_string()]);
        assert_eq!(receipt.settled_kinds(), vec!["CHOG".to_string()]);
    }

    #[tokio::test]
    async fn test_bad_address_is_rejected() {
        let svc = service(Arc::new(RecordingTransfer::default()));
        let mut req = request(&[("YAKI", dec!(1))]);
        req.address = "nobody".to_string();
        assert!(matches!(svc.claim(&req).await, Err(SettlementError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_negative_count_moves_nothing() {
        let transfer = Arc::new(RecordingTransfer::default());
        let svc = service(transfer.clone());

        let result = svc.claim(&request(&[("CHOG", dec!(1)), ("YAKI", dec!(-5))])).await;
        assert!(matches!(result, Err(SettlementError::InvalidCount { .. })));
        assert!(transfer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_reports_settled_kinds() {
        let transfer = Arc::new(RecordingTransfer {
            fail_token: Some(YAKI_TOKEN.to_string()),
            ..Default::default()
        });
        let svc = service(transfer);

        // BTreeMap order: CHOG settles first, then YAKI fails
        let err = svc
            .claim(&request(&[("YAKI", dec!(1)), ("CHOG", dec!(3))]))
            .await
            .unwrap_err();

        match &err {
            SettlementError::Transfer { kind, settled, .. } => {
                assert_eq!(kind, "YAKI");
                assert_eq!(settled.len(), 1);
                assert_eq!(settled[0].kind, "CHOG");
                assert_eq!(settled[0].amount, dec!(0.03));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_payout_is_count_times_unit() {
        let svc = service(Arc::new(RecordingTransfer::default()));
        assert_eq!(svc.payout_for(dec!(7)), dec!(0.07));
        assert_eq!(svc.payout_for(dec!(0.05)), dec!(0.0005));
    }
}
