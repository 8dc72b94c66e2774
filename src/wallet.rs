//! Wallet collaborator: network provisioning, account access and the entry payment
//!
//! The game never signs anything itself. [`RemoteWallet`] forwards each
//! request over the player's WebSocket to the browser wallet and waits for
//! the matching reply.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::config::{
    BLOCK_EXPLORER_URL, CHAIN_ID_HEX, CHAIN_NAME, NATIVE_CURRENCY_DECIMALS, NATIVE_CURRENCY_NAME,
    NATIVE_CURRENCY_SYMBOL, RPC_URL,
};
use crate::identity::{Address, IdentityError};
use crate::protocol::ServerMessage;

/// Wallet failures; all of them leave the session where it was
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("wallet rejected the request: {0}")]
    Rejected(String),

    #[error("wallet returned an invalid account: {0}")]
    InvalidAccount(#[from] IdentityError),

    #[error("wallet returned no value")]
    EmptyReply,

    #[error("wallet did not answer within {0:?}")]
    Timeout(Duration),

    #[error("wallet bridge disconnected")]
    Disconnected,
}

/// Chain parameters in the shape `wallet_addEthereumChain` expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkParams {
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl NetworkParams {
    pub fn monad_testnet() -> Self {
        Self {
            chain_id: CHAIN_ID_HEX.to_string(),
            chain_name: CHAIN_NAME.to_string(),
            native_currency: NativeCurrency {
                name: NATIVE_CURRENCY_NAME.to_string(),
                symbol: NATIVE_CURRENCY_SYMBOL.to_string(),
                decimals: NATIVE_CURRENCY_DECIMALS,
            },
            rpc_urls: vec![RPC_URL.to_string()],
            block_explorer_urls: vec![BLOCK_EXPLORER_URL.to_string()],
        }
    }
}

/// Confirmation of the entry payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    /// Transaction hash or other wallet-side reference
    pub reference: String,
}

/// Capability interface to the player's wallet
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Add and switch to the game's network
    async fn ensure_network(&self, params: &NetworkParams) -> Result<(), WalletError>;

    /// Ask for account access and return the player's address
    async fn connect(&self) -> Result<Address, WalletError>;

    /// Send `amount` of the native currency to `to` and wait for confirmation
    async fn send_payment(&self, to: &Address, amount: Decimal) -> Result<PaymentReceipt, WalletError>;
}

/// Request forwarded to the browser wallet
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WalletRequest {
    EnsureNetwork { params: NetworkParams },
    Connect,
    SendPayment { to: Address, amount: Decimal },
}

/// Browser's answer to a [`WalletRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WalletReply {
    pub ok: bool,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl WalletReply {
    fn into_value(self) -> Result<Option<String>, WalletError> {
        if self.ok {
            Ok(self.value.filter(|v| !v.trim().is_empty()))
        } else {
            Err(WalletError::Rejected(
                self.error.unwrap_or_else(|| "request rejected".to_string()),
            ))
        }
    }
}

/// Wallet reached through the player's browser
pub struct RemoteWallet {
    outbound: mpsc::UnboundedSender<ServerMessage>,
    pending: DashMap<u64, oneshot::Sender<WalletReply>>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl RemoteWallet {
    pub fn new(outbound: mpsc::UnboundedSender<ServerMessage>, timeout: Duration) -> Self {
        Self {
            outbound,
            pending: DashMap::new(),
            next_id: AtomicU64::new(1),
            timeout,
        }
    }

    /// Deliver a browser reply. Returns `false` for unknown or expired ids.
    pub fn resolve(&self, id: u64, reply: WalletReply) -> bool {
        match self.pending.remove(&id) {
            Some((_, tx)) => tx.send(reply).is_ok(),
            None => {
                debug!("Wallet reply for unknown request {}", id);
                false
            }
        }
    }

    /// Fail every outstanding request; used when the socket closes
    pub fn close(&self) {
        self.pending.clear();
    }

    #[cfg(test)]
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    async fn request(&self, request: WalletRequest) -> Result<Option<String>, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        debug!("Wallet request {}: {:?}", id, request);
        if self.outbound.send(ServerMessage::WalletRequest { id, request }).is_err() {
            self.pending.remove(&id);
            return Err(WalletError::Disconnected);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) => reply.into_value(),
            Ok(Err(_)) => Err(WalletError::Disconnected),
            Err(_) => {
                self.pending.remove(&id);
                Err(WalletError::Timeout(self.timeout))
            }
        }
    }
}

#[async_trait]
impl Wallet for RemoteWallet {
    async fn ensure_network(&self, params: &NetworkParams) -> Result<(), WalletError> {
        self.request(WalletRequest::EnsureNetwork {
            params: params.clone(),
        })
        .await
        .map(|_| ())
    }

    async fn connect(&self) -> Result<Address, WalletError> {
        let account = self
            .request(WalletRequest::Connect)
            .await?
            .ok_or(WalletError::EmptyReply)?;
        Ok(Address::parse(&account)?)
    }

    async fn send_payment(&self, to: &Address, amount: Decimal) -> Result<PaymentReceipt, WalletError> {
        let reference = self
            .request(WalletRequest::SendPayment {
                to: to.clone(),
                amount,
            })
            .await?
            .ok_or(WalletError::EmptyReply)?;
        Ok(PaymentReceipt { reference })
    }
}
