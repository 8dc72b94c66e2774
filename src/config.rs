//! Game configuration constants and runtime settings

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::identity::Address;

// =============================================================================
// Playfield
// =============================================================================

/// Default grid width in cells
pub const DEFAULT_COLS: i32 = 30;

/// Default grid height in cells
pub const DEFAULT_ROWS: i32 = 20;

/// Smallest grid dimension a client may request
pub const MIN_GRID_DIM: i32 = 8;

/// Largest grid dimension a client may request
pub const MAX_GRID_DIM: i32 = 120;

/// Game tick delay in milliseconds
pub const TICK_DELAY_MS: u64 = 50;

// =============================================================================
// Items and lives
// =============================================================================

/// Hearts at the start of every paid game
pub const MAX_LIVES: u32 = 3;

/// Time between the special item leaving the board and the next one appearing
pub const SPECIAL_SPAWN_PERIOD: Duration = Duration::from_secs(20);

/// How long the special item stays before it expires and costs a heart
pub const SPECIAL_DWELL: Duration = Duration::from_secs(5);

/// Lifetime of a floating score text
pub const FLOAT_TEXT_TTL: Duration = Duration::from_secs(1);

/// Floating text shown when a heart is lost
pub const LIFE_LOST_TEXT: &str = "-0.05 $MON";

// =============================================================================
// Session plumbing
// =============================================================================

/// How long a wallet request may stay unanswered by the browser
pub const WALLET_TIMEOUT: Duration = Duration::from_secs(120);

/// Capacity of a session's command and internal event queues
pub const SESSION_QUEUE_CAPACITY: usize = 64;

// =============================================================================
// Payment and rewards
// =============================================================================

/// Default HTTP port
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Payment destination used when none is configured
pub const DEFAULT_TREASURY: &str = "0xD45005C45b8b6cBF642CB480A87e2C9e412B724E";

/// Entry fee (native MON) used when none is configured
pub const DEFAULT_PAY_AMOUNT: Decimal = dec!(0.15);

/// Reward token units paid out per collected count
pub const REWARD_UNIT: Decimal = dec!(0.01);

/// Reward token contracts used when `TOKEN_ADDRESSES` is unset
pub const DEFAULT_TOKEN_ADDRESSES: &[(&str, &str)] = &[
    ("YAKI", "0xfe140e1dCe99Be9F4F15d657CD9b7BF622270C50"),
    ("CHOG", "0xE0590015A873bF326bd645c3E1266d4db41C4E6B"),
    ("DAK", "0x0F0BDEbF0F83cD1EE3974779Bcb7315f9808c714"),
];

// =============================================================================
// Network (Monad testnet)
// =============================================================================

pub const CHAIN_ID_HEX: &str = "0x279f";
pub const CHAIN_NAME: &str = "Monad Testnet";
pub const NATIVE_CURRENCY_NAME: &str = "Monad Coin";
pub const NATIVE_CURRENCY_SYMBOL: &str = "MON";
pub const NATIVE_CURRENCY_DECIMALS: u8 = 18;
pub const RPC_URL: &str = "https://testnet-rpc.monad.xyz";
pub const BLOCK_EXPLORER_URL: &str = "https://testnet.monadexplorer.com";

// =============================================================================
// Event journal
// =============================================================================

/// Default journal file path
pub const EVENT_LOG_FILE: &str = "game_events.log";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid PORT: {0}")]
    InvalidPort(String),

    #[error("TOKEN_ADDRESSES is not a JSON object of strings: {0}")]
    TokenAddressesJson(#[from] serde_json::Error),

    #[error("invalid contract address for {label}: {address}")]
    InvalidTokenAddress { label: String, address: String },
}

/// Payment parameters served to the browser at `/config.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeConfig {
    #[serde(rename = "TREASURY")]
    pub treasury: Address,
    #[serde(rename = "PAY_AMOUNT")]
    pub pay_amount: Decimal,
}

impl RuntimeConfig {
    /// Read treasury and entry fee; anything missing or malformed falls back
    /// to the built-in values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let treasury = lookup("TREASURY")
            .and_then(|raw| match Address::parse(&raw) {
                Ok(address) => Some(address),
                Err(e) => {
                    debug!("Ignoring TREASURY ({}), using default", e);
                    None
                }
            })
            .unwrap_or(defaults.treasury);

        let pay_amount = lookup("PAY_AMOUNT")
            .and_then(|raw| match raw.trim().parse::<Decimal>() {
                Ok(amount) if amount > Decimal::ZERO => Some(amount),
                _ => {
                    debug!("Ignoring PAY_AMOUNT '{}', using default", raw);
                    None
                }
            })
            .unwrap_or(defaults.pay_amount);

        Self { treasury, pay_amount }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            treasury: Address::parse(DEFAULT_TREASURY).expect("default treasury is a valid address"),
            pay_amount: DEFAULT_PAY_AMOUNT,
        }
    }
}

/// Server configuration read from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub runtime: RuntimeConfig,
    /// Token label (e.g. `YAKI`) to reward contract address
    pub token_addresses: HashMap<String, Address>,
    /// Journal file, `None` when journaling is disabled
    pub event_log_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => DEFAULT_SERVER_PORT,
        };

        let token_addresses = match lookup("TOKEN_ADDRESSES") {
            Some(raw) => parse_token_addresses(&raw)?,
            None => default_token_addresses(),
        };

        let journal_enabled = lookup("ENABLE_EVENT_LOG")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no"))
            .unwrap_or(true);
        let event_log_file = journal_enabled.then(|| {
            lookup("EVENT_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(EVENT_LOG_FILE))
        });

        Ok(Self {
            port,
            runtime: RuntimeConfig::from_lookup(&lookup),
            token_addresses,
            event_log_file,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            runtime: RuntimeConfig::default(),
            token_addresses: default_token_addresses(),
            event_log_file: None,
        }
    }
}

fn parse_token_addresses(raw: &str) -> Result<HashMap<String, Address>, ConfigError> {
    let entries: HashMap<String, String> = serde_json::from_str(raw)?;

    entries
        .into_iter()
        .map(|(label, address)| match Address::parse(&address) {
            Ok(parsed) => Ok((label.to_ascii_uppercase(), parsed)),
            Err(_) => Err(ConfigError::InvalidTokenAddress { label, address }),
        })
        .collect()
}

fn default_token_addresses() -> HashMap<String, Address> {
    DEFAULT_TOKEN_ADDRESSES
        .iter()
        .filter_map(|(label, address)| Address::parse(address).ok().map(|a| (label.to_string(), a)))
        .collect()
}
