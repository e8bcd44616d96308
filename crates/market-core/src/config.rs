// ============================================================================
// MarketConfig — Environment-driven client configuration
// ============================================================================
// Values come from the process environment (a .env file is loaded by the
// binary before this is read). CLI flags override individual fields.
// ============================================================================

use anyhow::{anyhow, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::contract::DEFAULT_CONTRACT_ADDRESS;

/// Local development node
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Chain id of a local development node
pub const DEFAULT_CHAIN_ID: u64 = 31337;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: String,
    /// Comma-separated hex private keys
    #[serde(skip_serializing)]
    pub private_keys: Option<String>,
    pub keystore_path: Option<String>,
    #[serde(skip_serializing)]
    pub keystore_password: Option<String>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl MarketConfig {
    /// Build from a key lookup (the environment, in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            rpc_url: lookup("MARKET_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            chain_id: lookup("MARKET_CHAIN_ID")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_CHAIN_ID),
            contract_address: lookup("MARKET_CONTRACT_ADDRESS")
                .unwrap_or_else(|| DEFAULT_CONTRACT_ADDRESS.to_string()),
            private_keys: lookup("MARKET_PRIVATE_KEYS").filter(|v| !v.trim().is_empty()),
            keystore_path: lookup("MARKET_KEYSTORE").filter(|v| !v.trim().is_empty()),
            keystore_password: lookup("MARKET_KEYSTORE_PASSWORD"),
        }
    }

    /// Parsed contract address
    pub fn contract_address(&self) -> Result<Address> {
        parse_address(&self.contract_address)
    }
}

/// Parse a 0x-prefixed hex address (any letter case)
pub fn parse_address(text: &str) -> Result<Address> {
    text.trim()
        .parse::<Address>()
        .map_err(|_| anyhow!(crate::types::MarketError::InvalidAddress(text.to_string())))
}
