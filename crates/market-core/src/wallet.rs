//! ============================================================================
//! Wallet Provider - Accounts, Signers & Account-Change Notifications
//! ============================================================================
//! The client's only input boundary besides the contract ABI:
//! - Account access (first account is the active one)
//! - Signing capability bound to the marketplace contract
//! - Accounts-changed notifications when the active account switches
//!
//! `LocalWalletProvider` keeps the keys in process (loaded from hex private
//! keys or an encrypted JSON keystore) and talks JSON-RPC over HTTP.
//! ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, U256},
};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use crate::config::MarketConfig;
use crate::contract::{EthersMarketContract, MarketContract};
use crate::types::MarketError;

/// Capacity of the accounts-changed channel
const ACCOUNT_EVENTS_CAPACITY: usize = 16;

/// Source of accounts and signing capability
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Request account access. The first entry is the active account.
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    /// Build a contract handle that signs as `account`
    async fn bind(&self, account: Address, contract: Address) -> Result<Arc<dyn MarketContract>>;

    /// Accounts-changed notifications; an empty list means disconnected
    fn subscribe(&self) -> broadcast::Receiver<Vec<Address>>;
}

/// Wallet holding local signers, backed by an HTTP JSON-RPC provider
pub struct LocalWalletProvider {
    provider: Provider<Http>,
    /// Signers in account order (NEVER leave the process)
    signers: RwLock<Vec<LocalWallet>>,
    notifier: broadcast::Sender<Vec<Address>>,
}

impl LocalWalletProvider {
    /// Create a provider for `rpc_url` with the given signers
    pub fn new(rpc_url: &str, signers: Vec<LocalWallet>) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| anyhow!("Invalid RPC URL '{}': {}", rpc_url, e))?;
        let (notifier, _) = broadcast::channel(ACCOUNT_EVENTS_CAPACITY);

        info!("Wallet provider on {} with {} signer(s)", rpc_url, signers.len());

        Ok(Self {
            provider,
            signers: RwLock::new(signers),
            notifier,
        })
    }

    /// Create from configuration. Signer loading problems are logged and
    /// leave the wallet empty, which makes the session inert.
    pub fn from_config(config: &MarketConfig) -> Result<Self> {
        let mut signers = Vec::new();

        if let Some(keys) = config.private_keys.as_deref() {
            match parse_private_keys(keys, config.chain_id) {
                Ok(mut parsed) => signers.append(&mut parsed),
                Err(e) => warn!("Ignoring MARKET_PRIVATE_KEYS: {}", e),
            }
        }

        if let Some(path) = config.keystore_path.as_deref() {
            let password = config.keystore_password.as_deref().unwrap_or_default();
            match load_keystore(path, password, config.chain_id) {
                Ok(signer) => signers.push(signer),
                Err(e) => warn!("Ignoring keystore {}: {}", path, e),
            }
        }

        Self::new(&config.rpc_url, signers)
    }

    /// Make `account` the active account and notify subscribers
    pub async fn switch_account(&self, account: Address) -> Result<()> {
        let accounts = {
            let mut signers = self.signers.write().await;
            let index = signers
                .iter()
                .position(|s| s.address() == account)
                .ok_or_else(|| anyhow!("Account {:?} is not in this wallet", account))?;
            signers.rotate_left(index);
            signers.iter().map(|s| s.address()).collect::<Vec<_>>()
        };

        info!("Active account switched to {:?}", account);

        // No subscribers is fine
        let _ = self.notifier.send(accounts);
        Ok(())
    }

    /// Native balance of `account` in wei
    pub async fn balance(&self, account: Address) -> Result<U256> {
        self.provider
            .get_balance(account, None)
            .await
            .map_err(|e| MarketError::Provider(e.to_string()).into())
    }
}

#[async_trait]
impl WalletProvider for LocalWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        let signers = self.signers.read().await;
        if signers.is_empty() {
            return Err(MarketError::WalletUnavailable.into());
        }
        Ok(signers.iter().map(|s| s.address()).collect())
    }

    async fn bind(&self, account: Address, contract: Address) -> Result<Arc<dyn MarketContract>> {
        let signer = {
            let signers = self.signers.read().await;
            signers
                .iter()
                .find(|s| s.address() == account)
                .cloned()
                .ok_or_else(|| anyhow!("No signer for account {:?}", account))?
        };

        let client = SignerMiddleware::new(self.provider.clone(), signer);
        Ok(Arc::new(EthersMarketContract::new(contract, Arc::new(client))))
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<Address>> {
        self.notifier.subscribe()
    }
}

/// Parse comma-separated hex private keys into signers for `chain_id`
pub fn parse_private_keys(keys: &str, chain_id: u64) -> Result<Vec<LocalWallet>> {
    keys.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| {
            let hex = k.strip_prefix("0x").unwrap_or(k);
            hex.parse::<LocalWallet>()
                .map(|w| w.with_chain_id(chain_id))
                .map_err(|e| anyhow!("Invalid private key: {}", e))
        })
        .collect()
}

/// Decrypt an encrypted JSON keystore into a signer for `chain_id`
pub fn load_keystore(path: &str, password: &str, chain_id: u64) -> Result<LocalWallet> {
    info!("Loading keystore from: {}", path);

    let wallet = LocalWallet::decrypt_keystore(path, password)
        .map_err(|e| anyhow!("Failed to decrypt keystore: {}", e))?;

    Ok(wallet.with_chain_id(chain_id))
}
