//! ============================================================================
//! Core Types for the Marketplace Client
//! ============================================================================
//! Defines the item record read from the contract, the listing form, and
//! the outcome types shared by the session and the CLI.
//! These types are serialized to JSON for `--json` output.
//! ============================================================================

use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

/// Marketplace item as returned by the contract's `items(id)` view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: U256,
    pub name: String,
    /// Price in wei
    pub price: U256,
    pub seller: Address,
    pub owner: Address,
    pub is_sold: bool,
}

impl Item {
    /// A deleted slot comes back from the contract as a zeroed record
    pub fn is_tombstone(&self) -> bool {
        self.id.is_zero()
    }
}

impl From<(U256, String, U256, Address, Address, bool)> for Item {
    fn from((id, name, price, seller, owner, is_sold): (U256, String, U256, Address, Address, bool)) -> Self {
        Self { id, name, price, seller, owner, is_sold }
    }
}

/// "List an item" form state. Price is the user's ether-denominated text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    pub price: String,
}

impl ItemDraft {
    pub fn new(name: impl Into<String>, price: impl Into<String>) -> Self {
        Self { name: name.into(), price: price.into() }
    }

    /// Both fields must be filled before a listing is submitted
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.price.is_empty()
    }

    pub fn clear(&mut self) {
        self.name.clear();
        self.price.clear();
    }
}

/// Confirmation of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
}

/// Outcome of a mutating action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    /// Client-side validation failed, nothing was submitted
    Skipped,
    /// Transaction mined, lists reloaded
    Confirmed(TxReceipt),
    /// Submission or confirmation failed; the error was logged
    Failed,
}

impl ActionStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ActionStatus::Confirmed(_))
    }
}

/// Error types for the marketplace client
#[derive(Debug, Clone, thiserror::Error)]
pub enum MarketError {
    #[error("Wallet unavailable: no accounts to sign with")]
    WalletUnavailable,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid price '{0}': expected an ether amount")]
    InvalidPrice(String),

    #[error("Transaction {0:?} reverted")]
    Reverted(H256),

    #[error("Transaction {0:?} dropped before confirmation")]
    Dropped(H256),

    #[error("Contract call failed: {0}")]
    Contract(String),

    #[error("Provider error: {0}")]
    Provider(String),
}
