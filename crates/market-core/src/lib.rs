//! ============================================================================
//! MARKET-CORE: Marketplace client logic
//! ============================================================================
//! This crate handles everything behind the marketplace front-end:
//! - Contract binding (abigen) and transaction submission via ethers
//! - Wallet provider: accounts, local signers, account-change notifications
//! - Sequential item loaders and the in-memory page session
//! - View model for rendering the page
//! ============================================================================

pub mod config;
pub mod contract;
pub mod loader;
pub mod session;
pub mod types;
pub mod units;
pub mod view;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use config::MarketConfig;
pub use contract::{EthersMarketContract, MarketContract, DEFAULT_CONTRACT_ADDRESS};
pub use session::MarketSession;
pub use types::*;
pub use units::{format_price, parse_price};
pub use view::{CardAction, ItemCard, MarketView};
pub use wallet::{LocalWalletProvider, WalletProvider};
