//! ============================================================================
//! Marketplace Contract - Binding & Transaction Submission
//! ============================================================================
//! Wraps the abigen binding of the marketplace contract behind the
//! `MarketContract` trait:
//! - Read views: itemCount, items(id), getItemsByOwner(owner)
//! - Writes: listItem, purchaseItem (payable), deleteItem, transferItem
//! - Every write is submitted and awaited until mined
//!
//! Events (ItemListed, ItemPurchased, ItemDeleted) are part of the binding
//! but not subscribed to; state is re-read by polling.
//! ============================================================================

use anyhow::Result;
use async_trait::async_trait;
use ethers::{
    contract::{abigen, ContractCall},
    providers::Middleware,
    types::{Address, U256, U64},
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::types::{Item, MarketError, TxReceipt};

abigen!(MarketplaceContract, "abi/Marketplace.json");

/// Address the marketplace contract is deployed at
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x530ed5aa0c66cf4dfbf3209c085617c0fc26513e";

/// Contract ABI as shipped with the crate
pub const MARKETPLACE_ABI_JSON: &str = include_str!("../abi/Marketplace.json");

/// Operations the client performs against the marketplace contract
#[async_trait]
pub trait MarketContract: Send + Sync {
    /// Address of the bound contract
    fn address(&self) -> Address;

    async fn item_count(&self) -> Result<U256>;

    async fn item(&self, id: U256) -> Result<Item>;

    async fn items_by_owner(&self, owner: Address) -> Result<Vec<U256>>;

    async fn list_item(&self, name: &str, price: U256) -> Result<TxReceipt>;

    /// Payable: `value` wei are sent with the call
    async fn purchase_item(&self, id: U256, value: U256) -> Result<TxReceipt>;

    async fn delete_item(&self, id: U256) -> Result<TxReceipt>;

    async fn transfer_item(&self, id: U256, to: Address) -> Result<TxReceipt>;
}

/// `MarketContract` backed by an ethers middleware (usually a signer client)
pub struct EthersMarketContract<M: Middleware> {
    inner: MarketplaceContract<M>,
}

impl<M: Middleware + 'static> EthersMarketContract<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self {
            inner: MarketplaceContract::new(address, client),
        }
    }

    /// Send a write call and wait for its receipt
    async fn submit(&self, call: ContractCall<M, ()>, label: &str) -> Result<TxReceipt> {
        let pending = call
            .send()
            .await
            .map_err(|e| MarketError::Contract(e.to_string()))?;

        let tx_hash = pending.tx_hash();
        info!("{} submitted: {:?}", label, tx_hash);

        let receipt = pending
            .await
            .map_err(|e| MarketError::Provider(e.to_string()))?
            .ok_or(MarketError::Dropped(tx_hash))?;

        if receipt.status == Some(U64::zero()) {
            return Err(MarketError::Reverted(tx_hash).into());
        }

        let block_number = receipt.block_number.map(|n| n.as_u64());
        info!("{} confirmed in block {:?}", label, block_number);

        Ok(TxReceipt { tx_hash, block_number })
    }
}

#[async_trait]
impl<M: Middleware + 'static> MarketContract for EthersMarketContract<M> {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn item_count(&self) -> Result<U256> {
        let count = self
            .inner
            .item_count()
            .call()
            .await
            .map_err(|e| MarketError::Contract(e.to_string()))?;
        debug!("itemCount = {}", count);
        Ok(count)
    }

    async fn item(&self, id: U256) -> Result<Item> {
        let record = self
            .inner
            .items(id)
            .call()
            .await
            .map_err(|e| MarketError::Contract(e.to_string()))?;
        Ok(Item::from(record))
    }

    async fn items_by_owner(&self, owner: Address) -> Result<Vec<U256>> {
        let ids = self
            .inner
            .get_items_by_owner(owner)
            .call()
            .await
            .map_err(|e| MarketError::Contract(e.to_string()))?;
        debug!("getItemsByOwner({:?}) = {} ids", owner, ids.len());
        Ok(ids)
    }

    async fn list_item(&self, name: &str, price: U256) -> Result<TxReceipt> {
        let call = self.inner.list_item(name.to_string(), price);
        self.submit(call, "listItem").await
    }

    async fn purchase_item(&self, id: U256, value: U256) -> Result<TxReceipt> {
        let call = self.inner.purchase_item(id).value(value);
        self.submit(call, "purchaseItem").await
    }

    async fn delete_item(&self, id: U256) -> Result<TxReceipt> {
        let call = self.inner.delete_item(id);
        self.submit(call, "deleteItem").await
    }

    async fn transfer_item(&self, id: U256, to: Address) -> Result<TxReceipt> {
        let call = self.inner.transfer_item(id, to);
        self.submit(call, "transferItem").await
    }
}
