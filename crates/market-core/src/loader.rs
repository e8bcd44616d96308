//! ============================================================================
//! Item Loaders - Sequential reads of contract state
//! ============================================================================
//! - `load_items`: itemCount, then items(1..=count) one by one
//! - `load_owned_items`: getItemsByOwner(owner), then items(id) per id
//!
//! Reads are awaited in order. The first failing read aborts the load and
//! the error goes back to the caller.
//! ============================================================================

use anyhow::Result;
use ethers::types::{Address, U256};
use tracing::debug;

use crate::contract::MarketContract;
use crate::types::Item;

/// Read every item slot from 1 to `itemCount()` inclusive
pub async fn load_items(contract: &dyn MarketContract) -> Result<Vec<Item>> {
    let count = contract.item_count().await?;
    debug!("Loading {} items", count);

    let mut items = Vec::new();
    let mut id = U256::one();
    while id <= count {
        items.push(contract.item(id).await?);
        id += U256::one();
    }

    Ok(items)
}

/// Read the items `owner` holds, in the order the contract lists them
pub async fn load_owned_items(contract: &dyn MarketContract, owner: Address) -> Result<Vec<Item>> {
    let ids = contract.items_by_owner(owner).await?;
    debug!("Loading {} items owned by {:?}", ids.len(), owner);

    let mut items = Vec::with_capacity(ids.len());
    for id in ids {
        items.push(contract.item(id).await?);
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeChain;

    #[tokio::test]
    async fn test_load_items_reads_every_slot_in_order() {
        let chain = FakeChain::new();
        let alice = FakeChain::account(1);
        chain.seed(alice, "Lamp", 10);
        chain.seed(alice, "Chair", 20);
        chain.seed(alice, "Desk", 30);

        let contract = chain.contract(alice);
        let items = load_items(&contract).await.unwrap();

        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Lamp", "Chair", "Desk"]);
        assert_eq!(chain.reads(), ["itemCount", "items(1)", "items(2)", "items(3)"]);
    }

    #[tokio::test]
    async fn test_load_items_empty_market() {
        let chain = FakeChain::new();
        let contract = chain.contract(FakeChain::account(1));

        assert!(load_items(&contract).await.unwrap().is_empty());
        assert_eq!(chain.reads(), ["itemCount"]);
    }

    #[tokio::test]
    async fn test_load_items_keeps_tombstones() {
        let chain = FakeChain::new();
        let alice = FakeChain::account(1);
        chain.seed(alice, "Lamp", 10);
        chain.seed(alice, "Chair", 20);
        chain.tombstone(1);

        let items = load_items(&chain.contract(alice)).await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_tombstone());
        assert_eq!(items[1].name, "Chair");
    }

    #[tokio::test]
    async fn test_failed_read_aborts_load() {
        let chain = FakeChain::new();
        let alice = FakeChain::account(1);
        chain.seed(alice, "Lamp", 10);
        chain.seed(alice, "Chair", 20);
        chain.seed(alice, "Desk", 30);
        chain.fail_read_of(2);

        assert!(load_items(&chain.contract(alice)).await.is_err());
        // Nothing is read past the failing slot
        assert_eq!(chain.reads(), ["itemCount", "items(1)", "items(2)"]);
    }

    #[tokio::test]
    async fn test_load_owned_items_follows_contract_order() {
        let chain = FakeChain::new();
        let alice = FakeChain::account(1);
        let bob = FakeChain::account(2);
        chain.seed(alice, "Lamp", 10);
        chain.seed(bob, "Chair", 20);
        chain.seed(alice, "Desk", 30);

        let owned = load_owned_items(&chain.contract(bob), alice).await.unwrap();
        let ids: Vec<u64> = owned.iter().map(|i| i.id.as_u64()).collect();
        assert_eq!(ids, [1, 3]);
        assert_eq!(
            chain.reads(),
            [format!("getItemsByOwner({:?})", alice), "items(1)".into(), "items(3)".into()]
        );
    }

    #[tokio::test]
    async fn test_owned_items_failure_propagates() {
        let chain = FakeChain::new();
        let alice = FakeChain::account(1);
        chain.seed(alice, "Lamp", 10);
        chain.fail_read_of(1);

        assert!(load_owned_items(&chain.contract(alice), alice).await.is_err());
    }
}
