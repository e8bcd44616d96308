//! In-memory stand-ins for the marketplace contract and the wallet, used by
//! the unit tests. The fake contract keeps the same observable rules as the
//! deployed one: sequential ids, zeroed records for deleted slots, payable
//! purchase at the exact price, seller-only delete, owner-only transfer.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};

use crate::contract::MarketContract;
use crate::types::{Item, MarketError, TxReceipt};
use crate::wallet::WalletProvider;

#[derive(Default)]
struct ChainState {
    items: Vec<Item>,
    reads: Vec<String>,
    writes: Vec<String>,
    fail_read_of: Option<U256>,
    fail_writes: bool,
    block: u64,
    loading_probe: Option<watch::Receiver<bool>>,
    loading_seen: Vec<bool>,
}

/// Shared fake chain state
#[derive(Clone, Default)]
pub struct FakeChain {
    state: Arc<Mutex<ChainState>>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    pub fn contract_address() -> Address {
        Address::from_low_u64_be(0xC0DE)
    }

    /// Insert an item directly, as if `seller` had listed it
    pub fn seed(&self, seller: Address, name: &str, price: u64) -> U256 {
        let mut state = self.state.lock().unwrap();
        let id = U256::from(state.items.len() + 1);
        state.items.push(Item {
            id,
            name: name.to_string(),
            price: U256::from(price),
            seller,
            owner: seller,
            is_sold: false,
        });
        id
    }

    pub fn tombstone(&self, id: u64) {
        let mut state = self.state.lock().unwrap();
        state.items[id as usize - 1] = zeroed();
    }

    pub fn fail_read_of(&self, id: u64) {
        self.state.lock().unwrap().fail_read_of = Some(U256::from(id));
    }

    pub fn clear_read_failure(&self) {
        self.state.lock().unwrap().fail_read_of = None;
    }

    pub fn fail_writes(&self) {
        self.state.lock().unwrap().fail_writes = true;
    }

    /// Record the session's loading flag whenever a write is submitted
    pub fn observe_loading(&self, probe: watch::Receiver<bool>) {
        self.state.lock().unwrap().loading_probe = Some(probe);
    }

    pub fn loading_seen(&self) -> Vec<bool> {
        self.state.lock().unwrap().loading_seen.clone()
    }

    pub fn reads(&self) -> Vec<String> {
        self.state.lock().unwrap().reads.clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn clear_log(&self) {
        let mut state = self.state.lock().unwrap();
        state.reads.clear();
        state.writes.clear();
    }

    pub fn item(&self, id: u64) -> Item {
        self.state.lock().unwrap().items[id as usize - 1].clone()
    }

    pub fn contract(&self, account: Address) -> FakeContract {
        FakeContract {
            chain: self.clone(),
            account,
        }
    }

    fn write<F>(&self, label: String, apply: F) -> Result<TxReceipt>
    where
        F: FnOnce(&mut Vec<Item>) -> bool,
    {
        let mut state = self.state.lock().unwrap();

        let loading = state.loading_probe.as_ref().map(|rx| *rx.borrow());
        if let Some(flag) = loading {
            state.loading_seen.push(flag);
        }

        state.writes.push(label);
        state.block += 1;
        let tx_hash = H256::from_low_u64_be(state.block);

        if state.fail_writes {
            return Err(anyhow!(MarketError::Provider("connection refused".into())));
        }
        if !apply(&mut state.items) {
            return Err(anyhow!(MarketError::Reverted(tx_hash)));
        }

        Ok(TxReceipt {
            tx_hash,
            block_number: Some(state.block),
        })
    }
}

fn zeroed() -> Item {
    Item {
        id: U256::zero(),
        name: String::new(),
        price: U256::zero(),
        seller: Address::zero(),
        owner: Address::zero(),
        is_sold: false,
    }
}

fn slot(items: &mut [Item], id: U256) -> Option<&mut Item> {
    if id.is_zero() || id > U256::from(items.len()) {
        return None;
    }
    items.get_mut(id.as_usize() - 1).filter(|i| !i.is_tombstone())
}

/// Contract handle signing as one account
pub struct FakeContract {
    chain: FakeChain,
    account: Address,
}

#[async_trait]
impl MarketContract for FakeContract {
    fn address(&self) -> Address {
        FakeChain::contract_address()
    }

    async fn item_count(&self) -> Result<U256> {
        let mut state = self.chain.state.lock().unwrap();
        state.reads.push("itemCount".into());
        Ok(U256::from(state.items.len()))
    }

    async fn item(&self, id: U256) -> Result<Item> {
        let mut state = self.chain.state.lock().unwrap();
        state.reads.push(format!("items({})", id));
        if state.fail_read_of == Some(id) {
            return Err(anyhow!(MarketError::Provider("read timed out".into())));
        }
        if id.is_zero() || id > U256::from(state.items.len()) {
            return Ok(zeroed());
        }
        Ok(state.items[id.as_usize() - 1].clone())
    }

    async fn items_by_owner(&self, owner: Address) -> Result<Vec<U256>> {
        let mut state = self.chain.state.lock().unwrap();
        state.reads.push(format!("getItemsByOwner({:?})", owner));
        Ok(state
            .items
            .iter()
            .filter(|i| !i.is_tombstone() && i.owner == owner)
            .map(|i| i.id)
            .collect())
    }

    async fn list_item(&self, name: &str, price: U256) -> Result<TxReceipt> {
        let seller = self.account;
        let name = name.to_string();
        self.chain.write(format!("listItem({})", name), move |items| {
            let id = U256::from(items.len() + 1);
            items.push(Item {
                id,
                name,
                price,
                seller,
                owner: seller,
                is_sold: false,
            });
            true
        })
    }

    async fn purchase_item(&self, id: U256, value: U256) -> Result<TxReceipt> {
        let buyer = self.account;
        self.chain.write(format!("purchaseItem({})", id), move |items| {
            match slot(items, id) {
                Some(item) if !item.is_sold && item.price == value && item.seller != buyer => {
                    item.is_sold = true;
                    item.owner = buyer;
                    true
                }
                _ => false,
            }
        })
    }

    async fn delete_item(&self, id: U256) -> Result<TxReceipt> {
        let caller = self.account;
        self.chain.write(format!("deleteItem({})", id), move |items| {
            match slot(items, id) {
                Some(item) if item.seller == caller && !item.is_sold => {
                    *item = zeroed();
                    true
                }
                _ => false,
            }
        })
    }

    async fn transfer_item(&self, id: U256, to: Address) -> Result<TxReceipt> {
        let caller = self.account;
        self.chain.write(format!("transferItem({})", id), move |items| {
            match slot(items, id) {
                Some(item) if item.owner == caller => {
                    item.owner = to;
                    true
                }
                _ => false,
            }
        })
    }
}

/// Wallet over the fake chain with a fixed account list
pub struct FakeWallet {
    chain: FakeChain,
    accounts: Mutex<Vec<Address>>,
    notifier: broadcast::Sender<Vec<Address>>,
    binds: Mutex<Vec<Address>>,
}

impl FakeWallet {
    pub fn new(chain: &FakeChain, accounts: Vec<Address>) -> Self {
        let (notifier, _) = broadcast::channel(8);
        Self {
            chain: chain.clone(),
            accounts: Mutex::new(accounts),
            notifier,
            binds: Mutex::new(Vec::new()),
        }
    }

    /// Replace the account list and notify subscribers
    pub fn change_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.lock().unwrap() = accounts.clone();
        let _ = self.notifier.send(accounts);
    }

    /// Accounts `bind` was called for, in order
    pub fn binds(&self) -> Vec<Address> {
        self.binds.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        let accounts = self.accounts.lock().unwrap().clone();
        if accounts.is_empty() {
            return Err(MarketError::WalletUnavailable.into());
        }
        Ok(accounts)
    }

    async fn bind(&self, account: Address, _contract: Address) -> Result<Arc<dyn MarketContract>> {
        if !self.accounts.lock().unwrap().contains(&account) {
            return Err(anyhow!("No signer for account {:?}", account));
        }
        self.binds.lock().unwrap().push(account);
        Ok(Arc::new(self.chain.contract(account)))
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<Address>> {
        self.notifier.subscribe()
    }
}
