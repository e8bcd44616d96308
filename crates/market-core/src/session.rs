//! ============================================================================
//! Market Session - Page state & actions
//! ============================================================================
//! Holds everything the marketplace page keeps in memory for one run:
//! - Active account and the contract handle bound to it
//! - Items for sale and the account's owned items (a possibly-stale cache)
//! - The "list an item" draft and the loading indicator
//!
//! Mutating actions validate minimal input, submit, wait for the receipt and
//! then reload both lists. Failures are logged and never returned; the only
//! visible effect is that loading clears with no state change.
//! ============================================================================

use anyhow::Result;
use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info};

use crate::contract::MarketContract;
use crate::loader;
use crate::types::{ActionStatus, Item, ItemDraft, TxReceipt};
use crate::units::parse_price;
use crate::view::MarketView;
use crate::wallet::WalletProvider;

/// In-memory marketplace state for one run of the client
pub struct MarketSession {
    wallet: Arc<dyn WalletProvider>,
    contract_address: Address,
    contract: Option<Arc<dyn MarketContract>>,
    account: Option<Address>,
    items: Vec<Item>,
    owned_items: Vec<Item>,
    draft: ItemDraft,
    loading: watch::Sender<bool>,
    last_refreshed: Option<DateTime<Utc>>,
}

impl MarketSession {
    /// Disconnected session; nothing is requested from the wallet yet
    pub fn new(wallet: Arc<dyn WalletProvider>, contract_address: Address) -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            wallet,
            contract_address,
            contract: None,
            account: None,
            items: Vec::new(),
            owned_items: Vec::new(),
            draft: ItemDraft::default(),
            loading,
            last_refreshed: None,
        }
    }

    /// Request accounts, bind the contract and load both lists.
    /// Without a wallet the session stays disconnected and inert.
    pub async fn connect(wallet: Arc<dyn WalletProvider>, contract_address: Address) -> Self {
        let mut session = Self::new(wallet, contract_address);

        match session.wallet.request_accounts().await {
            Ok(accounts) => session.on_accounts_changed(accounts).await,
            Err(e) => debug!("[session] Wallet not available: {}", e),
        }

        session
    }

    /// Rebuild the signer/contract binding for the new active account and
    /// reload. An empty list disconnects.
    pub async fn on_accounts_changed(&mut self, accounts: Vec<Address>) {
        let Some(&account) = accounts.first() else {
            info!("[session] Wallet disconnected");
            self.account = None;
            self.contract = None;
            self.items.clear();
            self.owned_items.clear();
            return;
        };

        match self.wallet.bind(account, self.contract_address).await {
            Ok(contract) => {
                info!("[session] Active account: {:?}", account);
                self.account = Some(account);
                self.contract = Some(contract);
                self.refresh().await;
            }
            Err(e) => error!("[session] Failed to bind contract for {:?}: {:#}", account, e),
        }
    }

    /// Accounts-changed notifications from the wallet
    pub fn subscribe_accounts(&self) -> broadcast::Receiver<Vec<Address>> {
        self.wallet.subscribe()
    }

    /// Reload both lists; failures are logged
    pub async fn refresh(&mut self) {
        let items = self.load_items().await;
        if let Err(e) = &items {
            error!("[session] Error loading items: {:#}", e);
        }

        let owned = self.load_owned_items().await;
        if let Err(e) = &owned {
            error!("[session] Error loading owned items: {:#}", e);
        }

        if items.is_ok() && owned.is_ok() {
            self.last_refreshed = Some(Utc::now());
        }
    }

    /// Replace the item list from the contract. No-op when disconnected.
    pub async fn load_items(&mut self) -> Result<()> {
        let Some(contract) = self.contract.clone() else {
            return Ok(());
        };
        self.items = loader::load_items(contract.as_ref()).await?;
        Ok(())
    }

    /// Replace the owned list from the contract. No-op without an account.
    pub async fn load_owned_items(&mut self) -> Result<()> {
        let (Some(contract), Some(owner)) = (self.contract.clone(), self.account) else {
            return Ok(());
        };
        self.owned_items = loader::load_owned_items(contract.as_ref(), owner).await?;
        Ok(())
    }

    // ========================================================================
    // Mutating actions
    // ========================================================================

    /// List the current draft for sale; the draft is cleared once mined
    pub async fn list_item(&mut self) -> ActionStatus {
        let Some(contract) = self.contract.clone() else {
            return ActionStatus::Skipped;
        };
        if !self.draft.is_complete() {
            return ActionStatus::Skipped;
        }

        self.begin();
        let result = match parse_price(&self.draft.price) {
            Ok(price) => contract.list_item(&self.draft.name, price).await,
            Err(e) => Err(e),
        };

        let status = self.finish("listing item", result).await;
        if status.is_confirmed() {
            self.draft.clear();
        }
        status
    }

    /// Buy item `id`, paying `price` wei
    pub async fn purchase_item(&mut self, id: U256, price: U256) -> ActionStatus {
        let Some(contract) = self.contract.clone() else {
            return ActionStatus::Skipped;
        };
        if id.is_zero() {
            return ActionStatus::Skipped;
        }

        self.begin();
        let result = contract.purchase_item(id, price).await;
        self.finish("purchasing item", result).await
    }

    pub async fn delete_item(&mut self, id: U256) -> ActionStatus {
        let Some(contract) = self.contract.clone() else {
            return ActionStatus::Skipped;
        };
        if id.is_zero() {
            return ActionStatus::Skipped;
        }

        self.begin();
        let result = contract.delete_item(id).await;
        self.finish("deleting item", result).await
    }

    /// Hand item `id` to another address
    pub async fn transfer_item(&mut self, id: U256, to: Address) -> ActionStatus {
        let Some(contract) = self.contract.clone() else {
            return ActionStatus::Skipped;
        };
        if id.is_zero() {
            return ActionStatus::Skipped;
        }

        self.begin();
        let result = contract.transfer_item(id, to).await;
        self.finish("transferring item", result).await
    }

    fn begin(&self) {
        self.loading.send_replace(true);
    }

    async fn finish(&mut self, what: &str, result: Result<TxReceipt>) -> ActionStatus {
        let status = match result {
            Ok(receipt) => {
                self.refresh().await;
                ActionStatus::Confirmed(receipt)
            }
            Err(e) => {
                error!("Error {}: {:#}", what, e);
                ActionStatus::Failed
            }
        };

        self.loading.send_replace(false);
        status
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn is_connected(&self) -> bool {
        self.contract.is_some()
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn owned_items(&self) -> &[Item] {
        &self.owned_items
    }

    /// Look up a loaded item by id
    pub fn find_item(&self, id: U256) -> Option<&Item> {
        self.items
            .iter()
            .chain(self.owned_items.iter())
            .find(|i| i.id == id && !i.is_tombstone())
    }

    pub fn draft(&self) -> &ItemDraft {
        &self.draft
    }

    pub fn set_draft(&mut self, draft: ItemDraft) {
        self.draft = draft;
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Watch the loading indicator
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    pub fn view(&self) -> MarketView {
        MarketView::build(
            self.account,
            &self.items,
            &self.owned_items,
            self.is_loading(),
            self.last_refreshed,
        )
    }
}
