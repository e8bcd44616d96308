//! Presentational model of the marketplace page.
//!
//! Two sections: "Items for Sale" (everything the contract holds) and
//! "Your Items" (what the active account owns). Each card carries the one
//! action the viewer may take on it, if any.

use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use ethers::utils::to_checksum;
use serde::Serialize;
use std::fmt;

use crate::types::Item;
use crate::units::format_price;

/// Action offered on an item card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardAction {
    Buy,
    Delete,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemCard {
    pub id: U256,
    pub name: String,
    pub price: U256,
    /// Shown in the for-sale section only
    pub seller: Option<Address>,
    pub action: Option<CardAction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketView {
    pub account: Option<Address>,
    pub loading: bool,
    pub for_sale: Vec<ItemCard>,
    pub owned: Vec<ItemCard>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Unsold: the seller may delete, anyone else may buy
pub fn sale_action(item: &Item, viewer: Option<Address>) -> Option<CardAction> {
    if item.is_sold {
        None
    } else if viewer == Some(item.seller) {
        Some(CardAction::Delete)
    } else {
        Some(CardAction::Buy)
    }
}

pub fn owned_action(item: &Item) -> Option<CardAction> {
    (!item.is_sold).then_some(CardAction::Delete)
}

impl MarketView {
    pub fn build(
        account: Option<Address>,
        items: &[Item],
        owned: &[Item],
        loading: bool,
        refreshed_at: Option<DateTime<Utc>>,
    ) -> Self {
        let for_sale = items
            .iter()
            .filter(|i| !i.is_tombstone())
            .map(|i| ItemCard {
                id: i.id,
                name: i.name.clone(),
                price: i.price,
                seller: Some(i.seller),
                action: sale_action(i, account),
            })
            .collect();

        let owned = owned
            .iter()
            .filter(|i| !i.is_tombstone())
            .map(|i| ItemCard {
                id: i.id,
                name: i.name.clone(),
                price: i.price,
                seller: None,
                action: owned_action(i),
            })
            .collect();

        Self {
            account,
            loading,
            for_sale,
            owned,
            refreshed_at,
        }
    }
}

impl fmt::Display for ItemCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = format!("#{}", self.id);
        write!(f, "{:<6} {:<24} {:>12} ETH", id, self.name, format_price(self.price))?;
        if let Some(seller) = &self.seller {
            write!(f, "  seller {}", to_checksum(seller, None))?;
        }
        match self.action {
            Some(CardAction::Buy) => write!(f, "  [buy]"),
            Some(CardAction::Delete) => write!(f, "  [delete]"),
            None => Ok(()),
        }
    }
}

impl fmt::Display for MarketView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Marketplace ===")?;
        match &self.account {
            Some(account) => writeln!(f, "Account: {}", to_checksum(account, None))?,
            None => writeln!(f, "Account: not connected")?,
        }
        if let Some(at) = &self.refreshed_at {
            writeln!(f, "Refreshed: {}", at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        }
        if self.loading {
            writeln!(f, "Loading...")?;
        }

        writeln!(f)?;
        writeln!(f, "--- Items for Sale ---")?;
        if self.for_sale.is_empty() {
            writeln!(f, "(none)")?;
        }
        for card in &self.for_sale {
            writeln!(f, "{}", card)?;
        }

        writeln!(f)?;
        writeln!(f, "--- Your Items ---")?;
        if self.owned.is_empty() {
            writeln!(f, "(none)")?;
        }
        for card in &self.owned {
            writeln!(f, "{}", card)?;
        }

        Ok(())
    }
}
