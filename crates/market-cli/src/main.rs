// ============================================================================
// market — command-line front-end for the item marketplace contract
// ============================================================================
// Usage:
//   market accounts                     Show wallet accounts and balances
//   market items [--json]               Items for sale
//   market owned [--json]               Items the active account owns
//   market list --name N --price P      List an item (price in ETH)
//   market buy <ID>                     Buy an item at its listed price
//   market delete <ID>                  Delete an unsold item you listed
//   market transfer <ID> <ADDRESS>      Give an item you own to someone
//   market shell                        Interactive marketplace page
// ============================================================================

mod shell;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ethers::types::U256;
use market_core::config::parse_address;
use market_core::{
    format_price, ActionStatus, ItemCard, ItemDraft, LocalWalletProvider, MarketConfig, MarketSession,
    WalletProvider,
};
use std::sync::Arc;
use tracing::info;

/// Marketplace client
#[derive(Parser)]
#[command(name = "market", version, about = "Browse, list, buy and delete marketplace items")]
struct Cli {
    /// JSON-RPC endpoint (default: MARKET_RPC_URL or http://127.0.0.1:8545)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Marketplace contract address (default: MARKET_CONTRACT_ADDRESS)
    #[arg(long, global = true)]
    contract: Option<String>,

    /// Chain id used when signing (default: MARKET_CHAIN_ID or 31337)
    #[arg(long, global = true)]
    chain_id: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show wallet accounts (active first) and their balances
    Accounts,

    /// Show every item the contract holds
    Items {
        /// Print raw items as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the items the active account owns
    Owned {
        /// Print raw items as JSON
        #[arg(long)]
        json: bool,
    },

    /// List a new item for sale
    List {
        #[arg(long)]
        name: String,

        /// Price in ETH, e.g. 0.25
        #[arg(long)]
        price: String,
    },

    /// Buy an item, paying its listed price
    Buy { id: u64 },

    /// Delete an unsold item you listed
    Delete { id: u64 },

    /// Transfer an item you own to another address
    Transfer { id: u64, to: String },

    /// Interactive marketplace page
    Shell,
}

impl Cli {
    fn config(&self) -> MarketConfig {
        let mut config = MarketConfig::default();
        if let Some(url) = &self.rpc_url {
            config.rpc_url = url.clone();
        }
        if let Some(address) = &self.contract {
            config.contract_address = address.clone();
        }
        if let Some(chain_id) = self.chain_id {
            config.chain_id = chain_id;
        }
        config
    }
}

fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("market=info".parse()?)
                .add_directive("market_core=info".parse()?),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Could not load .env file: {}", e);
        }
    }

    init_logging()?;

    let cli = Cli::parse();
    let config = cli.config();
    let contract_address = config.contract_address()?;
    let wallet = Arc::new(LocalWalletProvider::from_config(&config)?);

    info!("Marketplace contract {:?} on {}", contract_address, config.rpc_url);

    if let Commands::Accounts = cli.command {
        return cmd_accounts(&wallet).await;
    }

    let mut session = MarketSession::connect(wallet.clone(), contract_address).await;

    match cli.command {
        Commands::Accounts => Ok(()),
        Commands::Items { json } => cmd_items(&session, json),
        Commands::Owned { json } => cmd_owned(&session, json),
        Commands::List { name, price } => {
            session.set_draft(ItemDraft::new(name, price));
            let status = session.list_item().await;
            report(&session, &status);
            Ok(())
        }
        Commands::Buy { id } => cmd_buy(&mut session, U256::from(id)).await,
        Commands::Delete { id } => {
            let status = session.delete_item(U256::from(id)).await;
            report(&session, &status);
            Ok(())
        }
        Commands::Transfer { id, to } => {
            let to = parse_address(&to)?;
            let status = session.transfer_item(U256::from(id), to).await;
            report(&session, &status);
            Ok(())
        }
        Commands::Shell => shell::run(&mut session, &wallet).await,
    }
}

async fn cmd_accounts(wallet: &LocalWalletProvider) -> Result<()> {
    let accounts = match wallet.request_accounts().await {
        Ok(accounts) => accounts,
        Err(e) => {
            println!("{}", e);
            println!("Set MARKET_PRIVATE_KEYS or MARKET_KEYSTORE to add accounts.");
            return Ok(());
        }
    };

    for (index, account) in accounts.iter().enumerate() {
        let balance = match wallet.balance(*account).await {
            Ok(wei) => format!("{} ETH", format_price(wei)),
            Err(_) => "balance unavailable".to_string(),
        };
        let marker = if index == 0 { "*" } else { " " };
        println!("{} [{}] {:?}  {}", marker, index, account, balance);
    }

    Ok(())
}

fn print_cards(title: &str, cards: &[ItemCard]) {
    println!("--- {} ---", title);
    if cards.is_empty() {
        println!("(none)");
    }
    for card in cards {
        println!("{}", card);
    }
}

fn cmd_items(session: &MarketSession, json: bool) -> Result<()> {
    if json {
        let items: Vec<_> = session.items().iter().filter(|i| !i.is_tombstone()).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        print_cards("Items for Sale", &session.view().for_sale);
    }
    Ok(())
}

fn cmd_owned(session: &MarketSession, json: bool) -> Result<()> {
    if json {
        let items: Vec<_> = session.owned_items().iter().filter(|i| !i.is_tombstone()).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        print_cards("Your Items", &session.view().owned);
    }
    Ok(())
}

async fn cmd_buy(session: &mut MarketSession, id: U256) -> Result<()> {
    let Some(price) = session.find_item(id).map(|i| i.price) else {
        println!("Item #{} is not listed", id);
        return Ok(());
    };

    let status = session.purchase_item(id, price).await;
    report(session, &status);
    Ok(())
}

/// Print the confirmation (if any) and the refreshed page. Failures are
/// only in the log.
fn report(session: &MarketSession, status: &ActionStatus) {
    if let ActionStatus::Confirmed(receipt) = status {
        match receipt.block_number {
            Some(block) => println!("Confirmed {:?} in block {}", receipt.tx_hash, block),
            None => println!("Confirmed {:?}", receipt.tx_hash),
        }
        println!();
    }
    print!("{}", session.view());
}
