// ============================================================================
// Interactive marketplace shell
// ============================================================================
// Renders the page, reads one command per line and reacts to account
// switches. Everything runs on one task: stdin lines and accounts-changed
// notifications are handled in arrival order.
// ============================================================================

use anyhow::{anyhow, bail, Result};
use ethers::types::{Address, U256};
use market_core::config::parse_address;
use market_core::{ItemDraft, LocalWalletProvider, MarketSession, WalletProvider};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

const HELP: &str = r#"Commands:
  refresh                   reload items from the contract
  list <price> <name...>    list an item (price in ETH)
  buy <id>                  buy an item at its listed price
  delete <id>               delete an unsold item you listed
  transfer <id> <address>   give an item you own to another address
  accounts                  show wallet accounts
  account <index|address>   switch the active account
  help                      show this help
  quit                      leave the shell"#;

/// Which account to switch to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRef {
    Index(usize),
    Address(Address),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Refresh,
    List { price: String, name: String },
    Buy(U256),
    Delete(U256),
    Transfer(U256, Address),
    Accounts,
    Account(AccountRef),
    Help,
    Quit,
}

fn parse_id(arg: Option<&str>) -> Result<U256> {
    let arg = arg.ok_or_else(|| anyhow!("missing item id"))?;
    U256::from_dec_str(arg).map_err(|_| anyhow!("invalid item id '{}'", arg))
}

/// Parse one shell line. Blank lines parse as `Refresh`.
pub fn parse_command(line: &str) -> Result<ShellCommand> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(ShellCommand::Refresh);
    };

    match verb.to_lowercase().as_str() {
        "refresh" | "r" => Ok(ShellCommand::Refresh),
        "list" => {
            let price = words.next().ok_or_else(|| anyhow!("usage: list <price> <name...>"))?;
            let name = words.collect::<Vec<_>>().join(" ");
            if name.is_empty() {
                bail!("usage: list <price> <name...>");
            }
            Ok(ShellCommand::List { price: price.to_string(), name })
        }
        "buy" => Ok(ShellCommand::Buy(parse_id(words.next())?)),
        "delete" | "del" => Ok(ShellCommand::Delete(parse_id(words.next())?)),
        "transfer" => {
            let id = parse_id(words.next())?;
            let to = words.next().ok_or_else(|| anyhow!("usage: transfer <id> <address>"))?;
            Ok(ShellCommand::Transfer(id, parse_address(to)?))
        }
        "accounts" => Ok(ShellCommand::Accounts),
        "account" => {
            let target = words.next().ok_or_else(|| anyhow!("usage: account <index|address>"))?;
            match target.parse::<usize>() {
                Ok(index) => Ok(ShellCommand::Account(AccountRef::Index(index))),
                Err(_) => Ok(ShellCommand::Account(AccountRef::Address(parse_address(target)?))),
            }
        }
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" | "q" => Ok(ShellCommand::Quit),
        other => bail!("unknown command '{}' (try 'help')", other),
    }
}

fn prompt() {
    print!("market> ");
    let _ = std::io::stdout().flush();
}

/// Run the shell until `quit` or end of input
pub async fn run(session: &mut MarketSession, wallet: &LocalWalletProvider) -> Result<()> {
    let mut accounts = session.subscribe_accounts();
    let mut accounts_open = true;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("{}", session.view());
    prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Ok(ShellCommand::Quit) => break,
                    Ok(ShellCommand::Help) => {
                        println!("{}", HELP);
                        prompt();
                        continue;
                    }
                    Ok(ShellCommand::Account(target)) => {
                        // The page is rendered when the accounts-changed event arrives
                        if !switch_account(wallet, target).await {
                            prompt();
                        }
                        continue;
                    }
                    Ok(command) => execute(session, wallet, command).await,
                    Err(e) => {
                        println!("{}", e);
                        prompt();
                        continue;
                    }
                }
            }
            event = accounts.recv(), if accounts_open => {
                match event {
                    Ok(list) => {
                        println!();
                        session.on_accounts_changed(list).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("[shell] Missed {} account notifications", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => {
                        accounts_open = false;
                        continue;
                    }
                }
            }
        }

        print!("{}", session.view());
        prompt();
    }

    println!();
    info!("[shell] Bye");
    Ok(())
}

async fn execute(session: &mut MarketSession, wallet: &LocalWalletProvider, command: ShellCommand) {
    match command {
        ShellCommand::Refresh => session.refresh().await,
        ShellCommand::List { price, name } => {
            session.set_draft(ItemDraft::new(name, price));
            session.list_item().await;
        }
        ShellCommand::Buy(id) => match session.find_item(id).map(|i| i.price) {
            Some(price) => {
                session.purchase_item(id, price).await;
            }
            None => println!("Item #{} is not loaded", id),
        },
        ShellCommand::Delete(id) => {
            session.delete_item(id).await;
        }
        ShellCommand::Transfer(id, to) => {
            session.transfer_item(id, to).await;
        }
        ShellCommand::Accounts => match wallet.request_accounts().await {
            Ok(list) => {
                for (index, account) in list.iter().enumerate() {
                    println!("  [{}] {:?}", index, account);
                }
            }
            Err(e) => println!("{}", e),
        },
        ShellCommand::Account(_) | ShellCommand::Help | ShellCommand::Quit => {}
    }
}

/// Ask the wallet to make `target` active. Returns whether the switch was
/// made, in which case an accounts-changed event follows.
async fn switch_account(wallet: &LocalWalletProvider, target: AccountRef) -> bool {
    let account = match target {
        AccountRef::Address(address) => Some(address),
        AccountRef::Index(index) => wallet
            .request_accounts()
            .await
            .ok()
            .and_then(|list| list.get(index).copied()),
    };

    match account {
        Some(account) => match wallet.switch_account(account).await {
            Ok(()) => true,
            Err(e) => {
                println!("{}", e);
                false
            }
        },
        None => {
            println!("No such account");
            false
        }
    }
}
