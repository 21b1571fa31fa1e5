use crate::balances::{fetch_balances, fetch_token_metadata};
use crate::fetcher::TransferFetcher;
use crate::query::formatters::{
    OutputFormat, format_balances, format_history, format_token_check, format_transfers,
};
use crate::rpc::RpcClient;
use crate::tokens::SupportedTokens;
use alloy_primitives::Address;
use anyhow::Result;
use std::str::FromStr;

/// Which indexer `transfers` reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferSourceChoice {
    /// Primary with fallback, exactly as the history view does.
    #[default]
    Auto,
    Primary,
    Secondary,
}

impl From<&str> for TransferSourceChoice {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "blockscout" | "primary" => TransferSourceChoice::Primary,
            "etherscan" | "secondary" => TransferSourceChoice::Secondary,
            _ => TransferSourceChoice::Auto,
        }
    }
}

pub fn parse_address(address: &str) -> Result<Address> {
    Address::from_str(address.trim())
        .map_err(|_| anyhow::anyhow!("Invalid address format: {}", address))
}

pub async fn cmd_history(
    fetcher: &TransferFetcher,
    address: &str,
    format: &OutputFormat,
) -> Result<()> {
    let address = parse_address(address)?;

    let history = fetcher.get_history(&address).await;
    let output = format_history(&history, format);
    println!("{output}");

    Ok(())
}

/// Raw normalized transfers. Unlike the history view, picking a single
/// indexer surfaces its errors instead of degrading to an empty list.
pub async fn cmd_transfers(
    fetcher: &TransferFetcher,
    address: &str,
    source: TransferSourceChoice,
    format: &OutputFormat,
) -> Result<()> {
    let address = parse_address(address)?;

    let transfers = match source {
        TransferSourceChoice::Auto => fetcher.fetch_transfers(&address).await,
        TransferSourceChoice::Primary => fetcher.primary().fetch_transfers(&address).await?,
        TransferSourceChoice::Secondary => fetcher.secondary().fetch_transfers(&address).await?,
    };

    let output = format_transfers(&transfers, format);
    println!("{output}");

    Ok(())
}

pub async fn cmd_balance(
    client: &RpcClient,
    tokens: &SupportedTokens,
    address: &str,
    format: &OutputFormat,
) -> Result<()> {
    let address = parse_address(address)?;

    let balances = fetch_balances(client, tokens, address).await?;
    let output = format_balances(&balances, format);
    println!("{output}");

    Ok(())
}

pub async fn cmd_tokens(
    client: &RpcClient,
    tokens: &SupportedTokens,
    format: &OutputFormat,
) -> Result<()> {
    let mut checks = Vec::new();
    for token in tokens.iter() {
        let metadata = fetch_token_metadata(client, token.address).await?;
        checks.push((token.clone(), metadata));
    }

    let output = format_token_check(&checks, format);
    println!("{output}");

    Ok(())
}
