use crate::contracts::IERC20;
use crate::rpc::RpcClient;
use crate::tokens::{SupportedTokens, TokenConfig};
use alloy_primitives::{Address, U256};
use anyhow::Result;
use futures::future::try_join_all;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct TokenBalance {
    pub token: TokenConfig,
    pub balance: U256,
}

#[derive(Debug, Clone)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

pub async fn fetch_token_balance(
    client: &RpcClient,
    token: &TokenConfig,
    owner: Address,
) -> Result<TokenBalance> {
    let balance = client
        .call_contract(token.address, IERC20::balanceOfCall { owner })
        .await?;

    Ok(TokenBalance {
        token: token.clone(),
        balance,
    })
}

/// Balances of every supported token, read concurrently.
pub async fn fetch_balances(
    client: &RpcClient,
    tokens: &SupportedTokens,
    owner: Address,
) -> Result<Vec<TokenBalance>> {
    try_join_all(
        tokens
            .iter()
            .map(|token| fetch_token_balance(client, token, owner)),
    )
    .await
}

/// On-chain metadata for a token contract. Each field is read on its own;
/// contracts that omit an optional ERC-20 getter still yield the others.
pub async fn fetch_token_metadata(client: &RpcClient, address: Address) -> Result<TokenMetadata> {
    info!("Fetching token metadata for {:?}", address);

    let name = match client.call_contract(address, IERC20::nameCall {}).await {
        Ok(result) => Some(result),
        Err(e) => {
            warn!("Failed to fetch token name: {}", e);
            None
        }
    };

    let symbol = match client.call_contract(address, IERC20::symbolCall {}).await {
        Ok(result) => Some(result),
        Err(e) => {
            warn!("Failed to fetch token symbol: {}", e);
            None
        }
    };

    let decimals = match client.call_contract(address, IERC20::decimalsCall {}).await {
        Ok(result) => Some(result),
        Err(e) => {
            warn!("Failed to fetch token decimals: {}", e);
            None
        }
    };

    Ok(TokenMetadata {
        name,
        symbol,
        decimals,
    })
}
