use crate::tokens::{Chain, SupportedTokens};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ETHERSCAN_URL: &str = "https://api.etherscan.io/v2/api";

#[derive(Debug, Clone)]
pub struct Config {
    pub chain: Chain,
    pub tokens: SupportedTokens,
    pub swap_router_address: Option<Address>,
    pub json_rpc_urls: Vec<String>,
    pub blockscout_url: String,
    pub blockscout_api_key: Option<String>,
    pub etherscan_url: String,
    pub etherscan_api_key: Option<String>,
    pub refresh_interval: Duration,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let chain = Chain::from_name(
            &std::env::var("CHAIN_NAME").unwrap_or_else(|_| "baseSepolia".to_string()),
        );

        let arst = required_address("ARST_TOKEN_ADDRESS")?;
        let usdc = required_address("USDC_TOKEN_ADDRESS")?;

        let swap_router_address = optional_var("SWAP_ROUTER_ADDRESS")
            .map(|s| Address::from_str(&s).context("Invalid SWAP_ROUTER_ADDRESS format"))
            .transpose()?;

        let json_rpc_urls = optional_var("JSON_RPC_URLS")
            .map(|urls| {
                urls.split(',')
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|urls| !urls.is_empty())
            .unwrap_or_else(|| vec![chain.default_rpc_url().to_string()]);

        let blockscout_url = optional_var("BLOCKSCOUT_URL")
            .unwrap_or_else(|| chain.blockscout_url().to_string());

        let etherscan_url =
            optional_var("ETHERSCAN_URL").unwrap_or_else(|| DEFAULT_ETHERSCAN_URL.to_string());

        let refresh_interval = Duration::from_secs(
            optional_var("REFRESH_INTERVAL_SECS")
                .map(|s| s.parse().context("Invalid REFRESH_INTERVAL_SECS"))
                .transpose()?
                .unwrap_or(30),
        );

        let http_timeout = Duration::from_secs(
            optional_var("HTTP_TIMEOUT_SECS")
                .map(|s| s.parse().context("Invalid HTTP_TIMEOUT_SECS"))
                .transpose()?
                .unwrap_or(15),
        );

        Ok(Config {
            chain,
            tokens: SupportedTokens::new(arst, usdc),
            swap_router_address,
            json_rpc_urls,
            blockscout_url,
            blockscout_api_key: optional_var("BLOCKSCOUT_API_KEY"),
            etherscan_url,
            etherscan_api_key: optional_var("ETHERSCAN_API_KEY"),
            refresh_interval,
            http_timeout,
        })
    }
}

fn required_address(name: &str) -> Result<Address> {
    let value = std::env::var(name).with_context(|| format!("{name} must be set in .env"))?;
    Address::from_str(value.trim()).with_context(|| format!("Invalid {name} format"))
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
