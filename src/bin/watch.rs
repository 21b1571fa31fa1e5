use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wallet_history::config::Config;
use wallet_history::fetcher::TransferFetcher;
use wallet_history::optimistic::HistoryCache;
use wallet_history::query::commands::parse_address;
use wallet_history::query::formatters::{OutputFormat, format_history};
use wallet_history::refresher::HistoryRefresher;

#[derive(Parser)]
#[command(name = "watch")]
#[command(about = "Keep an account's recent history up to date", long_about = None)]
struct Cli {
    address: String,

    #[arg(short, long, default_value = "table")]
    format: String,

    /// Overrides REFRESH_INTERVAL_SECS.
    #[arg(long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());
    let account = parse_address(&cli.address)?;

    info!("Starting history watcher");

    let mut config = Config::from_env()?;
    if let Some(secs) = cli.interval {
        config.refresh_interval = std::time::Duration::from_secs(secs);
    }
    info!("Configuration loaded");
    info!("Chain: {} ({})", config.chain.name(), config.chain.id());
    info!(
        "Tokens: {}",
        config
            .tokens
            .iter()
            .map(|t| format!("{} {:?}", t.symbol, t.address))
            .collect::<Vec<_>>()
            .join(", ")
    );
    if config.etherscan_api_key.is_none() {
        info!("ETHERSCAN_API_KEY not set, Etherscan fallback will be unavailable");
    }

    let fetcher = Arc::new(TransferFetcher::from_config(&config)?);
    let cache = HistoryCache::new();
    let refresher = HistoryRefresher::new(fetcher, cache, account, config.refresh_interval);

    let (tx, mut rx) = watch::channel(Vec::new());
    tokio::spawn(async move { refresher.run(tx).await });

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let history = rx.borrow_and_update().clone();
                println!("{}", format_history(&history, &format));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
