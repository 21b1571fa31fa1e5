use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wallet_history::config::Config;
use wallet_history::fetcher::TransferFetcher;
use wallet_history::query::commands::{
    TransferSourceChoice, cmd_balance, cmd_history, cmd_tokens, cmd_transfers,
};
use wallet_history::query::formatters::OutputFormat;
use wallet_history::rpc::RpcClient;

#[derive(Parser)]
#[command(name = "history")]
#[command(about = "Inspect ARST/USDC wallet history and balances", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recent transactions, classified into swaps, incoming and outgoing.
    History {
        address: String,
    },
    /// Raw transfers as reported by the indexers.
    Transfers {
        address: String,

        /// auto, blockscout or etherscan
        #[arg(long, default_value = "auto")]
        source: String,
    },
    Balance {
        address: String,
    },
    /// Compare configured tokens with their on-chain metadata.
    Tokens,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());

    let config = Config::from_env()?;

    match cli.command {
        Commands::History { address } => {
            let fetcher = TransferFetcher::from_config(&config)?;
            cmd_history(&fetcher, &address, &format).await?;
        }
        Commands::Transfers { address, source } => {
            let fetcher = TransferFetcher::from_config(&config)?;
            let source = TransferSourceChoice::from(source.as_str());
            cmd_transfers(&fetcher, &address, source, &format).await?;
        }
        Commands::Balance { address } => {
            let client = RpcClient::new(&config.json_rpc_urls)?;
            cmd_balance(&client, &config.tokens, &address, &format).await?;
        }
        Commands::Tokens => {
            let client = RpcClient::new(&config.json_rpc_urls)?;
            cmd_tokens(&client, &config.tokens, &format).await?;
        }
    }

    Ok(())
}
