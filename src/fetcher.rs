use crate::classifier::classify;
use crate::config::Config;
use crate::indexer::{BlockscoutClient, EtherscanClient, TransferSource, http_client};
use crate::models::{ClassifiedTransaction, NormalizedTransfer};
use alloy_primitives::Address;
use anyhow::Result;
use tracing::{info, warn};

/// Reads an account's transfer history from a primary indexer, falling back
/// to a secondary one.
pub struct TransferFetcher {
    primary: Box<dyn TransferSource>,
    secondary: Box<dyn TransferSource>,
}

impl TransferFetcher {
    pub fn new(primary: Box<dyn TransferSource>, secondary: Box<dyn TransferSource>) -> Self {
        Self { primary, secondary }
    }

    /// Blockscout first, Etherscan as fallback, both sharing one HTTP client.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = http_client(config.http_timeout)?;

        let blockscout = BlockscoutClient::new(
            http.clone(),
            config.blockscout_url.clone(),
            config.blockscout_api_key.clone(),
            config.tokens.clone(),
        );
        let etherscan = EtherscanClient::new(
            http,
            config.etherscan_url.clone(),
            config.chain.id(),
            config.etherscan_api_key.clone(),
            config.tokens.clone(),
        );

        Ok(Self::new(Box::new(blockscout), Box::new(etherscan)))
    }

    pub fn primary(&self) -> &dyn TransferSource {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> &dyn TransferSource {
        self.secondary.as_ref()
    }

    /// Never fails. An empty primary result and a failing primary both move
    /// on to the secondary; a failing secondary yields no history.
    pub async fn fetch_transfers(&self, account: &Address) -> Vec<NormalizedTransfer> {
        match self.primary.fetch_transfers(account).await {
            Ok(transfers) if !transfers.is_empty() => return transfers,
            Ok(_) => info!(
                "{} returned no transfers for {}, trying {}",
                self.primary.name(),
                account,
                self.secondary.name()
            ),
            Err(e) => warn!(
                "{} failed for {}: {}, trying {}",
                self.primary.name(),
                account,
                e,
                self.secondary.name()
            ),
        }

        match self.secondary.fetch_transfers(account).await {
            Ok(transfers) => transfers,
            Err(e) => {
                warn!(
                    "{} failed for {}: {}, reporting empty history",
                    self.secondary.name(),
                    account,
                    e
                );
                Vec::new()
            }
        }
    }

    /// The account's recent transactions, classified and newest first.
    pub async fn get_history(&self, account: &Address) -> Vec<ClassifiedTransaction> {
        let transfers = self.fetch_transfers(account).await;
        classify(&transfers, account)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classifier::tests::{ACCOUNT, ACCOUNT_STR, PEER, leg};
    use crate::indexer::IndexerError;
    use crate::indexer::tests::{local_client, serve_once};
    use crate::tokens::tests::tokens;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted transfer source that counts how often it was asked.
    #[derive(Clone)]
    pub struct FakeSource {
        pub name: &'static str,
        pub transfers: Option<Vec<NormalizedTransfer>>,
        pub calls: Arc<AtomicUsize>,
    }

    impl FakeSource {
        pub fn ok(name: &'static str, transfers: Vec<NormalizedTransfer>) -> Self {
            Self {
                name,
                transfers: Some(transfers),
                calls: Arc::default(),
            }
        }

        pub fn failing(name: &'static str) -> Self {
            Self {
                name,
                transfers: None,
                calls: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl TransferSource for FakeSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch_transfers(
            &self,
            _account: &Address,
        ) -> Result<Vec<NormalizedTransfer>, IndexerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.transfers
                .clone()
                .ok_or(IndexerError::MissingApiKey(self.name))
        }
    }

    fn three_transfers() -> Vec<NormalizedTransfer> {
        vec![
            leg("0x1", PEER, ACCOUNT_STR, "ARST", 3),
            leg("0x2", ACCOUNT_STR, PEER, "USDC", 2),
            leg("0x3", PEER, ACCOUNT_STR, "USDC", 1),
        ]
    }

    #[tokio::test]
    async fn primary_result_is_used_as_is() {
        let primary = FakeSource::ok("primary", three_transfers());
        let secondary = FakeSource::ok("secondary", vec![]);
        let secondary_calls = secondary.calls.clone();
        let fetcher = TransferFetcher::new(Box::new(primary), Box::new(secondary));

        assert_eq!(fetcher.fetch_transfers(&ACCOUNT).await.len(), 3);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_primary_falls_back() {
        let fetcher = TransferFetcher::new(
            Box::new(FakeSource::ok("primary", vec![])),
            Box::new(FakeSource::ok("secondary", three_transfers())),
        );

        let history = fetcher.get_history(&ACCOUNT).await;

        assert_eq!(history.len(), 3);
        let labels: Vec<_> = history.iter().map(|t| t.kind.label()).collect();
        assert_eq!(labels, vec!["incoming", "outgoing", "incoming"]);
    }

    #[tokio::test]
    async fn failing_primary_falls_back() {
        let fetcher = TransferFetcher::new(
            Box::new(FakeSource::failing("primary")),
            Box::new(FakeSource::ok("secondary", three_transfers())),
        );

        assert_eq!(fetcher.fetch_transfers(&ACCOUNT).await.len(), 3);
    }

    #[tokio::test]
    async fn blockscout_http_errors_fall_back() {
        for (status, body) in [("500 Internal Server Error", "{}"), ("200 OK", "not json")] {
            let (base_url, _seen) = serve_once(status, body).await;
            let blockscout = BlockscoutClient::new(local_client(), base_url, None, tokens());
            let fetcher = TransferFetcher::new(
                Box::new(blockscout),
                Box::new(FakeSource::ok("secondary", three_transfers())),
            );

            assert_eq!(fetcher.fetch_transfers(&ACCOUNT).await.len(), 3, "{status} {body}");
        }
    }

    #[tokio::test]
    async fn both_failing_yields_empty_history() {
        let fetcher = TransferFetcher::new(
            Box::new(FakeSource::failing("primary")),
            Box::new(FakeSource::failing("secondary")),
        );

        assert!(fetcher.get_history(&ACCOUNT).await.is_empty());
    }
}
