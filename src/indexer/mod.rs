pub mod blockscout;
pub mod etherscan;

pub use blockscout::BlockscoutClient;
pub use etherscan::EtherscanClient;

use crate::models::NormalizedTransfer;
use alloy_primitives::Address;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("{provider} request failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned status {status}")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("{provider} returned malformed JSON: {source}")]
    Decode {
        provider: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} API key not configured")]
    MissingApiKey(&'static str),
}

/// A provider of raw token-transfer history for one account.
///
/// Implementations own every provider-specific field name; what leaves them is
/// always a [`NormalizedTransfer`] for one of the configured tokens.
#[async_trait]
pub trait TransferSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_transfers(
        &self,
        account: &Address,
    ) -> Result<Vec<NormalizedTransfer>, IndexerError>;
}

pub fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("wallet-history/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

async fn get_json(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<Value, IndexerError> {
    let http = |source| IndexerError::Http { provider, source };

    let response = request.send().await.map_err(http)?;
    let status = response.status();
    if !status.is_success() {
        return Err(IndexerError::Status { provider, status });
    }

    let body = response.bytes().await.map_err(http)?;
    serde_json::from_slice(&body).map_err(|source| IndexerError::Decode { provider, source })
}

fn lowercase_or_empty(value: Option<&str>) -> String {
    value.map(|s| s.to_lowercase()).unwrap_or_default()
}

/// Reads a scalar field leniently: a mistyped field falls back on its own
/// instead of taking the whole transfer down with it.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    pub fn local_client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    /// Answers a single request on a loopback port with a canned response.
    /// Returns the base URL and the request line the server saw.
    pub async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (seen_tx, seen_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;

            let request = String::from_utf8_lossy(&request);
            let line = request.lines().next().unwrap_or_default().to_string();
            let _ = seen_tx.send(line);
        });

        (base_url, seen_rx)
    }
}
