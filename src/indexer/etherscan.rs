use super::{
    IndexerError, TransferSource, get_json, lowercase_or_empty, scalar_string, scalar_u64,
};
use crate::models::{NormalizedTransfer, lowercase_address};
use crate::tokens::SupportedTokens;
use alloy_primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

const PROVIDER: &str = "Etherscan";

/// The account's newest transfers across all tokens are requested in one page
/// and filtered locally, so the page must be larger than the history limit.
pub const PAGE_SIZE: usize = 20;
pub const MAX_RESULTS: usize = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TokenTxResponse {
    status: String,
    message: String,
    result: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TokenTx {
    hash: Value,
    block_hash: Value,
    block_number: Value,
    from: Value,
    to: Value,
    value: Value,
    time_stamp: Value,
    contract_address: Value,
}

/// Client for Etherscan-compatible `module=account&action=tokentx` APIs.
pub struct EtherscanClient {
    http: reqwest::Client,
    base_url: String,
    chain_id: u64,
    api_key: Option<String>,
    tokens: SupportedTokens,
}

impl EtherscanClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        chain_id: u64,
        api_key: Option<String>,
        tokens: SupportedTokens,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            chain_id,
            api_key,
            tokens,
        }
    }
}

#[async_trait]
impl TransferSource for EtherscanClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_transfers(
        &self,
        account: &Address,
    ) -> Result<Vec<NormalizedTransfer>, IndexerError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(IndexerError::MissingApiKey(PROVIDER))?;

        let chain_id = self.chain_id.to_string();
        let address = lowercase_address(account);
        let offset = PAGE_SIZE.to_string();
        let request = self.http.get(&self.base_url).query(&[
            ("chainid", chain_id.as_str()),
            ("module", "account"),
            ("action", "tokentx"),
            ("address", address.as_str()),
            ("startblock", "0"),
            ("endblock", "99999999"),
            ("page", "1"),
            ("offset", offset.as_str()),
            ("sort", "desc"),
            ("apikey", api_key),
        ]);

        let body = get_json(PROVIDER, request).await?;
        let transfers = normalize_response(body, &self.tokens);
        debug!(
            "{} returned {} supported transfers for {}",
            PROVIDER,
            transfers.len(),
            account
        );
        Ok(transfers)
    }
}

/// Anything but `status == "1"` with an array result is reported as no
/// transfers; Etherscan signals an empty account the same way it signals
/// most soft errors.
pub(crate) fn normalize_response(body: Value, tokens: &SupportedTokens) -> Vec<NormalizedTransfer> {
    let response = match TokenTxResponse::deserialize(body) {
        Ok(response) => response,
        Err(e) => {
            warn!("Unexpected {} response shape: {}", PROVIDER, e);
            return Vec::new();
        }
    };

    if response.status != "1" {
        debug!("{} status {}: {}", PROVIDER, response.status, response.message);
        return Vec::new();
    }

    let Value::Array(items) = response.result else {
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match TokenTx::deserialize(item) {
            Ok(tx) => normalize_tx(tx, tokens),
            Err(e) => {
                warn!("Skipping undecodable {} transfer: {}", PROVIDER, e);
                None
            }
        })
        .take(MAX_RESULTS)
        .collect()
}

fn normalize_tx(tx: TokenTx, tokens: &SupportedTokens) -> Option<NormalizedTransfer> {
    let token = tokens.by_address(&scalar_string(&tx.contract_address)?)?;

    Some(NormalizedTransfer {
        transaction_hash: scalar_string(&tx.hash).unwrap_or_default(),
        block_hash: scalar_string(&tx.block_hash).unwrap_or_default(),
        block_number: scalar_u64(&tx.block_number).unwrap_or(0),
        from: lowercase_or_empty(scalar_string(&tx.from).as_deref()),
        to: lowercase_or_empty(scalar_string(&tx.to).as_deref()),
        value: scalar_string(&tx.value).unwrap_or_else(|| "0".to_string()),
        token_symbol: token.symbol.clone(),
        token_decimals: token.decimals,
        timestamp: scalar_u64(&tx.time_stamp).unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::tests::{local_client, serve_once};
    use crate::tokens::tests::tokens;
    use serde_json::json;

    const ARST: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const OTHER: &str = "0x3333333333333333333333333333333333333333";

    fn tx(contract: &str, hash: &str, time_stamp: &str) -> Value {
        json!({
            "blockNumber": "19000000",
            "timeStamp": time_stamp,
            "hash": hash,
            "blockHash": "0xblock",
            "from": "0xAAAA000000000000000000000000000000000001",
            "contractAddress": contract,
            "to": "0x0000000000000000000000000000000000000002",
            "value": "1000000000000000000",
            "tokenName": "whatever upstream says",
            "tokenSymbol": "WHATEVER",
            "tokenDecimal": "0",
        })
    }

    #[test]
    fn uses_local_token_metadata() {
        let body = json!({
            "status": "1",
            "message": "OK",
            "result": [tx(ARST, "0x1", "1700000000")],
        });

        let transfers = normalize_response(body, &tokens());

        assert_eq!(transfers.len(), 1);
        let t = &transfers[0];
        assert_eq!(t.token_symbol, "ARST");
        assert_eq!(t.token_decimals, 18);
        assert_eq!(t.block_number, 19_000_000);
        assert_eq!(t.timestamp, 1_700_000_000);
        assert_eq!(t.from, "0xaaaa000000000000000000000000000000000001");
    }

    #[test]
    fn filters_then_caps_at_ten() {
        let mut result = Vec::new();
        for i in 0..20 {
            let contract = if i % 4 == 0 { OTHER } else { ARST };
            result.push(tx(contract, &format!("0x{i}"), &(1_700_000_000 - i).to_string()));
        }
        let body = json!({ "status": "1", "message": "OK", "result": result });

        let transfers = normalize_response(body, &tokens());

        assert_eq!(transfers.len(), MAX_RESULTS);
        assert!(transfers.iter().all(|t| t.token_symbol == "ARST"));
        assert_eq!(transfers[0].transaction_hash, "0x1");
    }

    #[test]
    fn numeric_fields_are_coerced() {
        let mut raw = tx(ARST, "0x1", "0");
        raw["blockNumber"] = json!(19000000);
        raw["timeStamp"] = json!(1700000000);
        raw["value"] = json!(5);
        raw["to"] = json!(null);
        let body = json!({ "status": "1", "message": "OK", "result": [raw] });

        let transfers = normalize_response(body, &tokens());

        assert_eq!(transfers.len(), 1);
        let t = &transfers[0];
        assert_eq!(t.block_number, 19_000_000);
        assert_eq!(t.timestamp, 1_700_000_000);
        assert_eq!(t.value, "5");
        assert_eq!(t.to, "");
    }

    #[test]
    fn non_ok_status_is_empty() {
        let body = json!({ "status": "0", "message": "No transactions found", "result": [] });
        assert!(normalize_response(body, &tokens()).is_empty());

        let body = json!({ "status": "0", "message": "NOTOK", "result": "Invalid API Key" });
        assert!(normalize_response(body, &tokens()).is_empty());
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        let http = reqwest::Client::new();
        let client = EtherscanClient::new(http, "http://127.0.0.1:9", 84532, None, tokens());

        let err = client
            .fetch_transfers(&Address::ZERO)
            .await
            .expect_err("must fail without key");

        assert!(matches!(err, IndexerError::MissingApiKey(_)));
    }

    #[tokio::test]
    async fn queries_tokentx_with_key_and_chain() {
        let body = r#"{"status":"1","message":"OK","result":[]}"#;
        let (base_url, seen) = serve_once("200 OK", body).await;
        let client = EtherscanClient::new(
            local_client(),
            format!("{base_url}/v2/api"),
            84532,
            Some("key".to_string()),
            tokens(),
        );

        let transfers = client.fetch_transfers(&Address::ZERO).await.unwrap();

        assert!(transfers.is_empty());
        let request_line = seen.await.unwrap();
        assert!(request_line.starts_with("GET /v2/api?chainid=84532&module=account&action=tokentx&"));
        assert!(request_line.contains("&offset=20&sort=desc&apikey=key "));
    }

    #[tokio::test]
    async fn server_error_is_a_status_error() {
        let (base_url, _seen) = serve_once("502 Bad Gateway", "").await;
        let client =
            EtherscanClient::new(local_client(), base_url, 84532, Some("key".to_string()), tokens());

        let err = client
            .fetch_transfers(&Address::ZERO)
            .await
            .expect_err("5xx must fail");

        assert!(matches!(err, IndexerError::Status { provider: "Etherscan", .. }));
    }
}
