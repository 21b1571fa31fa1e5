use super::{
    IndexerError, TransferSource, get_json, lowercase_or_empty, scalar_string, scalar_u64,
};
use crate::models::{NormalizedTransfer, lowercase_address};
use crate::tokens::SupportedTokens;
use alloy_primitives::Address;
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

const PROVIDER: &str = "Blockscout";

/// Every field is read as raw JSON and coerced individually.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TokenTransferItem {
    token: Value,
    token_type: Value,
    from: Value,
    to: Value,
    total: Value,
    timestamp: Value,
    block_hash: Value,
    block_number: Value,
    transaction_hash: Value,
}

/// Client for the Blockscout v2 REST API.
pub struct BlockscoutClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    tokens: SupportedTokens,
}

impl BlockscoutClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        tokens: SupportedTokens,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            tokens,
        }
    }

    fn transfers_url(&self, account: &Address) -> String {
        format!(
            "{}/api/v2/addresses/{}/token-transfers",
            self.base_url,
            lowercase_address(account)
        )
    }
}

#[async_trait]
impl TransferSource for BlockscoutClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_transfers(
        &self,
        account: &Address,
    ) -> Result<Vec<NormalizedTransfer>, IndexerError> {
        let mut request = self.http.get(self.transfers_url(account));
        if let Some(key) = &self.api_key {
            request = request.query(&[("apikey", key)]);
        }

        let body = get_json(PROVIDER, request).await?;
        let transfers = normalize_page(&body, &self.tokens);
        debug!(
            "{} returned {} supported transfers for {}",
            PROVIDER,
            transfers.len(),
            account
        );
        Ok(transfers)
    }
}

/// Maps one page of `token-transfers` into normalized records. A body without
/// an `items` array is treated as an empty page.
pub(crate) fn normalize_page(body: &Value, tokens: &SupportedTokens) -> Vec<NormalizedTransfer> {
    let Some(items) = body.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match TokenTransferItem::deserialize(item) {
            Ok(parsed) => normalize_item(parsed, tokens),
            Err(e) => {
                warn!("Skipping undecodable {} transfer: {}", PROVIDER, e);
                None
            }
        })
        .collect()
}

fn normalize_item(item: TokenTransferItem, tokens: &SupportedTokens) -> Option<NormalizedTransfer> {
    if scalar_string(&item.token_type).as_deref() != Some("ERC-20") {
        return None;
    }

    let token_address = item.token.get("address_hash").and_then(scalar_string)?;
    let token = tokens.by_address(&token_address)?;
    let nested = |value: &Value, key: &str| value.get(key).and_then(scalar_string);

    Some(NormalizedTransfer {
        transaction_hash: scalar_string(&item.transaction_hash).unwrap_or_default(),
        block_hash: scalar_string(&item.block_hash).unwrap_or_default(),
        block_number: scalar_u64(&item.block_number).unwrap_or(0),
        from: lowercase_or_empty(nested(&item.from, "hash").as_deref()),
        to: lowercase_or_empty(nested(&item.to, "hash").as_deref()),
        value: nested(&item.total, "value").unwrap_or_else(|| "0".to_string()),
        token_symbol: token.symbol.clone(),
        token_decimals: token.decimals,
        timestamp: item
            .timestamp
            .as_str()
            .map(iso_to_unix)
            .unwrap_or(0),
    })
}

fn iso_to_unix(timestamp: &str) -> u64 {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.timestamp().max(0) as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::tests::{local_client, serve_once};
    use crate::tokens::tests::tokens;
    use serde_json::json;

    fn item(token: &str, token_type: &str, hash: &str) -> Value {
        json!({
            "token": { "address_hash": token },
            "token_type": token_type,
            "from": { "hash": "0xAbCdEf0000000000000000000000000000000001" },
            "to": { "hash": "0x0000000000000000000000000000000000000002" },
            "total": { "decimals": "6", "value": "2500000" },
            "timestamp": "2024-05-01T12:00:00.000000Z",
            "block_hash": "0xblock",
            "block_number": 123,
            "transaction_hash": hash,
        })
    }

    #[test]
    fn maps_nested_blockscout_fields() {
        let body = json!({
            "items": [item("0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB", "ERC-20", "0xh1")],
            "next_page_params": null,
        });

        let transfers = normalize_page(&body, &tokens());

        assert_eq!(transfers.len(), 1);
        let t = &transfers[0];
        assert_eq!(t.transaction_hash, "0xh1");
        assert_eq!(t.from, "0xabcdef0000000000000000000000000000000001");
        assert_eq!(t.to, "0x0000000000000000000000000000000000000002");
        assert_eq!(t.value, "2500000");
        assert_eq!(t.token_symbol, "USDC");
        assert_eq!(t.token_decimals, 6);
        assert_eq!(t.block_number, 123);
        assert_eq!(t.timestamp, 1_714_564_800);
    }

    #[test]
    fn drops_unsupported_tokens_and_types() {
        let body = json!({
            "items": [
                item("0x3333333333333333333333333333333333333333", "ERC-20", "0xother"),
                item("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "ERC-721", "0xnft"),
                { "token_type": "ERC-20", "transaction_hash": "0xnotoken" },
                item("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "ERC-20", "0xarst"),
            ]
        });

        let transfers = normalize_page(&body, &tokens());

        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].transaction_hash, "0xarst");
        assert_eq!(transfers[0].token_symbol, "ARST");
    }

    #[test]
    fn defaults_missing_fields() {
        let body = json!({
            "items": [{
                "token": { "address_hash": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa" },
                "token_type": "ERC-20",
                "timestamp": "not a date",
            }]
        });

        let transfers = normalize_page(&body, &tokens());

        assert_eq!(transfers.len(), 1);
        let t = &transfers[0];
        assert_eq!(t.value, "0");
        assert_eq!(t.timestamp, 0);
        assert_eq!(t.from, "");
        assert_eq!(t.transaction_hash, "");
    }

    #[test]
    fn mistyped_fields_fall_back_individually() {
        let body = json!({
            "items": [{
                "token": { "address_hash": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa" },
                "token_type": "ERC-20",
                "from": "not an object",
                "to": { "hash": 42 },
                "total": { "value": 2500000 },
                "timestamp": 1714564800,
                "block_number": "123",
                "transaction_hash": "0xh1",
            }]
        });

        let transfers = normalize_page(&body, &tokens());

        assert_eq!(transfers.len(), 1);
        let t = &transfers[0];
        assert_eq!(t.transaction_hash, "0xh1");
        assert_eq!(t.block_number, 123);
        assert_eq!(t.value, "2500000");
        assert_eq!(t.from, "");
        assert_eq!(t.to, "42");
        assert_eq!(t.timestamp, 0);
    }

    #[test]
    fn missing_items_is_an_empty_page() {
        assert!(normalize_page(&json!({ "message": "Not found" }), &tokens()).is_empty());
        assert!(normalize_page(&json!({ "items": "oops" }), &tokens()).is_empty());
    }

    #[tokio::test]
    async fn sends_api_key_as_query_parameter() {
        let (base_url, seen) = serve_once("200 OK", r#"{"items": []}"#).await;
        let client = BlockscoutClient::new(
            local_client(),
            format!("{base_url}/"),
            Some("secret".to_string()),
            tokens(),
        );

        let transfers = client.fetch_transfers(&Address::ZERO).await.unwrap();

        assert!(transfers.is_empty());
        let request_line = seen.await.unwrap();
        assert!(request_line.starts_with(
            "GET /api/v2/addresses/0x0000000000000000000000000000000000000000/token-transfers?apikey=secret "
        ));
    }

    #[tokio::test]
    async fn server_error_is_a_status_error() {
        let (base_url, _seen) = serve_once("500 Internal Server Error", "{}").await;
        let client = BlockscoutClient::new(local_client(), base_url, None, tokens());

        let err = client
            .fetch_transfers(&Address::ZERO)
            .await
            .expect_err("5xx must fail");

        assert!(matches!(
            err,
            IndexerError::Status { status, .. } if status == reqwest::StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let (base_url, _seen) = serve_once("200 OK", "not json").await;
        let client = BlockscoutClient::new(local_client(), base_url, None, tokens());

        let err = client
            .fetch_transfers(&Address::ZERO)
            .await
            .expect_err("garbage body must fail");

        assert!(matches!(err, IndexerError::Decode { provider: "Blockscout", .. }));
    }
}
