use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Indexers and the classifier compare addresses as lower-case `0x` strings.
pub fn lowercase_address(address: &Address) -> String {
    address.to_string().to_lowercase()
}

/// A single ERC-20 transfer leg as reported by an indexer, reduced to the
/// fields every provider can fill in. Addresses are lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTransfer {
    pub transaction_hash: String,
    pub block_hash: String,
    pub block_number: u64,
    pub from: String,
    pub to: String,
    /// Smallest-unit amount as a decimal string.
    pub value: String,
    pub token_symbol: String,
    #[serde(rename = "tokenDecimal")]
    pub token_decimals: u8,
    /// Unix seconds.
    pub timestamp: u64,
}

impl NormalizedTransfer {
    pub fn amount(&self) -> U256 {
        U256::from_str(&self.value).unwrap_or(U256::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapDetails {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
    pub amount_out: String,
    pub token_in_decimals: u8,
    pub token_out_decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDetails {
    pub from: String,
    pub to: String,
    pub value: String,
    pub token_symbol: String,
    #[serde(rename = "tokenDecimal")]
    pub token_decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransactionKind {
    Swap(SwapDetails),
    Incoming(TransferDetails),
    Outgoing(TransferDetails),
}

impl TransactionKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Swap(_) => "swap",
            TransactionKind::Incoming(_) => "incoming",
            TransactionKind::Outgoing(_) => "outgoing",
        }
    }
}

/// One entry of an account's recent history, either derived from indexed
/// transfers or synthesized locally right after a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedTransaction {
    pub hash: String,
    pub block_hash: String,
    pub timestamp: u64,
    #[serde(flatten)]
    pub kind: TransactionKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_optimistic: bool,
}

impl ClassifiedTransaction {
    pub fn swap(hash: String, block_hash: String, timestamp: u64, details: SwapDetails) -> Self {
        Self {
            hash,
            block_hash,
            timestamp,
            kind: TransactionKind::Swap(details),
            is_optimistic: false,
        }
    }

    pub fn incoming(transfer: &NormalizedTransfer) -> Self {
        Self::simple(transfer, TransactionKind::Incoming)
    }

    pub fn outgoing(transfer: &NormalizedTransfer) -> Self {
        Self::simple(transfer, TransactionKind::Outgoing)
    }

    fn simple(
        transfer: &NormalizedTransfer,
        kind: impl FnOnce(TransferDetails) -> TransactionKind,
    ) -> Self {
        Self {
            hash: transfer.transaction_hash.clone(),
            block_hash: transfer.block_hash.clone(),
            timestamp: transfer.timestamp,
            kind: kind(TransferDetails {
                from: transfer.from.clone(),
                to: transfer.to.clone(),
                value: transfer.value.clone(),
                token_symbol: transfer.token_symbol.clone(),
                token_decimals: transfer.token_decimals,
            }),
            is_optimistic: false,
        }
    }

    pub fn into_optimistic(mut self) -> Self {
        self.is_optimistic = true;
        self
    }

    pub fn hash_matches(&self, other: &str) -> bool {
        self.hash.eq_ignore_ascii_case(other)
    }
}
