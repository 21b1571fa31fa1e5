use crate::amount::format_amount;
use crate::balances::{TokenBalance, TokenMetadata};
use crate::models::{ClassifiedTransaction, NormalizedTransfer, TransactionKind};
use crate::tokens::TokenConfig;
use alloy_primitives::U256;
use chrono::DateTime;
use comfy_table::{Cell, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use csv::Writer;
use serde_json::json;
use std::str::FromStr;

const DISPLAY_DECIMALS: usize = 2;

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

pub fn format_history(transactions: &[ClassifiedTransaction], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_history_table(transactions),
        OutputFormat::Json => {
            serde_json::to_string_pretty(transactions).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => format_history_csv(transactions),
    }
}

fn format_history_table(transactions: &[ClassifiedTransaction]) -> String {
    if transactions.is_empty() {
        return "No transactions found.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Time", "Type", "Amount", "Counterparty", "Tx Hash", ""]);

    for tx in transactions {
        let (amount, counterparty) = describe(tx);
        table.add_row(vec![
            Cell::new(format_timestamp(tx.timestamp)),
            Cell::new(tx.kind.label()),
            Cell::new(amount),
            Cell::new(counterparty),
            Cell::new(format_tx_hash(&tx.hash)),
            Cell::new(if tx.is_optimistic { "pending" } else { "" }),
        ]);
    }

    table.to_string()
}

fn format_history_csv(transactions: &[ClassifiedTransaction]) -> String {
    let mut wtr = Writer::from_writer(vec![]);

    let _ = wtr.write_record([
        "timestamp",
        "type",
        "token_in",
        "amount_in",
        "token_out",
        "amount_out",
        "from",
        "to",
        "hash",
        "block_hash",
        "optimistic",
    ]);

    for tx in transactions {
        let timestamp = tx.timestamp.to_string();
        let optimistic = tx.is_optimistic.to_string();
        let (token_in, amount_in, token_out, amount_out, from, to) = match &tx.kind {
            TransactionKind::Swap(swap) => (
                swap.token_in.as_str(),
                swap.amount_in.as_str(),
                swap.token_out.as_str(),
                swap.amount_out.as_str(),
                "",
                "",
            ),
            TransactionKind::Outgoing(t) => (
                t.token_symbol.as_str(),
                t.value.as_str(),
                "",
                "",
                t.from.as_str(),
                t.to.as_str(),
            ),
            TransactionKind::Incoming(t) => (
                "",
                "",
                t.token_symbol.as_str(),
                t.value.as_str(),
                t.from.as_str(),
                t.to.as_str(),
            ),
        };
        let _ = wtr.write_record([
            timestamp.as_str(),
            tx.kind.label(),
            token_in,
            amount_in,
            token_out,
            amount_out,
            from,
            to,
            tx.hash.as_str(),
            tx.block_hash.as_str(),
            optimistic.as_str(),
        ]);
    }

    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}

fn describe(tx: &ClassifiedTransaction) -> (String, String) {
    match &tx.kind {
        TransactionKind::Swap(swap) => (
            format!(
                "{} {} -> {} {}",
                display_value(&swap.amount_in, swap.token_in_decimals),
                swap.token_in,
                display_value(&swap.amount_out, swap.token_out_decimals),
                swap.token_out
            ),
            String::new(),
        ),
        TransactionKind::Outgoing(t) => (
            format!(
                "-{} {}",
                display_value(&t.value, t.token_decimals),
                t.token_symbol
            ),
            t.to.clone(),
        ),
        TransactionKind::Incoming(t) => (
            format!(
                "+{} {}",
                display_value(&t.value, t.token_decimals),
                t.token_symbol
            ),
            t.from.clone(),
        ),
    }
}

pub fn format_transfers(transfers: &[NormalizedTransfer], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_transfers_table(transfers),
        OutputFormat::Json => {
            serde_json::to_string_pretty(transfers).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => format_transfers_csv(transfers),
    }
}

fn format_transfers_table(transfers: &[NormalizedTransfer]) -> String {
    if transfers.is_empty() {
        return "No transfers found.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            "Block",
            "From",
            "To",
            "Value",
            "Value (Raw)",
            "Token",
            "Tx Hash",
        ]);

    for transfer in transfers {
        table.add_row(vec![
            Cell::new(transfer.block_number),
            Cell::new(&transfer.from),
            Cell::new(&transfer.to),
            Cell::new(format_amount(
                transfer.amount(),
                transfer.token_decimals,
                DISPLAY_DECIMALS,
            )),
            Cell::new(&transfer.value),
            Cell::new(&transfer.token_symbol),
            Cell::new(format_tx_hash(&transfer.transaction_hash)),
        ]);
    }

    table.to_string()
}

fn format_transfers_csv(transfers: &[NormalizedTransfer]) -> String {
    let mut wtr = Writer::from_writer(vec![]);

    let _ = wtr.write_record([
        "block_number",
        "timestamp",
        "from",
        "to",
        "value",
        "token",
        "transaction_hash",
    ]);

    for transfer in transfers {
        let _ = wtr.write_record([
            &transfer.block_number.to_string(),
            &transfer.timestamp.to_string(),
            &transfer.from,
            &transfer.to,
            &transfer.value,
            &transfer.token_symbol,
            &transfer.transaction_hash,
        ]);
    }

    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}

pub fn format_balances(balances: &[TokenBalance], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec!["Token", "Balance", "Balance (Raw)"]);

            for entry in balances {
                table.add_row(vec![
                    Cell::new(&entry.token.symbol),
                    Cell::new(format_amount(
                        entry.balance,
                        entry.token.decimals,
                        DISPLAY_DECIMALS,
                    )),
                    Cell::new(entry.balance.to_string()),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => {
            let json_balances: Vec<_> = balances
                .iter()
                .map(|entry| {
                    json!({
                        "token": entry.token.symbol,
                        "address": format!("{:?}", entry.token.address),
                        "decimals": entry.token.decimals,
                        "balance": format_amount(entry.balance, entry.token.decimals, DISPLAY_DECIMALS),
                        "balance_raw": entry.balance.to_string(),
                    })
                })
                .collect();
            serde_json::to_string_pretty(&json_balances).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["token", "balance", "balance_raw"]);
            for entry in balances {
                let _ = wtr.write_record([
                    entry.token.symbol.as_str(),
                    &format_amount(entry.balance, entry.token.decimals, DISPLAY_DECIMALS),
                    &entry.balance.to_string(),
                ]);
            }
            String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
        }
    }
}

/// Configured tokens next to what their contracts report on-chain.
pub fn format_token_check(
    checks: &[(TokenConfig, TokenMetadata)],
    format: &OutputFormat,
) -> String {
    let show = |value: Option<String>| value.unwrap_or_else(|| "N/A".to_string());

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    "Token",
                    "Address",
                    "Decimals",
                    "On-chain Name",
                    "On-chain Symbol",
                    "On-chain Decimals",
                ]);

            for (token, metadata) in checks {
                table.add_row(vec![
                    Cell::new(&token.symbol),
                    Cell::new(format!("{:?}", token.address)),
                    Cell::new(token.decimals),
                    Cell::new(show(metadata.name.clone())),
                    Cell::new(show(metadata.symbol.clone())),
                    Cell::new(show(metadata.decimals.map(|d| d.to_string()))),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => {
            let json_checks: Vec<_> = checks
                .iter()
                .map(|(token, metadata)| {
                    json!({
                        "token": token.symbol,
                        "address": format!("{:?}", token.address),
                        "decimals": token.decimals,
                        "onchain_name": metadata.name,
                        "onchain_symbol": metadata.symbol,
                        "onchain_decimals": metadata.decimals,
                    })
                })
                .collect();
            serde_json::to_string_pretty(&json_checks).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record([
                "token",
                "address",
                "decimals",
                "onchain_name",
                "onchain_symbol",
                "onchain_decimals",
            ]);
            for (token, metadata) in checks {
                let _ = wtr.write_record([
                    token.symbol.clone(),
                    format!("{:?}", token.address),
                    token.decimals.to_string(),
                    show(metadata.name.clone()),
                    show(metadata.symbol.clone()),
                    show(metadata.decimals.map(|d| d.to_string())),
                ]);
            }
            String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
        }
    }
}

fn display_value(value: &str, decimals: u8) -> String {
    match U256::from_str(value) {
        Ok(amount) => format_amount(amount, decimals, DISPLAY_DECIMALS),
        Err(_) => value.to_string(),
    }
}

fn format_timestamp(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn format_tx_hash(hash: &str) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() <= 12 {
        return hash.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SwapDetails, TransferDetails};

    fn history() -> Vec<ClassifiedTransaction> {
        vec![
            ClassifiedTransaction::swap(
                "0x1234567890abcdef".to_string(),
                "0xblock".to_string(),
                1_714_564_800,
                SwapDetails {
                    token_in: "USDC".to_string(),
                    token_out: "ARST".to_string(),
                    amount_in: "1500000".to_string(),
                    amount_out: "2000000000000000000000".to_string(),
                    token_in_decimals: 6,
                    token_out_decimals: 18,
                },
            )
            .into_optimistic(),
            ClassifiedTransaction {
                hash: "0xfeed".to_string(),
                block_hash: "0xblock".to_string(),
                timestamp: 1_714_560_000,
                kind: TransactionKind::Incoming(TransferDetails {
                    from: "0xpeer".to_string(),
                    to: "0xme".to_string(),
                    value: "250000".to_string(),
                    token_symbol: "USDC".to_string(),
                    token_decimals: 6,
                }),
                is_optimistic: false,
            },
        ]
    }

    #[test]
    fn table_describes_each_kind() {
        let output = format_history(&history(), &OutputFormat::Table);

        assert!(output.contains("1.50 USDC -> 2000.00 ARST"));
        assert!(output.contains("+0.25 USDC"));
        assert!(output.contains("pending"));
        assert!(output.contains("2024-05-01 12:00:00"));
        assert!(output.contains("0x1234...cdef"));
    }

    #[test]
    fn csv_has_one_row_per_transaction() {
        let output = format_history(&history(), &OutputFormat::Csv);
        assert_eq!(output.lines().count(), 3);
        assert!(output.lines().nth(1).unwrap().starts_with("1714564800,swap,USDC,1500000"));
    }

    #[test]
    fn empty_history_table() {
        assert_eq!(
            format_history(&[], &OutputFormat::Table),
            "No transactions found."
        );
    }

    #[test]
    fn shortens_only_long_hashes() {
        assert_eq!(format_tx_hash("0xabc"), "0xabc");
        assert_eq!(format_tx_hash(""), "");
        assert_eq!(
            format_tx_hash("0x1234567890abcdef1234"),
            "0x1234...1234"
        );
    }

    #[test]
    fn non_ascii_hashes_do_not_panic() {
        assert_eq!(format_tx_hash("0xaéééééééééééé"), "0xaééé...éééé");

        let transfer = NormalizedTransfer {
            transaction_hash: "0xaéééééééééééé".to_string(),
            block_hash: String::new(),
            block_number: 1,
            from: String::new(),
            to: String::new(),
            value: "1".to_string(),
            token_symbol: "USDC".to_string(),
            token_decimals: 6,
            timestamp: 0,
        };
        let table = format_transfers(&[transfer], &OutputFormat::Table);
        assert!(table.contains("0xaééé...éééé"));
    }
}
