use crate::models::{ClassifiedTransaction, NormalizedTransfer, SwapDetails, lowercase_address};
use alloy_primitives::Address;
use std::collections::HashMap;

/// Maximum number of entries kept in an account's recent history.
pub const HISTORY_LIMIT: usize = 10;

/// Turns raw transfer legs into the account's recent transactions.
///
/// Legs are grouped by transaction hash. A group of exactly two legs, one
/// leaving and one reaching `account`, in different tokens, collapses into a
/// single swap. Every other leg is reported on its own as incoming or
/// outgoing. Groups with more than two legs (multi-hop router calls, batched
/// transfers) are never collapsed, even when their net effect is a swap.
///
/// The result is ordered newest first and holds at most [`HISTORY_LIMIT`]
/// entries. Equal timestamps keep the order in which their hashes were first
/// seen.
pub fn classify(transfers: &[NormalizedTransfer], account: &Address) -> Vec<ClassifiedTransaction> {
    let account = lowercase_address(account);

    let mut classified = Vec::with_capacity(transfers.len());
    for (hash, group) in group_by_hash(transfers) {
        match as_swap(hash, &group, &account) {
            Some(swap) => classified.push(swap),
            None => classified.extend(group.iter().map(|leg| simple(leg, &account))),
        }
    }

    sort_and_cap(&mut classified);
    classified
}

/// Newest first, stable on ties, capped at [`HISTORY_LIMIT`].
pub fn sort_and_cap(transactions: &mut Vec<ClassifiedTransaction>) {
    transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    transactions.truncate(HISTORY_LIMIT);
}

fn group_by_hash(transfers: &[NormalizedTransfer]) -> Vec<(&str, Vec<&NormalizedTransfer>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&NormalizedTransfer>)> = Vec::new();

    for transfer in transfers {
        let hash = transfer.transaction_hash.as_str();
        match index.get(hash) {
            Some(&i) => groups[i].1.push(transfer),
            None => {
                index.insert(hash, groups.len());
                groups.push((hash, vec![transfer]));
            }
        }
    }

    groups
}

fn as_swap(
    hash: &str,
    group: &[&NormalizedTransfer],
    account: &str,
) -> Option<ClassifiedTransaction> {
    if group.len() != 2 {
        return None;
    }

    let sent = group.iter().find(|leg| leg.from.eq_ignore_ascii_case(account))?;
    let received = group.iter().find(|leg| leg.to.eq_ignore_ascii_case(account))?;

    if sent.token_symbol.eq_ignore_ascii_case(&received.token_symbol) {
        return None;
    }

    let block_hash = [&sent.block_hash, &received.block_hash]
        .into_iter()
        .find(|h| !h.is_empty())
        .cloned()
        .unwrap_or_else(|| hash.to_string());

    Some(ClassifiedTransaction::swap(
        hash.to_string(),
        block_hash,
        sent.timestamp,
        SwapDetails {
            token_in: sent.token_symbol.clone(),
            token_out: received.token_symbol.clone(),
            amount_in: sent.value.clone(),
            amount_out: received.value.clone(),
            token_in_decimals: sent.token_decimals,
            token_out_decimals: received.token_decimals,
        },
    ))
}

fn simple(leg: &NormalizedTransfer, account: &str) -> ClassifiedTransaction {
    if leg.from.eq_ignore_ascii_case(account) {
        ClassifiedTransaction::outgoing(leg)
    } else {
        ClassifiedTransaction::incoming(leg)
    }
}
