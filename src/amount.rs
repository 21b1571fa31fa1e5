use alloy_primitives::U256;
use alloy_primitives::utils::{format_units, parse_units};
use anyhow::{Context, Result, bail};
use regex::Regex;
use std::sync::LazyLock;

static PLAIN_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid regex"));

static LOCALE_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(\.\d{3})*(,\d+)?$|^\d+(,\d+)?$").expect("valid regex"));

/// Converts a user-entered amount into the token's smallest unit.
///
/// Accepts `1234.56` as well as the comma-decimal form `1.234,56`. Amounts
/// with more fractional digits than the token supports are rejected rather
/// than rounded.
pub fn parse_amount(input: &str, decimals: u8) -> Result<U256> {
    let input = input.trim();

    let normalized = if input.contains(',') {
        if !LOCALE_AMOUNT.is_match(input) {
            bail!("Invalid amount: {}", input);
        }
        input.replace('.', "").replace(',', ".")
    } else {
        if !PLAIN_AMOUNT.is_match(input) {
            bail!("Invalid amount: {}", input);
        }
        input.to_string()
    };

    if let Some((_, fraction)) = normalized.split_once('.') {
        if fraction.len() > decimals as usize {
            bail!(
                "Amount {} has more than {} decimal places",
                input,
                decimals
            );
        }
    }

    let parsed = parse_units(&normalized, decimals)
        .with_context(|| format!("Invalid amount: {input}"))?;
    Ok(parsed.get_absolute())
}

/// Human-readable amount, truncated (not rounded) to `display_decimals`.
pub fn format_amount(value: U256, decimals: u8, display_decimals: usize) -> String {
    let Ok(formatted) = format_units(value, decimals) else {
        return value.to_string();
    };

    match formatted.split_once('.') {
        Some((int, fraction)) if display_decimals > 0 => {
            let fraction: String = fraction
                .chars()
                .chain(std::iter::repeat('0'))
                .take(display_decimals)
                .collect();
            format!("{int}.{fraction}")
        }
        Some((int, _)) => int.to_string(),
        None => formatted,
    }
}
