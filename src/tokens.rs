use alloy_primitives::Address;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    Base,
    BaseSepolia,
}

impl Chain {
    /// Unknown names fall back to the testnet.
    pub fn from_name(name: &str) -> Self {
        match name {
            "base" => Chain::Base,
            "baseSepolia" => Chain::BaseSepolia,
            other => {
                warn!("Unknown chain name '{}', falling back to baseSepolia", other);
                Chain::BaseSepolia
            }
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Chain::Base => 8453,
            Chain::BaseSepolia => 84532,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Chain::Base => "base",
            Chain::BaseSepolia => "baseSepolia",
        }
    }

    pub fn blockscout_url(&self) -> &'static str {
        match self {
            Chain::Base => "https://base.blockscout.com",
            Chain::BaseSepolia => "https://base-sepolia.blockscout.com",
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Chain::Base => "https://mainnet.base.org",
            Chain::BaseSepolia => "https://sepolia.base.org",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

/// The two tokens the wallet tracks. Transfers of any other contract never
/// leave the indexer adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedTokens {
    pub arst: TokenConfig,
    pub usdc: TokenConfig,
}

impl SupportedTokens {
    pub fn new(arst_address: Address, usdc_address: Address) -> Self {
        Self {
            arst: TokenConfig {
                name: "ARST Finance".to_string(),
                symbol: "ARST".to_string(),
                address: arst_address,
                decimals: 18,
            },
            usdc: TokenConfig {
                name: "USDC".to_string(),
                symbol: "USDC".to_string(),
                address: usdc_address,
                decimals: 6,
            },
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenConfig> {
        [&self.arst, &self.usdc].into_iter()
    }

    pub fn by_contract(&self, address: &Address) -> Option<&TokenConfig> {
        self.iter().find(|token| token.address == *address)
    }

    /// Lookup by a raw contract address string as returned by an indexer.
    /// Empty or malformed addresses match nothing.
    pub fn by_address(&self, address: &str) -> Option<&TokenConfig> {
        let address = Address::from_str(address.trim()).ok()?;
        self.by_contract(&address)
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&TokenConfig> {
        self.iter().find(|token| token.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn symbol_of(&self, address: &Address) -> String {
        self.by_contract(address)
            .map(|token| token.symbol.clone())
            .unwrap_or_else(|| "UNKNOWN".to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy_primitives::address;

    pub const ARST: Address = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    pub const USDC: Address = address!("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

    pub fn tokens() -> SupportedTokens {
        SupportedTokens::new(ARST, USDC)
    }

    #[test]
    fn looks_up_tokens_case_insensitively() {
        let tokens = tokens();
        assert_eq!(
            tokens
                .by_address("0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB")
                .map(|t| t.symbol.as_str()),
            Some("USDC")
        );
        assert_eq!(tokens.by_symbol("arst").map(|t| t.decimals), Some(18));
        assert!(tokens.by_address("").is_none());
        assert!(tokens.by_address("0x3333333333333333333333333333333333333333").is_none());
    }

    #[test]
    fn unknown_chain_falls_back_to_testnet() {
        assert_eq!(Chain::from_name("base"), Chain::Base);
        assert_eq!(Chain::from_name("mainnet"), Chain::BaseSepolia);
        assert_eq!(Chain::BaseSepolia.id(), 84532);
    }
}
