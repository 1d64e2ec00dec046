//! Known instruments and upstream symbol mappings
//!
//! Every upstream names instruments its own way:
//! - brsapi: uppercase symbols (`USD`, `IR_GOLD_18K`, `IR_COIN_EMAMI`)
//! - nobitex: lowercase market pairs (`btc-rls`, `usdt-rls`)
//!
//! Both map onto one stable lowercase id per instrument.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::AssetType;

/// Static description of an instrument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    pub id: &'static str,
    pub asset_type: AssetType,
    pub name_fa: &'static str,
    pub symbol: &'static str,
}

impl AssetInfo {
    const fn new(
        id: &'static str,
        asset_type: AssetType,
        name_fa: &'static str,
        symbol: &'static str,
    ) -> Self {
        Self { id, asset_type, name_fa, symbol }
    }
}

/// Catalog in display order
pub const ASSETS: &[AssetInfo] = &[
    AssetInfo::new("usd", AssetType::Currency, "دلار آمریکا", "USD"),
    AssetInfo::new("eur", AssetType::Currency, "یورو", "EUR"),
    AssetInfo::new("gbp", AssetType::Currency, "پوند انگلیس", "GBP"),
    AssetInfo::new("aed", AssetType::Currency, "درهم امارات", "AED"),
    AssetInfo::new("try", AssetType::Currency, "لیر ترکیه", "TRY"),
    AssetInfo::new("gold_18k", AssetType::Gold, "طلای ۱۸ عیار", "GOLD18K"),
    AssetInfo::new("gold_24k", AssetType::Gold, "طلای ۲۴ عیار", "GOLD24K"),
    AssetInfo::new("coin_emami", AssetType::Coin, "سکه امامی", "EMAMI"),
    AssetInfo::new("coin_bahar", AssetType::Coin, "سکه بهار آزادی", "BAHAR"),
    AssetInfo::new("coin_half", AssetType::Coin, "نیم سکه", "HALF"),
    AssetInfo::new("coin_quarter", AssetType::Coin, "ربع سکه", "QUARTER"),
    AssetInfo::new("btc", AssetType::Crypto, "بیت‌کوین", "BTC"),
    AssetInfo::new("eth", AssetType::Crypto, "اتریوم", "ETH"),
    AssetInfo::new("usdt", AssetType::Crypto, "تتر", "USDT"),
    AssetInfo::new("doge", AssetType::Crypto, "دوج‌کوین", "DOGE"),
];

/// Ids shown as headline cards
pub const HIGH_PRIORITY_IDS: &[&str] = &["usd", "gold_18k", "btc", "usdt", "coin_emami"];

/// Stablecoin pair used to derive the USD rate
pub const USD_REFERENCE_PAIR: &str = "usdt-rls";

/// Tokenized troy ounce of gold, used to derive gram prices
pub const GOLD_REFERENCE_PAIR: &str = "paxg-rls";

/// `srcCurrency` filter for nobitex market stats, reference pairs included
pub const NOBITEX_MARKETS: &str = "btc,eth,usdt,doge,paxg";

static BY_ID: LazyLock<HashMap<&'static str, &'static AssetInfo>> =
    LazyLock::new(|| ASSETS.iter().map(|a| (a.id, a)).collect());

static BRSAPI_SYMBOLS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("USD", "usd"),
        ("EUR", "eur"),
        ("GBP", "gbp"),
        ("AED", "aed"),
        ("TRY", "try"),
        ("IR_GOLD_18K", "gold_18k"),
        ("IR_GOLD_24K", "gold_24k"),
        ("IR_COIN_EMAMI", "coin_emami"),
        ("IR_COIN_BAHAR", "coin_bahar"),
        ("IR_COIN_HALF", "coin_half"),
        ("IR_COIN_QUARTER", "coin_quarter"),
    ])
});

static NOBITEX_PAIRS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("btc-rls", "btc"),
        ("eth-rls", "eth"),
        ("usdt-rls", "usdt"),
        ("doge-rls", "doge"),
    ])
});

pub fn asset_info(id: &str) -> Option<&'static AssetInfo> {
    BY_ID.get(id).copied()
}

/// Resolve a brsapi symbol (case-insensitive)
pub fn brsapi_asset(symbol: &str) -> Option<&'static AssetInfo> {
    BRSAPI_SYMBOLS
        .get(symbol.trim().to_uppercase().as_str())
        .and_then(|id| asset_info(id))
}

/// Resolve a nobitex market pair (case-insensitive)
pub fn nobitex_asset(pair: &str) -> Option<&'static AssetInfo> {
    NOBITEX_PAIRS
        .get(pair.trim().to_lowercase().as_str())
        .and_then(|id| asset_info(id))
}

/// Position of an id in the catalog, unknown ids sort last
pub fn display_position(id: &str) -> usize {
    ASSETS.iter().position(|a| a.id == id).unwrap_or(ASSETS.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_unique_and_lowercase() {
        let mut seen = HashSet::new();
        for asset in ASSETS {
            assert!(seen.insert(asset.id), "duplicate id {}", asset.id);
            assert_eq!(asset.id, asset.id.to_lowercase());
        }
    }

    #[test]
    fn test_symbol_mappings_resolve() {
        assert_eq!(brsapi_asset("IR_GOLD_18K").unwrap().id, "gold_18k");
        assert_eq!(brsapi_asset(" usd ").unwrap().asset_type, AssetType::Currency);
        assert_eq!(nobitex_asset("USDT-RLS").unwrap().id, "usdt");
        assert!(brsapi_asset("XAUUSD").is_none());
        assert!(nobitex_asset(GOLD_REFERENCE_PAIR).is_none());
    }

    #[test]
    fn test_high_priority_ids_are_cataloged() {
        for id in HIGH_PRIORITY_IDS {
            assert!(asset_info(id).is_some(), "{} missing from catalog", id);
        }
    }

    #[test]
    fn test_display_position() {
        assert_eq!(display_position("usd"), 0);
        assert!(display_position("gold_18k") < display_position("btc"));
        assert_eq!(display_position("unknown"), ASSETS.len());
    }
}
