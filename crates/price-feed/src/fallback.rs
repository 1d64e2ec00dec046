//! Fallback synthesis for degraded legs
//!
//! Order of preference when the primary quotes are missing:
//! 1. derive from a live secondary-market quote (USDT for the dollar, PAXG for gold)
//! 2. gold only: fixed reference constants tagged with the synthetic source

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::warn;

use nerkh_core::catalog::{GOLD_REFERENCE_PAIR, USD_REFERENCE_PAIR};
use nerkh_core::{
    PriceAsset, PriceOrigin, SECONDARY_MARKET_SOURCE, SENTINEL_GOLD_18K_TOMAN,
    SENTINEL_GOLD_24K_TOMAN, SYNTHETIC_SOURCE,
};

use crate::feeds::{catalog_asset, rial_to_toman, NobitexQuotes};

/// Grams per troy ounce
const GRAMS_PER_TROY_OUNCE: Decimal = Decimal::from_parts(311_034_768, 0, 0, false, 7);

/// 18k purity (18/24)
const PURITY_18K: Decimal = Decimal::from_parts(75, 0, 0, false, 2);

/// Fine gold in an Emami coin: 8.133 g at 0.900
const EMAMI_FINE_GRAMS: Decimal = Decimal::from_parts(73_197, 0, 0, false, 4);

/// `usd` re-derived from the stablecoin market, one USDT taken as one dollar
pub fn usd_from_stablecoin(nobitex: &NobitexQuotes) -> Option<PriceAsset> {
    let stat = nobitex.pair(USD_REFERENCE_PAIR)?;
    let price = rial_to_toman(stat.latest_rial)?;

    catalog_asset(
        "usd",
        price,
        stat.day_change,
        SECONDARY_MARKET_SOURCE,
        nobitex.fetched_at,
        PriceOrigin::Derived,
    )
}

/// Gold prices converted from the tokenized-ounce market
pub fn gold_from_ounce(nobitex: &NobitexQuotes) -> Option<Vec<PriceAsset>> {
    let stat = nobitex.pair(GOLD_REFERENCE_PAIR)?;
    let gram_24k_rial = stat.latest_rial / GRAMS_PER_TROY_OUNCE;

    let derived = [
        ("gold_24k", gram_24k_rial),
        ("gold_18k", gram_24k_rial * PURITY_18K),
        ("coin_emami", gram_24k_rial * EMAMI_FINE_GRAMS),
    ];

    let assets: Vec<PriceAsset> = derived
        .into_iter()
        .filter_map(|(id, rial)| {
            let price = rial_to_toman(rial)?;
            catalog_asset(
                id,
                price,
                stat.day_change,
                SECONDARY_MARKET_SOURCE,
                nobitex.fetched_at,
                PriceOrigin::Derived,
            )
        })
        .collect();

    (!assets.is_empty()).then_some(assets)
}

/// Last-resort gold records at their fixed reference prices
pub fn gold_sentinels(now: DateTime<Utc>) -> Vec<PriceAsset> {
    [("gold_18k", SENTINEL_GOLD_18K_TOMAN), ("gold_24k", SENTINEL_GOLD_24K_TOMAN)]
        .into_iter()
        .filter_map(|(id, price)| {
            catalog_asset(id, price, 0.0, SYNTHETIC_SOURCE, now, PriceOrigin::Sentinel)
        })
        .collect()
}

/// Gold leg fallback: derived if possible, sentinels otherwise
pub fn synthesize_gold(nobitex: Option<&NobitexQuotes>, now: DateTime<Utc>) -> Vec<PriceAsset> {
    if let Some(derived) = nobitex.and_then(gold_from_ounce) {
        return derived;
    }

    warn!(
        "No live gold reference, using fixed sentinel prices ({} Toman for 18k)",
        SENTINEL_GOLD_18K_TOMAN
    );
    gold_sentinels(now)
}
