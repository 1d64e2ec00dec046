//! Fallback sentinels and fallback-mode detection
//!
//! A result set is in fallback mode when either leg degraded:
//! - the `usd` record was re-derived from the stablecoin market, or
//! - a gold record carries the synthetic source at its fixed reference price.
//!
//! Records also carry an explicit [`PriceOrigin`](crate::PriceOrigin), which is
//! checked alongside the source/sentinel pattern.

use serde::{Deserialize, Serialize};

use crate::{AssetType, PriceAsset};

/// Source tag of the secondary market used to derive the USD rate
pub const SECONDARY_MARKET_SOURCE: &str = "nobitex";

/// Source tag of prices synthesized locally from reference constants
pub const SYNTHETIC_SOURCE: &str = "nerkh.io";

/// Reference price of one gram of 18k gold, used only when nothing live is available
pub const SENTINEL_GOLD_18K_TOMAN: u64 = 4_500_000;

/// Reference price of one gram of 24k gold (18k reference / 0.75)
pub const SENTINEL_GOLD_24K_TOMAN: u64 = 6_000_000;

/// Fixed reference constant for a gold id, if one exists
pub fn sentinel_price(id: &str) -> Option<u64> {
    match id {
        "gold_18k" => Some(SENTINEL_GOLD_18K_TOMAN),
        "gold_24k" => Some(SENTINEL_GOLD_24K_TOMAN),
        _ => None,
    }
}

/// True when the record is a gold sentinel: synthetic source at its exact reference price
pub fn is_gold_sentinel(asset: &PriceAsset) -> bool {
    asset.asset_type == AssetType::Gold
        && asset.source == SYNTHETIC_SOURCE
        && sentinel_price(&asset.id) == Some(asset.price_toman)
}

/// Breakdown of why a result set is (or is not) in fallback mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackStatus {
    /// `usd` was derived from the secondary market
    pub usd_substituted: bool,
    /// At least one gold record is a sentinel
    pub gold_sentinel: bool,
    /// Ids whose origin flag is not live
    pub flagged: Vec<String>,
}

impl FallbackStatus {
    pub fn evaluate(assets: &[PriceAsset]) -> Self {
        let usd_substituted = assets
            .iter()
            .find(|a| a.id == "usd")
            .is_some_and(|usd| usd.source == SECONDARY_MARKET_SOURCE);

        let gold_sentinel = assets.iter().any(is_gold_sentinel);

        let flagged = assets
            .iter()
            .filter(|a| a.is_fallback())
            .map(|a| a.id.clone())
            .collect();

        Self { usd_substituted, gold_sentinel, flagged }
    }

    pub fn is_active(&self) -> bool {
        self.usd_substituted || self.gold_sentinel || !self.flagged.is_empty()
    }
}

/// Fallback-mode detection over a returned result set
pub fn detect_fallback_mode(assets: &[PriceAsset]) -> bool {
    FallbackStatus::evaluate(assets).is_active()
}
