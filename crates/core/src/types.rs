//! Core type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instrument category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Currency,
    Gold,
    Coin,
    Crypto,
}

impl AssetType {
    pub fn name(&self) -> &'static str {
        match self {
            AssetType::Currency => "currency",
            AssetType::Gold => "gold",
            AssetType::Coin => "coin",
            AssetType::Crypto => "crypto",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a price was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceOrigin {
    /// Quoted directly by an upstream
    #[default]
    Live,
    /// Computed from another live quote (e.g. USD from USDT)
    Derived,
    /// Fixed reference constant, not market data
    Sentinel,
}

impl PriceOrigin {
    pub fn is_fallback(&self) -> bool {
        !matches!(self, PriceOrigin::Live)
    }
}

/// One row per tracked instrument, priced in Toman
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAsset {
    pub id: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub name_fa: String,
    pub symbol: String,
    pub price_toman: u64,
    #[serde(rename = "change24h")]
    pub change_24h: f64,
    pub source: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub origin: PriceOrigin,
}

impl PriceAsset {
    pub fn is_fallback(&self) -> bool {
        self.origin.is_fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PriceAsset {
        PriceAsset {
            id: "gold_18k".to_string(),
            asset_type: AssetType::Gold,
            name_fa: "طلای ۱۸ عیار".to_string(),
            symbol: "GOLD18K".to_string(),
            price_toman: 4_500_000,
            change_24h: -0.25,
            source: "nerkh.io".to_string(),
            last_updated: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            origin: PriceOrigin::Sentinel,
        }
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(sample()).unwrap();

        assert_eq!(json["type"], "gold");
        assert_eq!(json["nameFa"], "طلای ۱۸ عیار");
        assert_eq!(json["priceToman"], 4_500_000);
        assert_eq!(json["change24h"], -0.25);
        assert_eq!(json["origin"], "sentinel");
        assert!(json["lastUpdated"].as_str().unwrap().starts_with("2023-11-14T"));
    }

    #[test]
    fn test_origin_defaults_to_live() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json.as_object_mut().unwrap().remove("origin");

        let asset: PriceAsset = serde_json::from_value(json).unwrap();
        assert_eq!(asset.origin, PriceOrigin::Live);
        assert!(!asset.is_fallback());
    }
}
