//! Upstream payload normalization
//!
//! brsapi and nobitex return differently shaped JSON; both are reduced to
//! [`PriceAsset`] records here. Items that can't be mapped or parsed are
//! skipped, a payload with nothing usable is an `UpstreamFormat` error.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use nerkh_core::catalog::{self, AssetInfo};
use nerkh_core::{FetchError, FetchResult, PriceAsset, PriceOrigin};

use crate::transport::Upstream;

/// Rial per Toman
const RIAL_PER_TOMAN: u32 = 10;

/// A number that upstreams send either as JSON number or numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(serde_json::Number),
    Text(String),
}

impl Numeric {
    fn to_decimal(&self) -> Option<Decimal> {
        let text = match self {
            Numeric::Number(n) => n.to_string(),
            Numeric::Text(s) => s.trim().trim_end_matches('%').replace(',', ""),
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .ok()
    }

    fn to_f64(&self) -> Option<f64> {
        self.to_decimal().and_then(|d| d.to_f64())
    }
}

/// Round to the nearest whole Toman, rejecting negatives
pub fn whole_toman(value: Decimal) -> Option<u64> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
}

/// Convert a Rial amount to whole Toman
pub fn rial_to_toman(rial: Decimal) -> Option<u64> {
    whole_toman(rial / Decimal::from(RIAL_PER_TOMAN))
}

fn build_asset(
    info: &AssetInfo,
    price_toman: u64,
    change_24h: f64,
    source: &str,
    last_updated: DateTime<Utc>,
    origin: PriceOrigin,
) -> PriceAsset {
    PriceAsset {
        id: info.id.to_string(),
        asset_type: info.asset_type,
        name_fa: info.name_fa.to_string(),
        symbol: info.symbol.to_string(),
        price_toman,
        change_24h,
        source: source.to_string(),
        last_updated,
        origin,
    }
}

/// Build a record for a cataloged id
pub fn catalog_asset(
    id: &str,
    price_toman: u64,
    change_24h: f64,
    source: &str,
    last_updated: DateTime<Utc>,
    origin: PriceOrigin,
) -> Option<PriceAsset> {
    catalog::asset_info(id)
        .map(|info| build_asset(info, price_toman, change_24h, source, last_updated, origin))
}

// ---------------------------------------------------------------------------
// brsapi
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BrsapiItem {
    symbol: String,
    price: Numeric,
    #[serde(default)]
    change_percent: Option<Numeric>,
    /// Epoch seconds; `date` and `time` are Solar Hijri display text and ignored
    #[serde(default)]
    time_unix: Option<Numeric>,
}

#[derive(Debug, Deserialize)]
struct BrsapiPayload {
    #[serde(default)]
    currency: Option<Vec<Value>>,
    #[serde(default)]
    gold: Option<Vec<Value>>,
}

/// Normalized brsapi quotes
#[derive(Debug, Clone, Default)]
pub struct BrsapiQuotes {
    pub assets: Vec<PriceAsset>,
}

impl BrsapiQuotes {
    pub fn has(&self, id: &str) -> bool {
        self.assets.iter().any(|a| a.id == id)
    }
}

pub fn parse_brsapi(payload: &Value, fetched_at: DateTime<Utc>) -> FetchResult<BrsapiQuotes> {
    let source = Upstream::Brsapi.name();

    let parsed: BrsapiPayload =
        serde_json::from_value(payload.clone()).map_err(|e| FetchError::format(source, e))?;

    if parsed.currency.is_none() && parsed.gold.is_none() {
        return Err(FetchError::format(source, "no currency or gold section"));
    }

    let items = parsed
        .currency
        .into_iter()
        .flatten()
        .chain(parsed.gold.into_iter().flatten());

    let mut assets = Vec::new();
    for raw in items {
        let item: BrsapiItem = match serde_json::from_value(raw) {
            Ok(item) => item,
            Err(e) => {
                debug!("Skipping malformed brsapi item: {}", e);
                continue;
            }
        };

        let Some(info) = catalog::brsapi_asset(&item.symbol) else {
            debug!("Skipping unmapped brsapi symbol {}", item.symbol);
            continue;
        };

        let Some(price) = item.price.to_decimal().and_then(whole_toman) else {
            debug!("Skipping brsapi {} with unusable price", item.symbol);
            continue;
        };

        let change = item
            .change_percent
            .as_ref()
            .and_then(Numeric::to_f64)
            .unwrap_or(0.0);

        let last_updated = item
            .time_unix
            .as_ref()
            .and_then(Numeric::to_decimal)
            .and_then(|t| t.to_i64())
            .and_then(|t| DateTime::from_timestamp(t, 0))
            .unwrap_or(fetched_at);

        assets.push(build_asset(info, price, change, source, last_updated, PriceOrigin::Live));
    }

    if assets.is_empty() {
        return Err(FetchError::format(source, "no recognizable quotes"));
    }

    Ok(BrsapiQuotes { assets })
}

// ---------------------------------------------------------------------------
// nobitex
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NobitexStat {
    #[serde(default)]
    latest: Option<Numeric>,
    #[serde(default)]
    day_change: Option<Numeric>,
    #[serde(default)]
    is_closed: bool,
}

#[derive(Debug, Deserialize)]
struct NobitexPayload {
    #[serde(default)]
    status: Option<String>,
    stats: HashMap<String, Value>,
}

/// Last trade and daily change of one market pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairStat {
    pub latest_rial: Decimal,
    pub day_change: f64,
}

/// Normalized nobitex quotes
#[derive(Debug, Clone, Default)]
pub struct NobitexQuotes {
    /// Cataloged crypto records
    pub assets: Vec<PriceAsset>,
    /// Every parsed pair, including reference pairs that aren't displayed
    pub pairs: HashMap<String, PairStat>,
    pub fetched_at: DateTime<Utc>,
}

impl NobitexQuotes {
    pub fn pair(&self, name: &str) -> Option<&PairStat> {
        self.pairs.get(name)
    }
}

pub fn parse_nobitex(payload: &Value, fetched_at: DateTime<Utc>) -> FetchResult<NobitexQuotes> {
    let source = Upstream::Nobitex.name();

    let parsed: NobitexPayload =
        serde_json::from_value(payload.clone()).map_err(|e| FetchError::format(source, e))?;

    if let Some(status) = &parsed.status {
        if status != "ok" {
            return Err(FetchError::format(source, format!("status {status}")));
        }
    }

    let mut pairs = HashMap::new();
    for (name, raw) in parsed.stats {
        let stat: NobitexStat = match serde_json::from_value(raw) {
            Ok(stat) => stat,
            Err(e) => {
                debug!("Skipping malformed nobitex pair {}: {}", name, e);
                continue;
            }
        };

        if stat.is_closed {
            continue;
        }

        let Some(latest) = stat.latest.as_ref().and_then(Numeric::to_decimal) else {
            continue;
        };
        if latest <= Decimal::ZERO {
            continue;
        }

        let day_change = stat.day_change.as_ref().and_then(Numeric::to_f64).unwrap_or(0.0);
        pairs.insert(name.to_lowercase(), PairStat { latest_rial: latest, day_change });
    }

    let mut assets = Vec::new();
    for (name, stat) in &pairs {
        let Some(info) = catalog::nobitex_asset(name) else {
            continue;
        };
        if let Some(price) = rial_to_toman(stat.latest_rial) {
            assets.push(build_asset(info, price, stat.day_change, source, fetched_at, PriceOrigin::Live));
        }
    }

    if pairs.is_empty() {
        return Err(FetchError::format(source, "no open markets in stats"));
    }

    // HashMap iteration order is arbitrary
    assets.sort_by_key(|a| catalog::display_position(&a.id));

    Ok(NobitexQuotes { assets, pairs, fetched_at })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nerkh_core::AssetType;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_brsapi_mixed_number_shapes() {
        let payload = json!({
            "gold": [
                { "symbol": "IR_GOLD_18K", "name": "طلای 18 عیار", "price": 4_120_500, "change_percent": -0.35 },
                { "symbol": "IR_COIN_EMAMI", "name": "سکه امامی", "price": "41,250,000", "change_percent": "1.2" }
            ],
            "currency": [
                { "symbol": "USD", "name": "دلار", "price": "58000", "change_percent": 0.5, "time_unix": 1_700_000_600 },
                { "symbol": "XYZ", "name": "unknown", "price": 1 }
            ],
            "cryptocurrency": []
        });

        let quotes = parse_brsapi(&payload, now()).unwrap();
        assert_eq!(quotes.assets.len(), 3);

        let usd = quotes.assets.iter().find(|a| a.id == "usd").unwrap();
        assert_eq!(usd.asset_type, AssetType::Currency);
        assert_eq!(usd.price_toman, 58_000);
        assert_eq!(usd.source, "brsapi");
        assert_eq!(usd.last_updated.timestamp(), 1_700_000_600);

        let gold: Vec<_> = quotes
            .assets
            .iter()
            .filter(|a| a.id != "usd")
            .map(|a| (a.id.as_str(), a.price_toman))
            .collect();
        assert_eq!(gold, vec![("gold_18k", 4_120_500), ("coin_emami", 41_250_000)]);
        assert!(quotes.has("gold_18k"));
    }

    #[test]
    fn test_brsapi_item_timestamps() {
        // `date`/`time` are Solar Hijri display strings; only `time_unix` is a timestamp
        let payload = json!({
            "currency": [
                { "symbol": "USD", "price": 58000, "date": "1403/08/24", "time": "01:50", "time_unix": 1_700_000_600 },
                { "symbol": "EUR", "price": 62000, "date": "1403/08/24", "time": "01:45" },
                { "symbol": "GBP", "price": 73000, "time_unix": "soon" }
            ]
        });

        let quotes = parse_brsapi(&payload, now()).unwrap();
        let stamps: Vec<_> = quotes
            .assets
            .iter()
            .map(|a| (a.id.as_str(), a.last_updated.timestamp()))
            .collect();
        assert_eq!(
            stamps,
            vec![("usd", 1_700_000_600), ("eur", now().timestamp()), ("gbp", now().timestamp())]
        );
    }

    #[test]
    fn test_brsapi_skips_negative_and_garbage_prices() {
        let payload = json!({
            "currency": [
                { "symbol": "USD", "price": -5 },
                { "symbol": "EUR", "price": "n/a" },
                { "symbol": "GBP", "price": 73000.6 }
            ]
        });

        let quotes = parse_brsapi(&payload, now()).unwrap();
        assert_eq!(quotes.assets.len(), 1);
        assert_eq!(quotes.assets[0].id, "gbp");
        assert_eq!(quotes.assets[0].price_toman, 73_001);
    }

    #[test]
    fn test_brsapi_rejects_unusable_payloads() {
        let err = parse_brsapi(&json!({ "message": "invalid key" }), now()).unwrap_err();
        assert_eq!(err.kind(), "upstream_format");

        let err = parse_brsapi(&json!({ "currency": [{ "symbol": "ZZZ", "price": 1 }] }), now()).unwrap_err();
        assert_eq!(err.kind(), "upstream_format");

        assert!(parse_brsapi(&json!([1, 2, 3]), now()).is_err());
    }

    #[test]
    fn test_nobitex_converts_rial_to_toman() {
        let payload = json!({
            "status": "ok",
            "stats": {
                "btc-rls": { "isClosed": false, "latest": "39000000000", "dayChange": "2.15" },
                "usdt-rls": { "isClosed": false, "latest": "580005", "dayChange": "-0.4" },
                "paxg-rls": { "isClosed": false, "latest": "1500000000", "dayChange": "0.8" },
                "eth-rls": { "isClosed": true, "latest": "1" },
                "doge-rls": { "isClosed": false, "latest": "0" }
            }
        });

        let quotes = parse_nobitex(&payload, now()).unwrap();
        let ids: Vec<_> = quotes.assets.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["btc", "usdt"]);

        assert_eq!(quotes.assets[0].price_toman, 3_900_000_000);
        assert_eq!(quotes.assets[1].price_toman, 58_001);
        assert!((quotes.assets[1].change_24h + 0.4).abs() < 1e-9);

        // Reference pairs are kept even though they aren't displayed
        assert!(quotes.pair("paxg-rls").is_some());
        assert!(quotes.pair("eth-rls").is_none());
    }

    #[test]
    fn test_nobitex_rejects_failed_status() {
        let err = parse_nobitex(&json!({ "status": "failed", "stats": {} }), now()).unwrap_err();
        assert_eq!(err.kind(), "upstream_format");

        let err = parse_nobitex(&json!({ "status": "ok", "stats": {} }), now()).unwrap_err();
        assert_eq!(err.kind(), "upstream_format");

        assert!(parse_nobitex(&json!({ "status": "ok" }), now()).is_err());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(rial_to_toman(Decimal::from(580_005)), Some(58_001));
        assert_eq!(rial_to_toman(Decimal::from(580_004)), Some(58_000));
        assert_eq!(whole_toman(Decimal::from(-1)), None);
    }
}
