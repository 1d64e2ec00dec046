//! Deterministic column sorting
//!
//! Every comparison falls back to `id`, which is unique within a result set,
//! so the ordering is total and descending is exactly ascending reversed.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::PriceAsset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Symbol,
    Price,
    Change,
    Source,
    Updated,
}

impl SortKey {
    pub fn name(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Symbol => "symbol",
            SortKey::Price => "price",
            SortKey::Change => "change",
            SortKey::Source => "source",
            SortKey::Updated => "updated",
        }
    }

    fn compare(&self, a: &PriceAsset, b: &PriceAsset) -> Ordering {
        match self {
            SortKey::Name => a.name_fa.cmp(&b.name_fa),
            SortKey::Symbol => a.symbol.cmp(&b.symbol),
            SortKey::Price => a.price_toman.cmp(&b.price_toman),
            SortKey::Change => a.change_24h.total_cmp(&b.change_24h),
            SortKey::Source => a.source.cmp(&b.source),
            SortKey::Updated => a.last_updated.cmp(&b.last_updated),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "symbol" => Ok(SortKey::Symbol),
            "price" | "pricetoman" => Ok(SortKey::Price),
            "change" | "change24h" => Ok(SortKey::Change),
            "source" => Ok(SortKey::Source),
            "updated" | "lastupdated" => Ok(SortKey::Updated),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction: {other}")),
        }
    }
}

/// Active sort column and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Clicking a column: same column ascending flips to descending, anything else sorts ascending
    pub fn toggle(current: Option<SortConfig>, key: SortKey) -> SortConfig {
        let direction = match current {
            Some(c) if c.key == key && c.direction == SortDirection::Asc => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        SortConfig { key, direction }
    }

    pub fn compare(&self, a: &PriceAsset, b: &PriceAsset) -> Ordering {
        let ordering = self.key.compare(a, b).then_with(|| a.id.cmp(&b.id));
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortConfig {
    type Err = String;

    /// `price`, `price:desc`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, direction) = match s.split_once(':') {
            Some((key, dir)) => (key.parse()?, dir.parse()?),
            None => (s.parse()?, SortDirection::Asc),
        };
        Ok(SortConfig { key, direction })
    }
}

/// Sorted copy of `assets`; `None` keeps the incoming order
pub fn sort_assets(assets: &[PriceAsset], config: Option<SortConfig>) -> Vec<PriceAsset> {
    let mut sorted = assets.to_vec();
    if let Some(config) = config {
        sorted.sort_by(|a, b| config.compare(a, b));
    }
    sorted
}
