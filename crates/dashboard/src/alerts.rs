//! Price alerts submitted from the alert form

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use nerkh_core::PriceAsset;
use nerkh_price_feed::PriceSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertError {
    #[error("No prices loaded yet")]
    NoPrices,

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Threshold must be positive")]
    NonPositiveThreshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    #[default]
    Above,
    Below,
}

impl AlertDirection {
    pub fn name(&self) -> &'static str {
        match self {
            AlertDirection::Above => "above",
            AlertDirection::Below => "below",
        }
    }
}

impl fmt::Display for AlertDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AlertDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "above" | ">" => Ok(AlertDirection::Above),
            "below" | "<" => Ok(AlertDirection::Below),
            other => Err(format!("unknown alert direction: {other}")),
        }
    }
}

/// Raw form input, threshold as typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRequest {
    pub asset_id: String,
    pub threshold: String,
    pub direction: AlertDirection,
}

impl AlertRequest {
    pub fn new(
        asset_id: impl Into<String>,
        threshold: impl Into<String>,
        direction: AlertDirection,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            threshold: threshold.into(),
            direction,
        }
    }

    /// Check the request against the displayed prices
    pub fn validate(&self, snapshot: Option<&PriceSnapshot>) -> Result<PriceAlert, AlertError> {
        let snapshot = snapshot.filter(|s| !s.is_empty()).ok_or(AlertError::NoPrices)?;

        let asset_id = self.asset_id.trim().to_lowercase();
        if snapshot.get(&asset_id).is_none() {
            return Err(AlertError::UnknownAsset(self.asset_id.clone()));
        }

        let threshold_toman = parse_threshold(&self.threshold)?;

        Ok(PriceAlert {
            id: Uuid::new_v4(),
            asset_id,
            threshold_toman,
            direction: self.direction,
            created_at: Utc::now(),
        })
    }
}

/// Accepts digit grouping with `,` or `_`
fn parse_threshold(raw: &str) -> Result<u64, AlertError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();

    let value: i64 = cleaned
        .parse()
        .map_err(|_| AlertError::InvalidThreshold(raw.to_string()))?;

    if value <= 0 {
        return Err(AlertError::NonPositiveThreshold);
    }
    Ok(value as u64)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: Uuid,
    pub asset_id: String,
    pub threshold_toman: u64,
    pub direction: AlertDirection,
    pub created_at: DateTime<Utc>,
}

impl PriceAlert {
    pub fn is_triggered(&self, asset: &PriceAsset) -> bool {
        if asset.id != self.asset_id {
            return false;
        }
        match self.direction {
            AlertDirection::Above => asset.price_toman >= self.threshold_toman,
            AlertDirection::Below => asset.price_toman <= self.threshold_toman,
        }
    }
}
