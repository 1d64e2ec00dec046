//! Immutable price snapshots
//!
//! Every refresh produces a new [`PriceSnapshot`]; consumers replace the one
//! they display whole, never patch it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nerkh_core::{FallbackStatus, PriceAsset};

use crate::transport::{Route, Upstream};

/// What happened to one upstream during a fetch cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOutcome {
    pub upstream: Upstream,
    /// Route that produced usable data, if any
    pub route: Option<Route>,
    /// Failures along the way, e.g. `direct: cross_origin_blocked`
    pub failures: Vec<String>,
}

/// Provenance details of a fetch cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchReport {
    pub outcomes: Vec<SourceOutcome>,
    /// Ids produced by fallback synthesis
    pub synthesized: Vec<String>,
    pub forced: bool,
}

/// Result of one fetch cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub assets: Vec<PriceAsset>,
    pub fetched_at: DateTime<Utc>,
    pub fallback: FallbackStatus,
    pub report: FetchReport,
}

impl PriceSnapshot {
    pub fn new(assets: Vec<PriceAsset>, fetched_at: DateTime<Utc>, report: FetchReport) -> Self {
        let fallback = FallbackStatus::evaluate(&assets);
        Self { assets, fetched_at, fallback, report }
    }

    pub fn fallback_mode(&self) -> bool {
        self.fallback.is_active()
    }

    pub fn get(&self, id: &str) -> Option<&PriceAsset> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
