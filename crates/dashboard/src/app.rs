//! Dashboard view state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use nerkh_core::{sort_assets, PriceAsset, SortConfig, SortKey, HIGH_PRIORITY_IDS};
use nerkh_price_feed::PriceSnapshot;

use crate::alerts::{AlertError, AlertRequest, PriceAlert};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Grid => ViewMode::List,
            ViewMode::List => ViewMode::Grid,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Grid => write!(f, "grid"),
            ViewMode::List => write!(f, "list"),
        }
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grid" => Ok(ViewMode::Grid),
            "list" | "table" => Ok(ViewMode::List),
            other => Err(format!("unknown view mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// One-shot message shown once, then discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
pub struct AppState {
    /// Replaced whole on every applied refresh
    pub snapshot: Option<Arc<PriceSnapshot>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub loading: bool,
    pub using_cached: bool,
    pub fallback_mode: bool,
    pub view_mode: ViewMode,
    pub sort: Option<SortConfig>,
    pub alerts: Vec<PriceAlert>,
    notification: Option<Notification>,
    in_flight: usize,
    applied_ticket: u64,
}

impl AppState {
    pub fn new(view_mode: ViewMode, sort: Option<SortConfig>) -> Self {
        Self {
            view_mode,
            sort,
            ..Self::default()
        }
    }

    pub fn assets(&self) -> &[PriceAsset] {
        self.snapshot
            .as_deref()
            .map(|s| s.assets.as_slice())
            .unwrap_or(&[])
    }

    /// Full listing in the active sort order
    pub fn sorted_assets(&self) -> Vec<PriceAsset> {
        sort_assets(self.assets(), self.sort)
    }

    /// Headline cards, in listing order
    pub fn high_priority(&self) -> Vec<&PriceAsset> {
        self.assets()
            .iter()
            .filter(|a| HIGH_PRIORITY_IDS.contains(&a.id.as_str()))
            .collect()
    }

    pub fn toggle_sort(&mut self, key: SortKey) -> SortConfig {
        let sort = SortConfig::toggle(self.sort, key);
        self.sort = Some(sort);
        sort
    }

    pub fn toggle_view(&mut self) -> ViewMode {
        self.view_mode = self.view_mode.toggled();
        self.view_mode
    }

    pub fn add_alert(&mut self, request: &AlertRequest) -> Result<Uuid, AlertError> {
        let alert = request.validate(self.snapshot.as_deref())?;
        let id = alert.id;
        self.alerts.push(alert);
        Ok(id)
    }

    pub fn remove_alert(&mut self, id: Uuid) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.id != id);
        self.alerts.len() != before
    }

    /// Alerts whose condition holds for the current snapshot
    pub fn triggered_alerts(&self) -> Vec<(&PriceAlert, &PriceAsset)> {
        self.alerts
            .iter()
            .filter_map(|alert| {
                self.assets()
                    .iter()
                    .find(|a| alert.is_triggered(a))
                    .map(|asset| (alert, asset))
            })
            .collect()
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notification = Some(notification);
    }

    pub fn take_notification(&mut self) -> Option<Notification> {
        self.notification.take()
    }

    pub fn applied_ticket(&self) -> u64 {
        self.applied_ticket
    }

    pub(crate) fn begin_fetch(&mut self) {
        self.in_flight += 1;
        self.loading = true;
    }

    pub(crate) fn end_fetch(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.loading = self.in_flight > 0;
    }

    pub(crate) fn apply_snapshot(&mut self, snapshot: PriceSnapshot, ticket: u64) {
        self.last_updated = Some(snapshot.fetched_at);
        self.fallback_mode = snapshot.fallback_mode();
        self.using_cached = false;
        self.snapshot = Some(Arc::new(snapshot));
        self.applied_ticket = ticket;
    }

    pub(crate) fn mark_cached(&mut self, stamp: Option<DateTime<Utc>>) {
        self.using_cached = true;
        if stamp.is_some() {
            self.last_updated = stamp;
        }
    }
}
