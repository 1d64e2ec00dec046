//! Terminal dashboard for Nerkh prices
//!
//! Holds the view state, decides when a refresh may reuse the displayed
//! snapshot, and renders cards, tables and alert status as plain text.

pub mod alerts;
pub mod app;
pub mod commands;
pub mod controller;
pub mod render;

pub use alerts::{AlertDirection, AlertError, AlertRequest, PriceAlert};
pub use app::{AppState, Notification, NotificationLevel, ViewMode};
pub use commands::Command;
pub use controller::{RefreshController, RefreshOutcome, SnapshotProvider};
