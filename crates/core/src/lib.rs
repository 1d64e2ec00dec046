//! Core types and utilities for the Nerkh price dashboard
//!
//! This crate provides shared types used across all components:
//! - Price asset records and their provenance
//! - The instrument catalog and upstream symbol mappings
//! - Fallback sentinels and fallback-mode detection
//! - Column sorting
//! - Configuration, logging setup and error types

pub mod types;
pub mod catalog;
pub mod fallback;
pub mod sorting;
pub mod config;
pub mod errors;
pub mod logging;

pub use types::*;
pub use catalog::{AssetInfo, HIGH_PRIORITY_IDS};
pub use fallback::*;
pub use sorting::*;
pub use self::config::*;
pub use errors::*;
