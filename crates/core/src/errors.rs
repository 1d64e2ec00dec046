//! Error types

use thiserror::Error;

/// Fetch errors
///
/// Only `AllSourcesExhausted` leaves the aggregator; the rest are recorded per
/// upstream and recovered by falling through direct -> proxy -> fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{source_name} unreachable: {message}")]
    Network { source_name: String, message: String },

    #[error("{source_name} blocked for direct client access")]
    CrossOriginBlocked { source_name: String },

    #[error("{source_name} returned an unusable payload: {message}")]
    UpstreamFormat { source_name: String, message: String },

    #[error("Proxy unavailable for {source_name}: {message}")]
    ProxyUnavailable { source_name: String, message: String },

    #[error("All price sources exhausted ({})", .attempts.join("; "))]
    AllSourcesExhausted { attempts: Vec<String> },
}

impl FetchError {
    pub fn network(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::Network { source_name: source_name.into(), message: message.to_string() }
    }

    pub fn format(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::UpstreamFormat { source_name: source_name.into(), message: message.to_string() }
    }

    pub fn proxy(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::ProxyUnavailable { source_name: source_name.into(), message: message.to_string() }
    }

    /// Short machine-readable kind, used in fetch reports and logs
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network { .. } => "network",
            FetchError::CrossOriginBlocked { .. } => "cross_origin_blocked",
            FetchError::UpstreamFormat { .. } => "upstream_format",
            FetchError::ProxyUnavailable { .. } => "proxy_unavailable",
            FetchError::AllSourcesExhausted { .. } => "all_sources_exhausted",
        }
    }

    /// Whether the error should be surfaced to the user
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::AllSourcesExhausted { .. })
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias
pub type FetchResult<T> = Result<T, FetchError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
