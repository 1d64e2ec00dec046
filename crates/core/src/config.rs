//! Configuration types
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `nerkh.toml` (or the file passed explicitly), then `NERKH__*` environment
//! variables, e.g. `NERKH__PROXY__URL=https://edge.example.com/fetch-prices`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{ConfigError, ConfigResult};

/// One upstream market-data API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub url: String,
    pub api_key: Option<String>,
    /// Direct client calls are known to be refused (e.g. cross-origin policy)
    pub direct_blocked: bool,
}

impl UpstreamConfig {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            api_key: None,
            direct_blocked: false,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self::new("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub brsapi: UpstreamConfig,
    pub nobitex: UpstreamConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            brsapi: UpstreamConfig::new("https://brsapi.ir/Api/Market/Gold_Currency.php"),
            nobitex: UpstreamConfig::new("https://api.nobitex.ir/market/stats"),
        }
    }
}

/// Server-side relay used when direct access fails
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub request_timeout_ms: u64,
    pub refresh_interval_secs: u64,
    pub cache_window_secs: u64,
}

impl FetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn cache_window(&self) -> Duration {
        Duration::from_secs(self.cache_window_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            refresh_interval_secs: 30 * 60,
            cache_window_secs: 30 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// File holding the persisted last-fetch stamp
    pub state_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: "nerkh-state.json".to_string(),
        }
    }
}

/// Proxy server bind address
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NerkhConfig {
    pub sources: SourcesConfig,
    pub proxy: ProxyConfig,
    pub fetch: FetchConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl NerkhConfig {
    /// Load defaults, then the config file, then `NERKH__*` environment overrides
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("nerkh").required(false),
        };

        let loaded: NerkhConfig = config::Config::builder()
            .add_source(config::Config::try_from(&NerkhConfig::default())?)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("NERKH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for (name, upstream) in [("brsapi", &self.sources.brsapi), ("nobitex", &self.sources.nobitex)] {
            if upstream.url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("sources.{name}.url is empty")));
            }
        }

        if let Some(url) = &self.proxy.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!("proxy.url must be http(s): {url}")));
            }
        }

        if self.fetch.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("fetch.request_timeout_ms must be > 0".into()));
        }
        if self.fetch.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid("fetch.refresh_interval_secs must be > 0".into()));
        }
        if self.fetch.cache_window_secs == 0 {
            return Err(ConfigError::Invalid("fetch.cache_window_secs must be > 0".into()));
        }

        Ok(())
    }
}
