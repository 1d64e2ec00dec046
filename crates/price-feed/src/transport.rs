//! HTTP transport for upstream and proxy requests

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use nerkh_core::{FetchError, FetchResult};

/// Upstream market-data APIs, named as the proxy's `source` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Upstream {
    /// Fiat, gold and coin quotes in Toman
    Brsapi,
    /// Crypto market stats in Rial
    Nobitex,
}

impl Upstream {
    pub fn name(&self) -> &'static str {
        match self {
            Upstream::Brsapi => "brsapi",
            Upstream::Nobitex => "nobitex",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, Upstream::Brsapi)
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a request reaches its upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Direct,
    Proxy,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Direct => write!(f, "direct"),
            Route::Proxy => write!(f, "proxy"),
        }
    }
}

/// A single GET for JSON
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub upstream: Upstream,
    pub route: Route,
    pub url: String,
    pub query: Vec<(String, String)>,
    /// Ask intermediaries not to serve a cached response
    pub bypass_cache: bool,
}

/// Anything that can perform an [`UpstreamRequest`]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, request: &UpstreamRequest) -> FetchResult<serde_json::Value>;
}

/// Error body returned by the proxy
#[derive(Debug, Deserialize)]
struct ProxyErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nerkh/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    fn unreachable(request: &UpstreamRequest, message: impl ToString) -> FetchError {
        match request.route {
            Route::Direct => FetchError::network(request.upstream.name(), message),
            Route::Proxy => FetchError::proxy(request.upstream.name(), message),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, request: &UpstreamRequest) -> FetchResult<serde_json::Value> {
        debug!("GET {} ({} via {})", request.url, request.upstream, request.route);

        let mut builder = self.client.get(&request.url).query(&request.query);
        if request.bypass_cache {
            builder = builder.header(reqwest::header::CACHE_CONTROL, "no-cache");
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::unreachable(request, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::unreachable(request, e))?;

        if !status.is_success() {
            let message = match serde_json::from_slice::<ProxyErrorBody>(&body) {
                Ok(err) => match err.details {
                    Some(details) => format!("HTTP {}: {} ({})", status.as_u16(), err.error, details),
                    None => format!("HTTP {}: {}", status.as_u16(), err.error),
                },
                Err(_) => format!("HTTP {}", status.as_u16()),
            };
            return Err(Self::unreachable(request, message));
        }

        serde_json::from_slice(&body).map_err(|e| FetchError::format(request.upstream.name(), e))
    }
}
