//! Request handling: validate, relay upstream JSON verbatim, attach CORS headers

use axum::extract::{Query, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use nerkh_core::NerkhConfig;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Client-Info, Apikey";

/// Query parameters forwarded to nobitex as-is
const NOBITEX_PASSTHROUGH: &[&str] = &["srcCurrency", "dstCurrency"];

/// Upstream endpoints the relay talks to
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub brsapi_url: String,
    pub nobitex_url: String,
    pub timeout: Duration,
}

impl From<&NerkhConfig> for RelayConfig {
    fn from(config: &NerkhConfig) -> Self {
        Self {
            brsapi_url: config.sources.brsapi.url.clone(),
            nobitex_url: config.sources.nobitex.url.clone(),
            timeout: config.fetch.request_timeout(),
        }
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct RelayState {
    config: Arc<RelayConfig>,
    client: reqwest::Client,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("API key required")]
    MissingApiKey,

    #[error("Invalid source")]
    InvalidSource,

    #[error("Failed to fetch prices")]
    Upstream(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let error = self.to_string();
        match self {
            RelayError::MissingApiKey | RelayError::InvalidSource => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": error }))).into_response()
            }
            RelayError::Upstream(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error, "details": details })),
            )
                .into_response(),
        }
    }
}

/// Router serving the relay at `/` and `/fetch-prices`
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(relay).options(preflight))
        .route("/fetch-prices", get(relay).options(preflight))
        .layer(middleware::map_response(add_cors_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn add_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(ALLOW_ORIGIN));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    response
}

async fn relay(
    State(state): State<RelayState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, RelayError> {
    let (url, query) = match params.get("source").map(String::as_str) {
        Some("brsapi") => {
            let api_key = params
                .get("apiKey")
                .filter(|k| !k.is_empty())
                .ok_or(RelayError::MissingApiKey)?;
            (
                state.config.brsapi_url.as_str(),
                vec![("key".to_string(), api_key.clone())],
            )
        }
        Some("nobitex") => {
            let query = NOBITEX_PASSTHROUGH
                .iter()
                .filter_map(|k| params.get(*k).map(|v| (k.to_string(), v.clone())))
                .collect();
            (state.config.nobitex_url.as_str(), query)
        }
        _ => return Err(RelayError::InvalidSource),
    };

    debug!("Relaying to {}", url);

    let fetched = async {
        state
            .client
            .get(url)
            .query(&query)
            .send()
            .await?
            .json::<Value>()
            .await
    }
    .await;

    match fetched {
        Ok(body) => Ok(Json(body)),
        Err(e) => {
            error!("Error fetching prices: {}", e);
            Err(RelayError::Upstream(e.to_string()))
        }
    }
}
