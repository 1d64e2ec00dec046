//! Price aggregator - merges upstream quotes into one asset list
//!
//! Each upstream is tried directly, then through the proxy. Legs that stay
//! empty (the dollar rate, gold) are filled by fallback synthesis, as long as
//! at least one upstream answered.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use nerkh_core::catalog::NOBITEX_MARKETS;
use nerkh_core::{FetchError, FetchResult, NerkhConfig, PriceAsset, UpstreamConfig};

use crate::fallback;
use crate::feeds::{parse_brsapi, parse_nobitex};
use crate::merge::merge_assets;
use crate::state::{FetchReport, PriceSnapshot, SourceOutcome};
use crate::store::{FileStampStore, StampStore};
use crate::transport::{HttpTransport, Route, Transport, Upstream, UpstreamRequest};

/// Aggregator configuration
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub brsapi: UpstreamConfig,
    pub nobitex: UpstreamConfig,
    /// Relay endpoint; `None` means there is no proxy to fall back to
    pub proxy_url: Option<String>,
    pub request_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self::from(&NerkhConfig::default())
    }
}

impl From<&NerkhConfig> for AggregatorConfig {
    fn from(config: &NerkhConfig) -> Self {
        Self {
            brsapi: config.sources.brsapi.clone(),
            nobitex: config.sources.nobitex.clone(),
            proxy_url: config.proxy.url.clone(),
            request_timeout: config.fetch.request_timeout(),
        }
    }
}

/// Main price aggregator
pub struct PriceAggregator {
    config: AggregatorConfig,
    transport: Arc<dyn Transport>,
    stamps: Arc<dyn StampStore>,
}

impl PriceAggregator {
    pub fn new(
        config: AggregatorConfig,
        transport: Arc<dyn Transport>,
        stamps: Arc<dyn StampStore>,
    ) -> Self {
        Self { config, transport, stamps }
    }

    /// HTTP transport and file-backed stamp store from application config
    pub fn from_config(config: &NerkhConfig) -> anyhow::Result<Self> {
        let aggregator_config = AggregatorConfig::from(config);
        let transport = HttpTransport::new(aggregator_config.request_timeout)?;
        let stamps = FileStampStore::new(Path::new(&config.storage.state_path));

        Ok(Self::new(aggregator_config, Arc::new(transport), Arc::new(stamps)))
    }

    /// Shared stamp store reference
    pub fn stamps(&self) -> Arc<dyn StampStore> {
        Arc::clone(&self.stamps)
    }

    /// Completion time of the last successful fetch, if one was recorded
    pub fn last_fetch_ms(&self) -> Option<i64> {
        match self.stamps.load() {
            Ok(stamp) => stamp,
            Err(e) => {
                warn!("Failed to read last fetch time: {}", e);
                None
            }
        }
    }

    /// Fetch, normalize and merge prices from every upstream
    pub async fn fetch_asset_prices(&self, force_refresh: bool) -> FetchResult<Vec<PriceAsset>> {
        self.fetch_snapshot(force_refresh).await.map(|s| s.assets)
    }

    /// Like [`fetch_asset_prices`](Self::fetch_asset_prices), with provenance and timing metadata
    pub async fn fetch_snapshot(&self, force_refresh: bool) -> FetchResult<PriceSnapshot> {
        let start = Instant::now();
        info!("Fetching prices (force_refresh={})", force_refresh);

        let ((brsapi, brsapi_outcome), (nobitex, nobitex_outcome)) = tokio::join!(
            self.fetch_upstream(Upstream::Brsapi, force_refresh, parse_brsapi),
            self.fetch_upstream(Upstream::Nobitex, force_refresh, parse_nobitex),
        );

        let mut report = FetchReport {
            outcomes: vec![brsapi_outcome, nobitex_outcome],
            synthesized: vec![],
            forced: force_refresh,
        };

        if brsapi.is_none() && nobitex.is_none() {
            let attempts: Vec<String> = report
                .outcomes
                .iter()
                .flat_map(|o| o.failures.iter().map(move |f| format!("{}/{}", o.upstream, f)))
                .collect();
            error!("All price sources exhausted: {}", attempts.join(", "));
            return Err(FetchError::AllSourcesExhausted { attempts });
        }

        let fetched_at = Utc::now();
        let mut live: Vec<PriceAsset> = Vec::new();
        let mut synthesized: Vec<PriceAsset> = Vec::new();

        if let Some(quotes) = &brsapi {
            live.extend(quotes.assets.iter().cloned());
        }
        if let Some(quotes) = &nobitex {
            live.extend(quotes.assets.iter().cloned());
        }

        if !brsapi.as_ref().is_some_and(|q| q.has("usd")) {
            match nobitex.as_ref().and_then(fallback::usd_from_stablecoin) {
                Some(usd) => {
                    warn!("USD rate unavailable, derived from USDT: {} Toman", usd.price_toman);
                    synthesized.push(usd);
                }
                None => warn!("USD rate unavailable from every source"),
            }
        }

        if !brsapi.as_ref().is_some_and(|q| q.has("gold_18k")) {
            warn!("Gold quotes unavailable, synthesizing");
            synthesized.extend(fallback::synthesize_gold(nobitex.as_ref(), fetched_at));
        }

        report.synthesized = synthesized.iter().map(|a| a.id.clone()).collect();
        let assets = merge_assets(live.into_iter().chain(synthesized));
        let snapshot = PriceSnapshot::new(assets, fetched_at, report);

        self.record_completion(fetched_at);

        info!(
            "Fetched {} assets in {:?} (fallback_mode={})",
            snapshot.len(),
            start.elapsed(),
            snapshot.fallback_mode()
        );

        Ok(snapshot)
    }

    fn record_completion(&self, fetched_at: DateTime<Utc>) {
        if let Err(e) = self.stamps.save(fetched_at.timestamp_millis()) {
            warn!("Failed to persist last fetch time: {}", e);
        }
    }

    /// Direct, then proxy; the first route whose payload parses wins
    async fn fetch_upstream<T>(
        &self,
        upstream: Upstream,
        force_refresh: bool,
        parse: fn(&Value, DateTime<Utc>) -> FetchResult<T>,
    ) -> (Option<T>, SourceOutcome) {
        let mut outcome = SourceOutcome {
            upstream,
            route: None,
            failures: vec![],
        };

        for route in [Route::Direct, Route::Proxy] {
            let attempt = match self.build_request(upstream, route, force_refresh) {
                Ok(request) => match self.transport.get_json(&request).await {
                    Ok(body) => parse(&body, Utc::now()),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };

            match attempt {
                Ok(quotes) => {
                    debug!("{} answered via {}", upstream, route);
                    outcome.route = Some(route);
                    return (Some(quotes), outcome);
                }
                Err(e) => {
                    warn!("{} via {} failed: {}", upstream, route, e);
                    outcome.failures.push(format!("{}: {}", route, e.kind()));
                }
            }
        }

        (None, outcome)
    }

    fn upstream_config(&self, upstream: Upstream) -> &UpstreamConfig {
        match upstream {
            Upstream::Brsapi => &self.config.brsapi,
            Upstream::Nobitex => &self.config.nobitex,
        }
    }

    fn build_request(
        &self,
        upstream: Upstream,
        route: Route,
        force_refresh: bool,
    ) -> FetchResult<UpstreamRequest> {
        let upstream_config = self.upstream_config(upstream);
        let api_key = upstream_config
            .api_key
            .as_ref()
            .filter(|_| upstream.requires_api_key());

        let mut query: Vec<(String, String)> = Vec::new();

        let url = match route {
            Route::Direct => {
                if upstream_config.direct_blocked {
                    return Err(FetchError::CrossOriginBlocked {
                        source_name: upstream.name().to_string(),
                    });
                }
                if let Some(key) = api_key {
                    query.push(("key".into(), key.clone()));
                }
                upstream_config.url.clone()
            }
            Route::Proxy => {
                let url = self
                    .config
                    .proxy_url
                    .clone()
                    .ok_or_else(|| FetchError::proxy(upstream.name(), "no proxy configured"))?;
                query.push(("source".into(), upstream.name().into()));
                if let Some(key) = api_key {
                    query.push(("apiKey".into(), key.clone()));
                }
                url
            }
        };

        if upstream == Upstream::Nobitex {
            query.push(("srcCurrency".into(), NOBITEX_MARKETS.into()));
            query.push(("dstCurrency".into(), "rls".into()));
        }

        Ok(UpstreamRequest {
            upstream,
            route,
            url,
            query,
            bypass_cache: force_refresh,
        })
    }
}
