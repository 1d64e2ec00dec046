//! Refresh orchestration for the dashboard
//!
//! A refresh either reuses the displayed snapshot (recent stamp, not forced)
//! or fetches a new one. Overlapping refreshes are allowed; each takes a
//! ticket and results are applied under the state lock in completion order,
//! so the last one to finish is what stays on screen.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use nerkh_core::{FetchError, FetchResult};
use nerkh_price_feed::{CachePolicy, PriceAggregator, PriceSnapshot};

use crate::app::{AppState, Notification};

/// Source of price snapshots and of the persisted last-fetch stamp
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn fetch_snapshot(&self, force: bool) -> FetchResult<PriceSnapshot>;

    /// Epoch milliseconds of the last successful fetch
    fn last_fetch_ms(&self) -> Option<i64>;
}

#[async_trait]
impl SnapshotProvider for PriceAggregator {
    async fn fetch_snapshot(&self, force: bool) -> FetchResult<PriceSnapshot> {
        PriceAggregator::fetch_snapshot(self, force).await
    }

    fn last_fetch_ms(&self) -> Option<i64> {
        PriceAggregator::last_fetch_ms(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Displayed snapshot kept, no network call
    Cached,
    Updated { ticket: u64, asset_count: usize },
    Failed { ticket: u64, error: FetchError },
}

pub struct RefreshController {
    provider: Arc<dyn SnapshotProvider>,
    policy: CachePolicy,
    state: Arc<RwLock<AppState>>,
    tickets: AtomicU64,
}

impl RefreshController {
    pub fn new(provider: Arc<dyn SnapshotProvider>, policy: CachePolicy, state: AppState) -> Self {
        Self {
            provider,
            policy,
            state: Arc::new(RwLock::new(state)),
            tickets: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> &Arc<RwLock<AppState>> {
        &self.state
    }

    pub async fn refresh(&self, force: bool) -> RefreshOutcome {
        let now_ms = Utc::now().timestamp_millis();
        let last_fetch = self.provider.last_fetch_ms();
        let has_snapshot = self.state.read().snapshot.is_some();

        if !self.policy.should_fetch(force, last_fetch, now_ms, has_snapshot) {
            debug!("Last fetch is recent, keeping displayed prices");
            self.state
                .write()
                .mark_cached(last_fetch.and_then(DateTime::from_timestamp_millis));
            return RefreshOutcome::Cached;
        }

        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed) + 1;
        self.state.write().begin_fetch();
        debug!("Refresh #{} started (force={})", ticket, force);

        let result = self.provider.fetch_snapshot(force).await;

        let mut state = self.state.write();
        state.end_fetch();

        match result {
            Ok(snapshot) => {
                let asset_count = snapshot.len();
                if snapshot.fallback_mode() {
                    warn!("Refresh #{} applied in fallback mode", ticket);
                }
                state.apply_snapshot(snapshot, ticket);
                info!("Refresh #{} applied ({} assets)", ticket, asset_count);

                let hits: Vec<String> = state
                    .triggered_alerts()
                    .iter()
                    .map(|(alert, asset)| {
                        format!(
                            "{} {} {} (now {})",
                            asset.symbol, alert.direction, alert.threshold_toman, asset.price_toman
                        )
                    })
                    .collect();
                if !hits.is_empty() {
                    info!("{} price alert(s) triggered", hits.len());
                    state.notify(Notification::info(format!("Price alert: {}", hits.join(", "))));
                }
                RefreshOutcome::Updated { ticket, asset_count }
            }
            Err(error) => {
                warn!("Refresh #{} failed: {}", ticket, error);
                state.notify(Notification::error(format!(
                    "Failed to load prices: {}",
                    error
                )));
                RefreshOutcome::Failed { ticket, error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertDirection, AlertRequest};
    use crate::app::{NotificationLevel, ViewMode};
    use nerkh_core::{AssetType, PriceAsset, PriceOrigin};
    use nerkh_price_feed::FetchReport;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::sync::oneshot;

    struct Scripted {
        gate: Option<oneshot::Receiver<()>>,
        result: FetchResult<PriceSnapshot>,
    }

    #[derive(Default)]
    struct FakeProvider {
        script: Mutex<VecDeque<Scripted>>,
        last_fetch: Mutex<Option<i64>>,
        calls: AtomicU64,
    }

    impl FakeProvider {
        fn with_stamp(epoch_ms: i64) -> Self {
            let provider = Self::default();
            *provider.last_fetch.lock() = Some(epoch_ms);
            provider
        }

        fn push(&self, result: FetchResult<PriceSnapshot>) {
            self.script.lock().push_back(Scripted { gate: None, result });
        }

        fn push_gated(&self, result: FetchResult<PriceSnapshot>) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.script.lock().push_back(Scripted { gate: Some(rx), result });
            tx
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotProvider for FakeProvider {
        async fn fetch_snapshot(&self, _force: bool) -> FetchResult<PriceSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let scripted = self.script.lock().pop_front();
            let Some(Scripted { gate, result }) = scripted else {
                return Err(FetchError::network("fake", "nothing scripted"));
            };
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            if result.is_ok() {
                *self.last_fetch.lock() = Some(Utc::now().timestamp_millis());
            }
            result
        }

        fn last_fetch_ms(&self) -> Option<i64> {
            *self.last_fetch.lock()
        }
    }

    fn snapshot(usd_price: u64, origin: PriceOrigin) -> PriceSnapshot {
        let usd = PriceAsset {
            id: "usd".to_string(),
            asset_type: AssetType::Currency,
            name_fa: "دلار آمریکا".to_string(),
            symbol: "USD".to_string(),
            price_toman: usd_price,
            change_24h: 0.0,
            source: if origin == PriceOrigin::Live { "brsapi" } else { "nobitex" }.to_string(),
            last_updated: Utc::now(),
            origin,
        };
        PriceSnapshot::new(vec![usd], Utc::now(), FetchReport::default())
    }

    fn controller(provider: Arc<FakeProvider>) -> RefreshController {
        RefreshController::new(
            provider,
            CachePolicy::new(Duration::from_secs(30 * 60)),
            AppState::new(ViewMode::List, None),
        )
    }

    fn usd_price(controller: &RefreshController) -> Option<u64> {
        let state = controller.state().read();
        state.snapshot.as_ref().and_then(|s| s.get("usd")).map(|a| a.price_toman)
    }

    #[tokio::test]
    async fn test_first_refresh_fetches_even_with_recent_stamp() {
        let provider = Arc::new(FakeProvider::with_stamp(Utc::now().timestamp_millis()));
        provider.push(Ok(snapshot(58_000, PriceOrigin::Live)));
        let controller = controller(Arc::clone(&provider));

        let outcome = controller.refresh(false).await;
        assert_eq!(outcome, RefreshOutcome::Updated { ticket: 1, asset_count: 1 });
        assert_eq!(provider.calls(), 1);
        assert!(!controller.state().read().loading);
    }

    #[tokio::test]
    async fn test_recent_stamp_reuses_snapshot() {
        let provider = Arc::new(FakeProvider::default());
        provider.push(Ok(snapshot(58_000, PriceOrigin::Live)));
        let controller = controller(Arc::clone(&provider));

        controller.refresh(false).await;
        let outcome = controller.refresh(false).await;

        assert_eq!(outcome, RefreshOutcome::Cached);
        assert_eq!(provider.calls(), 1);
        assert!(controller.state().read().using_cached);
    }

    #[tokio::test]
    async fn test_forced_refresh_always_fetches() {
        let provider = Arc::new(FakeProvider::default());
        provider.push(Ok(snapshot(58_000, PriceOrigin::Live)));
        provider.push(Ok(snapshot(59_000, PriceOrigin::Live)));
        let controller = controller(Arc::clone(&provider));

        controller.refresh(false).await;
        let outcome = controller.refresh(true).await;

        assert!(matches!(outcome, RefreshOutcome::Updated { ticket: 2, .. }));
        assert_eq!(provider.calls(), 2);
        assert_eq!(usd_price(&controller), Some(59_000));
        assert!(!controller.state().read().using_cached);
    }

    #[tokio::test]
    async fn test_stale_stamp_fetches() {
        let stale = Utc::now().timestamp_millis() - 31 * 60 * 1000;
        let provider = Arc::new(FakeProvider::default());
        provider.push(Ok(snapshot(58_000, PriceOrigin::Live)));
        provider.push(Ok(snapshot(60_000, PriceOrigin::Live)));
        let controller = controller(Arc::clone(&provider));

        controller.refresh(false).await;
        *provider.last_fetch.lock() = Some(stale);
        controller.refresh(false).await;

        assert_eq!(provider.calls(), 2);
        assert_eq!(usd_price(&controller), Some(60_000));
    }

    #[tokio::test]
    async fn test_failure_keeps_snapshot_and_notifies() {
        let provider = Arc::new(FakeProvider::default());
        provider.push(Ok(snapshot(58_000, PriceOrigin::Live)));
        provider.push(Err(FetchError::AllSourcesExhausted {
            attempts: vec!["brsapi/direct: network".to_string()],
        }));
        let controller = controller(Arc::clone(&provider));

        controller.refresh(false).await;
        let outcome = controller.refresh(true).await;

        assert!(matches!(outcome, RefreshOutcome::Failed { ticket: 2, .. }));
        assert_eq!(usd_price(&controller), Some(58_000));

        let mut state = controller.state().write();
        assert!(!state.loading);
        assert_eq!(state.applied_ticket(), 1);
        let note = state.take_notification().unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
        assert!(state.take_notification().is_none());
    }

    #[tokio::test]
    async fn test_triggered_alert_notifies_after_refresh() {
        let provider = Arc::new(FakeProvider::default());
        provider.push(Ok(snapshot(58_000, PriceOrigin::Live)));
        provider.push(Ok(snapshot(61_000, PriceOrigin::Live)));
        let controller = controller(Arc::clone(&provider));

        controller.refresh(false).await;
        {
            let mut state = controller.state().write();
            let request = AlertRequest::new("usd", "60,000", AlertDirection::Above);
            state.add_alert(&request).unwrap();
            assert!(state.take_notification().is_none());
        }

        controller.refresh(true).await;

        let note = controller.state().write().take_notification().unwrap();
        assert_eq!(note.level, NotificationLevel::Info);
        assert_eq!(note.message, "Price alert: USD above 60000 (now 61000)");
    }

    #[tokio::test]
    async fn test_fallback_mode_follows_snapshot() {
        let provider = Arc::new(FakeProvider::default());
        provider.push(Ok(snapshot(57_500, PriceOrigin::Derived)));
        provider.push(Ok(snapshot(58_000, PriceOrigin::Live)));
        let controller = controller(Arc::clone(&provider));

        controller.refresh(false).await;
        assert!(controller.state().read().fallback_mode);

        controller.refresh(true).await;
        assert!(!controller.state().read().fallback_mode);
    }

    #[tokio::test]
    async fn test_last_completed_refresh_wins() {
        let provider = Arc::new(FakeProvider::default());
        let release_first = provider.push_gated(Ok(snapshot(50_000, PriceOrigin::Live)));
        provider.push(Ok(snapshot(60_000, PriceOrigin::Live)));
        let controller = controller(Arc::clone(&provider));

        let (first, second) = tokio::join!(controller.refresh(true), async {
            let outcome = controller.refresh(true).await;
            assert!(controller.state().read().loading);
            assert_eq!(usd_price(&controller), Some(60_000));
            let _ = release_first.send(());
            outcome
        });

        assert_eq!(first, RefreshOutcome::Updated { ticket: 1, asset_count: 1 });
        assert_eq!(second, RefreshOutcome::Updated { ticket: 2, asset_count: 1 });

        let state = controller.state().read();
        assert_eq!(state.applied_ticket(), 1);
        assert!(!state.loading);
        drop(state);
        assert_eq!(usd_price(&controller), Some(50_000));
    }
}
