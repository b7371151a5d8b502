use crate::catalog::SymbolCatalog;
use crate::config::Settings;
use crate::domain::{MultibaggerScore, Snapshot, Stock};
use crate::news::NewsCorrelator;
use crate::scoring::ScoringEngine;
use crate::store::SnapshotStore;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// Ceiling on symbols started per second across all workers.
    pub rate_per_sec: u32,
    /// Symbols processed concurrently. 1 reproduces the strictly sequential walk.
    pub concurrency: usize,
    pub interval: Duration,
    pub auto_refresh: bool,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            rate_per_sec: 10,
            concurrency: 1,
            interval: Duration::from_secs(300),
            auto_refresh: false,
        }
    }
}

impl RefreshOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            rate_per_sec: settings.refresh_rate_per_sec,
            concurrency: settings.refresh_concurrency,
            interval: settings.refresh_interval,
            auto_refresh: settings.auto_refresh,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    Idle,
    Refreshing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    Manual,
    Timed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Published {
        cycle_id: Uuid,
        stocks: usize,
        elapsed_ms: u64,
    },
    /// The catalog had nothing to offer; the previous snapshot stays in place.
    SkippedEmptyCatalog,
    /// The pass produced an inconsistent snapshot; the previous snapshot stays in place.
    Rejected { reason: String },
    /// Another refresh was in flight; this trigger was ignored.
    AlreadyRunning,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshStatus {
    pub state: RefreshState,
    pub auto_refresh: bool,
    pub interval_secs: u64,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_outcome: Option<RefreshOutcome>,
    pub cycles_published: u64,
}

#[derive(Debug)]
struct StatusInner {
    state: RefreshState,
    last_attempt: Option<DateTime<Utc>>,
    last_success: Option<DateTime<Utc>>,
    last_error: Option<String>,
    last_outcome: Option<RefreshOutcome>,
    cycles_published: u64,
}

/// Drives refresh cycles: catalog, then per-symbol news and scoring, then one atomic publish.
///
/// At most one cycle runs at a time. A trigger that arrives mid-cycle is dropped and reported
/// as [`RefreshOutcome::AlreadyRunning`].
pub struct RefreshCoordinator {
    catalog: Arc<dyn SymbolCatalog>,
    news: NewsCorrelator,
    engine: Arc<ScoringEngine>,
    store: SnapshotStore,
    limiter: DirectRateLimiter,
    concurrency: usize,
    interval: Duration,
    auto_refresh: AtomicBool,
    refresh_lock: tokio::sync::Mutex<()>,
    status: Mutex<StatusInner>,
}

impl RefreshCoordinator {
    pub fn new(
        catalog: Arc<dyn SymbolCatalog>,
        news: NewsCorrelator,
        engine: Arc<ScoringEngine>,
        store: SnapshotStore,
        options: RefreshOptions,
    ) -> Self {
        let rate = NonZeroU32::new(options.rate_per_sec).unwrap_or(NonZeroU32::MIN);
        Self {
            catalog,
            news,
            engine,
            store,
            // Burst of one: symbols are spaced 1/rate apart, never released back-to-back.
            limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(NonZeroU32::MIN)),
            concurrency: options.concurrency.max(1),
            interval: options.interval.max(MIN_INTERVAL),
            auto_refresh: AtomicBool::new(options.auto_refresh),
            refresh_lock: tokio::sync::Mutex::new(()),
            status: Mutex::new(StatusInner {
                state: RefreshState::Idle,
                last_attempt: None,
                last_success: None,
                last_error: None,
                last_outcome: None,
                cycles_published: 0,
            }),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh.load(Ordering::SeqCst)
    }

    /// Turning auto-refresh off stops future timed cycles; a cycle already running finishes.
    pub fn set_auto_refresh(&self, enabled: bool) {
        let previous = self.auto_refresh.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            tracing::info!(enabled, interval_secs = self.interval.as_secs(), "auto-refresh toggled");
        }
    }

    pub fn status(&self) -> RefreshStatus {
        let inner = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        RefreshStatus {
            state: inner.state,
            auto_refresh: self.auto_refresh(),
            interval_secs: self.interval.as_secs(),
            last_attempt: inner.last_attempt,
            last_success: inner.last_success,
            last_error: inner.last_error.clone(),
            last_outcome: inner.last_outcome.clone(),
            cycles_published: inner.cycles_published,
        }
    }

    pub async fn refresh_now(&self) -> RefreshOutcome {
        self.run(RefreshTrigger::Manual).await
    }

    async fn run(&self, trigger: RefreshTrigger) -> RefreshOutcome {
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            tracing::info!(?trigger, "refresh already in flight; ignoring trigger");
            return RefreshOutcome::AlreadyRunning;
        };

        let _refreshing = RefreshingMark::enter(&self.status);
        let outcome = self.refresh_pass(trigger).await;

        let mut inner = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        match &outcome {
            RefreshOutcome::Published { .. } => {
                inner.last_success = inner.last_attempt;
                inner.last_error = None;
                inner.cycles_published += 1;
            }
            RefreshOutcome::SkippedEmptyCatalog => {
                inner.last_error = Some("catalog returned no symbols".to_string());
            }
            RefreshOutcome::Rejected { reason } => {
                inner.last_error = Some(reason.clone());
            }
            RefreshOutcome::AlreadyRunning => {}
        }
        inner.last_outcome = Some(outcome.clone());
        outcome
    }

    async fn refresh_pass(&self, trigger: RefreshTrigger) -> RefreshOutcome {
        let t0 = Instant::now();
        let cycle_id = Uuid::new_v4();
        let cycle_ts = Utc::now();

        {
            let mut inner = self.status.lock().unwrap_or_else(PoisonError::into_inner);
            inner.last_attempt = Some(cycle_ts);
        }

        tracing::info!(
            %cycle_id,
            ?trigger,
            catalog = self.catalog.catalog_name(),
            news = self.news.source_name(),
            evaluator = self.engine.evaluator_name(),
            "refresh started"
        );

        let stocks = self.catalog.list_symbols().await;
        if stocks.is_empty() {
            tracing::warn!(%cycle_id, "catalog returned no symbols; keeping previous snapshot");
            return RefreshOutcome::SkippedEmptyCatalog;
        }

        let total = stocks.len();
        let scored: Vec<(Stock, MultibaggerScore)> = stream::iter(stocks.into_iter().enumerate())
            .map(|(idx, stock)| async move {
                self.limiter.until_ready().await;
                let news = self.news.fetch_news(&stock.symbol).await;
                let score = self.engine.score_at(&stock, news, cycle_ts);
                tracing::debug!(
                    %cycle_id,
                    processed = idx + 1,
                    total,
                    symbol = %stock.symbol,
                    total_score = score.total_score,
                    verdict = %score.verdict,
                    "symbol scored"
                );
                (stock, score)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let (stocks, scores): (Vec<_>, Vec<_>) = scored.into_iter().unzip();

        match Snapshot::try_new(cycle_id, cycle_ts, stocks, scores) {
            Ok(snapshot) => {
                let summary = snapshot.summary();
                self.store.publish(snapshot);
                let elapsed_ms = t0.elapsed().as_millis() as u64;
                tracing::info!(
                    %cycle_id,
                    stocks = summary.total,
                    high = summary.high,
                    medium = summary.medium,
                    low = summary.low,
                    elapsed_ms,
                    "snapshot published"
                );
                RefreshOutcome::Published {
                    cycle_id,
                    stocks: summary.total,
                    elapsed_ms,
                }
            }
            Err(err) => {
                tracing::error!(%cycle_id, error = %err, "refresh produced an inconsistent snapshot; keeping previous");
                RefreshOutcome::Rejected {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Background timer. Each tick runs a cycle only while auto-refresh is enabled; the task
    /// exits once `shutdown` flips to `true` or its sender is dropped.
    pub fn spawn_auto_refresh(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; timed cycles start one interval from now.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !this.auto_refresh() {
                            continue;
                        }
                        let outcome = this.run(RefreshTrigger::Timed).await;
                        tracing::debug!(?outcome, "timed refresh finished");
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            tracing::info!("auto-refresh scheduler stopped");
                            break;
                        }
                    }
                }
            }
        })
    }
}

// Flips the status to Refreshing for its lifetime, including when a cycle is cancelled.
struct RefreshingMark<'a> {
    status: &'a Mutex<StatusInner>,
}

impl<'a> RefreshingMark<'a> {
    fn enter(status: &'a Mutex<StatusInner>) -> Self {
        status.lock().unwrap_or_else(PoisonError::into_inner).state = RefreshState::Refreshing;
        Self { status }
    }
}

impl Drop for RefreshingMark<'_> {
    fn drop(&mut self) {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state = RefreshState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewsItem, ScoreLevel, Verdict};
    use crate::export::to_csv;
    use crate::news::NewsSource;
    use crate::scoring::{ConfidencePolicy, FixedEvaluator};
    use chrono::TimeZone;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn fixed_ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 4, 0, 0).unwrap()
    }

    fn stock(symbol: &str) -> Stock {
        Stock {
            symbol: symbol.to_string(),
            name: format!("{symbol} Ltd"),
            sector: "Metals".to_string(),
            market_cap: "Small Cap".to_string(),
            price: 120.0,
            change: -2.5,
            change_percent: -2.04,
            weight: 0.9,
            last_updated: fixed_ts(),
        }
    }

    /// Returns its list verbatim and can be switched to empty.
    struct ListCatalog {
        stocks: Mutex<Vec<Stock>>,
        calls: AtomicUsize,
    }

    impl ListCatalog {
        fn new(symbols: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                stocks: Mutex::new(symbols.iter().map(|s| stock(s)).collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn clear(&self) {
            self.stocks.lock().unwrap().clear();
        }
    }

    #[async_trait::async_trait]
    impl SymbolCatalog for ListCatalog {
        fn catalog_name(&self) -> &'static str {
            "list"
        }

        async fn list_symbols(&self) -> Vec<Stock> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.stocks.lock().unwrap().clone()
        }
    }

    /// One item per symbol, except for symbols listed in `failing`.
    struct StubNews {
        failing: Vec<&'static str>,
    }

    #[async_trait::async_trait]
    impl NewsSource for StubNews {
        fn source_name(&self) -> &'static str {
            "stub"
        }

        async fn fetch_news(&self, symbol: &str) -> anyhow::Result<Vec<NewsItem>> {
            anyhow::ensure!(
                !self.failing.iter().any(|f| *f == symbol),
                "feed timeout for {symbol}"
            );
            Ok(vec![NewsItem {
                title: format!("{symbol} Reports Strong Q3 Results"),
                source: "NSE Corporate Filings".to_string(),
                category: "Financial Results".to_string(),
                published: fixed_ts(),
                link: format!("https://nseindia.com/corporate-filings/{}", symbol.to_lowercase()),
                symbol: symbol.to_string(),
            }])
        }
    }

    /// Blocks inside the first fetch until released.
    struct GateNews {
        entered: Notify,
        release: Notify,
    }

    #[async_trait::async_trait]
    impl NewsSource for GateNews {
        fn source_name(&self) -> &'static str {
            "gate"
        }

        async fn fetch_news(&self, _symbol: &str) -> anyhow::Result<Vec<NewsItem>> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(Vec::new())
        }
    }

    fn options() -> RefreshOptions {
        RefreshOptions {
            rate_per_sec: 1_000,
            concurrency: 1,
            interval: Duration::from_secs(60),
            auto_refresh: false,
        }
    }

    fn coordinator(
        catalog: Arc<dyn SymbolCatalog>,
        news: Arc<dyn NewsSource>,
        evaluator: FixedEvaluator,
        options: RefreshOptions,
    ) -> Arc<RefreshCoordinator> {
        let engine = ScoringEngine::new(Arc::new(evaluator), ConfidencePolicy::MeanOfCharacteristics);
        Arc::new(RefreshCoordinator::new(
            catalog,
            NewsCorrelator::new(news),
            Arc::new(engine),
            SnapshotStore::new(),
            options,
        ))
    }

    fn aaa_high_bbb_low() -> FixedEvaluator {
        FixedEvaluator::new(ScoreLevel::PartiallyMet)
            .with_symbol("AAA", ScoreLevel::Met)
            .with_symbol("BBB", ScoreLevel::NotMet)
    }

    #[tokio::test]
    async fn two_symbol_scenario_publishes_high_and_low() {
        let c = coordinator(
            ListCatalog::new(&["AAA", "BBB"]),
            Arc::new(StubNews { failing: vec![] }),
            aaa_high_bbb_low(),
            options(),
        );

        let outcome = c.refresh_now().await;
        assert!(matches!(outcome, RefreshOutcome::Published { stocks: 2, .. }));

        let snapshot = c.store().load();
        let verdicts: Vec<_> = snapshot.scores().iter().map(|s| (s.symbol.as_str(), s.verdict)).collect();
        assert_eq!(verdicts, vec![("AAA", Verdict::High), ("BBB", Verdict::Low)]);
        assert_eq!(snapshot.scores()[0].total_score, 10.0);
        assert_eq!(snapshot.scores()[1].total_score, 0.0);

        let csv_text = to_csv(&snapshot).unwrap();
        let mut rdr = csv::Reader::from_reader(csv_text.as_bytes());
        let symbols: Vec<String> = rdr.records().map(|r| r.unwrap()[0].to_string()).collect();
        assert_eq!(symbols, vec!["AAA", "BBB"]);
    }

    #[tokio::test]
    async fn every_score_shares_the_cycle_timestamp() {
        let c = coordinator(
            ListCatalog::new(&["AAA", "BBB", "CCC", "DDD"]),
            Arc::new(StubNews { failing: vec![] }),
            aaa_high_bbb_low(),
            RefreshOptions {
                concurrency: 3,
                ..options()
            },
        );

        c.refresh_now().await;
        let snapshot = c.store().load();
        let ts = snapshot.last_updated().unwrap();
        assert!(snapshot.scores().iter().all(|s| s.last_updated == ts));
        let symbols: Vec<_> = snapshot.stocks().iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAA", "BBB", "CCC", "DDD"]);
    }

    #[tokio::test]
    async fn news_failure_keeps_symbol_with_empty_news() {
        let c = coordinator(
            ListCatalog::new(&["AAA", "BBB"]),
            Arc::new(StubNews { failing: vec!["BBB"] }),
            aaa_high_bbb_low(),
            options(),
        );

        c.refresh_now().await;
        let snapshot = c.store().load();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.score_for("AAA").unwrap().news_items.len(), 1);
        assert!(snapshot.score_for("BBB").unwrap().news_items.is_empty());
    }

    #[tokio::test]
    async fn empty_catalog_keeps_previous_snapshot() {
        let catalog = ListCatalog::new(&["AAA", "BBB"]);
        let c = coordinator(
            catalog.clone(),
            Arc::new(StubNews { failing: vec![] }),
            aaa_high_bbb_low(),
            options(),
        );

        c.refresh_now().await;
        let before = c.store().load();

        catalog.clear();
        assert_eq!(c.refresh_now().await, RefreshOutcome::SkippedEmptyCatalog);

        let after = c.store().load();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 2);

        let status = c.status();
        assert_eq!(status.state, RefreshState::Idle);
        assert_eq!(status.cycles_published, 1);
        assert_eq!(status.last_outcome, Some(RefreshOutcome::SkippedEmptyCatalog));
        assert!(status.last_success.is_some());
        assert!(status.last_error.is_some());
    }

    #[tokio::test]
    async fn duplicate_symbols_are_rejected_without_publishing() {
        let c = coordinator(
            ListCatalog::new(&["AAA", "AAA"]),
            Arc::new(StubNews { failing: vec![] }),
            aaa_high_bbb_low(),
            options(),
        );

        assert!(matches!(c.refresh_now().await, RefreshOutcome::Rejected { .. }));
        assert!(c.store().load().is_empty());
    }

    #[tokio::test]
    async fn refresh_is_idempotent_without_upstream_changes() {
        let c = coordinator(
            ListCatalog::new(&["AAA", "BBB", "CCC"]),
            Arc::new(StubNews { failing: vec![] }),
            aaa_high_bbb_low(),
            options(),
        );

        c.refresh_now().await;
        let first = c.store().load();
        c.refresh_now().await;
        let second = c.store().load();

        assert_ne!(first.cycle_id(), second.cycle_id());
        assert_eq!(first.stocks(), second.stocks());

        let strip = |s: &MultibaggerScore| {
            let mut s = s.clone();
            s.last_updated = fixed_ts();
            s
        };
        let a: Vec<_> = first.scores().iter().map(strip).collect();
        let b: Vec<_> = second.scores().iter().map(strip).collect();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn concurrent_trigger_is_ignored_while_refreshing() {
        let gate = Arc::new(GateNews {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let c = coordinator(
            ListCatalog::new(&["AAA"]),
            gate.clone(),
            aaa_high_bbb_low(),
            options(),
        );

        let first = {
            let c = Arc::clone(&c);
            tokio::spawn(async move { c.refresh_now().await })
        };

        gate.entered.notified().await;
        assert_eq!(c.status().state, RefreshState::Refreshing);

        assert_eq!(c.refresh_now().await, RefreshOutcome::AlreadyRunning);
        // Readers still see the fully formed prior (empty) snapshot.
        assert!(c.store().load().is_empty());

        gate.release.notify_one();
        let outcome = first.await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::Published { stocks: 1, .. }));
        assert_eq!(c.store().load().len(), 1);
        assert_eq!(c.status().state, RefreshState::Idle);
    }

    #[tokio::test]
    async fn rate_ceiling_spaces_symbols() {
        let c = coordinator(
            ListCatalog::new(&["AAA", "BBB", "CCC", "DDD", "EEE"]),
            Arc::new(StubNews { failing: vec![] }),
            aaa_high_bbb_low(),
            RefreshOptions {
                rate_per_sec: 20,
                concurrency: 4,
                ..options()
            },
        );

        let t0 = Instant::now();
        assert!(matches!(c.refresh_now().await, RefreshOutcome::Published { stocks: 5, .. }));
        // Five symbols at 20/s: four gaps of 50 ms.
        assert!(t0.elapsed() >= Duration::from_millis(180), "took {:?}", t0.elapsed());
    }

    #[tokio::test]
    async fn default_rate_paces_the_builtin_universe() {
        let c = coordinator(
            Arc::new(crate::catalog::StaticCatalog::nifty_smallcap_momentum()),
            Arc::new(StubNews { failing: vec![] }),
            aaa_high_bbb_low(),
            RefreshOptions::default(),
        );

        let t0 = Instant::now();
        assert!(matches!(c.refresh_now().await, RefreshOutcome::Published { stocks: 10, .. }));
        // Ten symbols at 10/s: nine gaps of 100 ms.
        assert!(t0.elapsed() >= Duration::from_millis(850), "took {:?}", t0.elapsed());
    }

    #[tokio::test(start_paused = true)]
    async fn timed_refresh_runs_only_while_enabled() {
        let catalog = ListCatalog::new(&["AAA"]);
        let c = coordinator(
            catalog.clone(),
            Arc::new(StubNews { failing: vec![] }),
            aaa_high_bbb_low(),
            options(),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = c.spawn_auto_refresh(shutdown_rx);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
        assert!(c.store().load().is_empty());

        c.set_auto_refresh(true);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.store().load().len(), 1);

        c.set_auto_refresh(false);
        tokio::time::sleep(Duration::from_secs(180)).await;
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
