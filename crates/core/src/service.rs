use crate::catalog::{HttpCatalog, StaticCatalog, SymbolCatalog};
use crate::config::Settings;
use crate::domain::{Characteristic, MultibaggerScore, NewsItem, Snapshot, SnapshotSummary, Stock, Verdict};
use crate::error::ExportError;
use crate::export::{export_snapshot, CsvExport};
use crate::news::{FilingsNewsSource, HttpNewsSource, NewsCorrelator, NewsSource};
use crate::refresh::{RefreshCoordinator, RefreshOptions, RefreshOutcome, RefreshStatus};
use crate::scoring::ScoringEngine;
use crate::store::SnapshotStore;
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Serialize)]
pub struct CharacteristicInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub weight: f64,
}

/// Everything a front end needs: snapshot reads, refresh control and CSV export.
///
/// Reads never block on a running refresh; they see the last published snapshot.
#[derive(Clone)]
pub struct MultibaggerService {
    coordinator: Arc<RefreshCoordinator>,
    dataset: String,
}

impl MultibaggerService {
    pub fn new(coordinator: Arc<RefreshCoordinator>, dataset: impl Into<String>) -> Self {
        Self {
            coordinator,
            dataset: dataset.into(),
        }
    }

    /// Wires upstreams from settings. Without a catalog or news URL the built-in constituents
    /// and the synthetic filings feed are used.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let catalog: Arc<dyn SymbolCatalog> = if settings.catalog_base_url.is_some() {
            Arc::new(HttpCatalog::from_settings(settings)?)
        } else {
            Arc::new(StaticCatalog::nifty_smallcap_momentum())
        };

        let news: Arc<dyn NewsSource> = if settings.news_base_url.is_some() {
            Arc::new(HttpNewsSource::from_settings(settings)?)
        } else {
            Arc::new(FilingsNewsSource::new(settings.scoring_seed))
        };

        let engine = ScoringEngine::from_settings(settings)?;

        tracing::info!(
            catalog = catalog.catalog_name(),
            news = news.source_name(),
            evaluator = engine.evaluator_name(),
            confidence_policy = ?engine.confidence_policy(),
            "multibagger service configured"
        );

        let coordinator = RefreshCoordinator::new(
            catalog,
            NewsCorrelator::new(news),
            Arc::new(engine),
            SnapshotStore::new(),
            RefreshOptions::from_settings(settings),
        );

        Ok(Self::new(Arc::new(coordinator), settings.export_dataset.clone()))
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.coordinator.store().load()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.coordinator.store().subscribe()
    }

    pub fn stocks_by_sector(&self, sector: &str) -> Vec<Stock> {
        self.snapshot().stocks_by_sector(sector).cloned().collect()
    }

    pub fn scores_by_verdict(&self, verdict: Verdict) -> Vec<MultibaggerScore> {
        self.snapshot().scores_by_verdict(verdict).cloned().collect()
    }

    pub fn score_for(&self, symbol: &str) -> Option<MultibaggerScore> {
        self.snapshot().score_for(symbol).cloned()
    }

    pub fn summary(&self) -> SnapshotSummary {
        self.snapshot().summary()
    }

    pub fn latest_news(&self, limit: usize) -> Vec<NewsItem> {
        self.snapshot().latest_news(limit)
    }

    pub fn sectors(&self) -> Vec<String> {
        self.snapshot().sectors()
    }

    pub fn characteristics(&self) -> Vec<CharacteristicInfo> {
        Characteristic::ALL
            .into_iter()
            .map(|c| CharacteristicInfo {
                id: c.id(),
                label: c.label(),
                weight: c.weight(),
            })
            .collect()
    }

    pub async fn refresh_now(&self) -> RefreshOutcome {
        self.coordinator.refresh_now().await
    }

    pub fn set_auto_refresh(&self, enabled: bool) {
        self.coordinator.set_auto_refresh(enabled);
    }

    pub fn status(&self) -> RefreshStatus {
        self.coordinator.status()
    }

    pub fn spawn_auto_refresh(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        self.coordinator.spawn_auto_refresh(shutdown)
    }

    /// CSV of the current snapshot, named `<dataset>-<market date>.csv`.
    pub fn export_csv(&self) -> Result<CsvExport, ExportError> {
        export_snapshot(&self.dataset, &self.snapshot())
    }
}
