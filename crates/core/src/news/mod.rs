pub mod filings;
pub mod http;

use crate::domain::NewsItem;
use std::sync::Arc;
use std::time::Instant;

pub use filings::FilingsNewsSource;
pub use http::HttpNewsSource;

/// Per-symbol payload cap.
pub const MAX_NEWS_PER_SYMBOL: usize = 3;

#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch_news(&self, symbol: &str) -> anyhow::Result<Vec<NewsItem>>;
}

/// Applies the per-symbol contract on top of a raw [`NewsSource`]: at most
/// [`MAX_NEWS_PER_SYMBOL`] items, owned by the requested symbol, and an empty list instead of
/// an error. Items are not deduplicated across refresh cycles.
#[derive(Clone)]
pub struct NewsCorrelator {
    source: Arc<dyn NewsSource>,
}

impl NewsCorrelator {
    pub fn new(source: Arc<dyn NewsSource>) -> Self {
        Self { source }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.source_name()
    }

    pub async fn fetch_news(&self, symbol: &str) -> Vec<NewsItem> {
        let t0 = Instant::now();
        match self.source.fetch_news(symbol).await {
            Ok(mut items) => {
                items.truncate(MAX_NEWS_PER_SYMBOL);
                for item in &mut items {
                    item.symbol = symbol.to_string();
                }
                tracing::debug!(
                    symbol,
                    items = items.len(),
                    elapsed_ms = t0.elapsed().as_millis(),
                    "news fetched"
                );
                items
            }
            Err(err) => {
                tracing::warn!(
                    symbol,
                    source = self.source.source_name(),
                    error = %err,
                    "news fetch failed; scoring without news"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    struct CannedSource {
        items: usize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl NewsSource for CannedSource {
        fn source_name(&self) -> &'static str {
            "canned"
        }

        async fn fetch_news(&self, _symbol: &str) -> anyhow::Result<Vec<NewsItem>> {
            anyhow::ensure!(!self.fail, "feed down");
            Ok((0..self.items)
                .map(|i| NewsItem {
                    title: format!("item {i}"),
                    source: "canned".to_string(),
                    category: "Financial Results".to_string(),
                    published: Utc::now(),
                    link: format!("https://example.invalid/{i}"),
                    symbol: "OTHER".to_string(),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn caps_items_and_sets_owner() {
        let correlator = NewsCorrelator::new(Arc::new(CannedSource { items: 7, fail: false }));
        let items = correlator.fetch_news("AAA").await;
        assert_eq!(items.len(), MAX_NEWS_PER_SYMBOL);
        assert!(items.iter().all(|n| n.symbol == "AAA"));
    }

    #[tokio::test]
    async fn failure_degrades_to_empty() {
        let correlator = NewsCorrelator::new(Arc::new(CannedSource { items: 2, fail: true }));
        assert!(correlator.fetch_news("AAA").await.is_empty());
    }
}
