use crate::domain::NewsItem;
use crate::news::{NewsSource, MAX_NEWS_PER_SYMBOL};
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

struct FilingTemplate {
    title: &'static str,
    path: &'static str,
    source: &'static str,
    category: &'static str,
    max_age_days: i64,
}

const TEMPLATES: [FilingTemplate; 3] = [
    FilingTemplate {
        title: "{symbol} Reports Strong Q3 Results",
        path: "corporate-filings",
        source: "NSE Corporate Filings",
        category: "Financial Results",
        max_age_days: 7,
    },
    FilingTemplate {
        title: "Promoter Transaction in {symbol}",
        path: "insider-trading",
        source: "NSE Insider Trading",
        category: "Insider Trading",
        max_age_days: 3,
    },
    FilingTemplate {
        title: "Board Meeting Scheduled for {symbol}",
        path: "board-meetings",
        source: "NSE Board Meetings",
        category: "Corporate Actions",
        max_age_days: 5,
    },
];

/// Offline exchange-filings feed: between one and three filing notices per symbol, each
/// published at a random point within its category's look-back window.
pub struct FilingsNewsSource {
    rng: Mutex<StdRng>,
}

impl FilingsNewsSource {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait::async_trait]
impl NewsSource for FilingsNewsSource {
    fn source_name(&self) -> &'static str {
        "nse_filings"
    }

    async fn fetch_news(&self, symbol: &str) -> anyhow::Result<Vec<NewsItem>> {
        let now = Utc::now();
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let count = rng.gen_range(1..=MAX_NEWS_PER_SYMBOL);
        let lower = symbol.to_ascii_lowercase();

        let items = TEMPLATES
            .iter()
            .take(count)
            .map(|t| {
                let window_secs = t.max_age_days * 24 * 60 * 60;
                let age = Duration::seconds(rng.gen_range(0..window_secs));
                NewsItem {
                    title: t.title.replace("{symbol}", symbol),
                    source: t.source.to_string(),
                    category: t.category.to_string(),
                    published: now - age,
                    link: format!("https://nseindia.com/{}/{lower}", t.path),
                    symbol: symbol.to_string(),
                }
            })
            .collect();

        Ok(items)
    }
}
