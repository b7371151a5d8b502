pub mod catalog;
pub mod domain;
pub mod error;
pub mod export;
pub mod news;
pub mod refresh;
pub mod scoring;
pub mod service;
pub mod store;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::str::FromStr;
    use std::time::Duration;

    const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_CATALOG_RETRIES: u32 = 2;
    const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;
    const DEFAULT_REFRESH_RATE_PER_SEC: u32 = 10;
    const DEFAULT_REFRESH_CONCURRENCY: usize = 1;
    pub const DEFAULT_EXPORT_DATASET: &str = "nifty-smallcap-momentum-multibagger-analysis";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub catalog_base_url: Option<String>,
        pub catalog_path: Option<String>,
        pub catalog_api_key: Option<String>,
        pub catalog_retries: u32,
        pub news_base_url: Option<String>,
        pub news_path: Option<String>,
        pub news_api_key: Option<String>,
        pub http_timeout: Duration,
        pub refresh_interval: Duration,
        pub refresh_rate_per_sec: u32,
        pub refresh_concurrency: usize,
        pub auto_refresh: bool,
        pub confidence_policy: String,
        pub scoring_seed: Option<u64>,
        pub export_dataset: String,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                catalog_base_url: None,
                catalog_path: None,
                catalog_api_key: None,
                catalog_retries: DEFAULT_CATALOG_RETRIES,
                news_base_url: None,
                news_path: None,
                news_api_key: None,
                http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
                refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
                refresh_rate_per_sec: DEFAULT_REFRESH_RATE_PER_SEC,
                refresh_concurrency: DEFAULT_REFRESH_CONCURRENCY,
                auto_refresh: false,
                confidence_policy: "independent".to_string(),
                scoring_seed: None,
                export_dataset: DEFAULT_EXPORT_DATASET.to_string(),
                sentry_dsn: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = Self::default();
            Ok(Self {
                catalog_base_url: non_empty_var("CATALOG_BASE_URL"),
                catalog_path: non_empty_var("CATALOG_PATH"),
                catalog_api_key: non_empty_var("CATALOG_API_KEY"),
                catalog_retries: parse_var::<u32>("CATALOG_RETRIES")
                    .filter(|&n| n > 0)
                    .unwrap_or(defaults.catalog_retries),
                news_base_url: non_empty_var("NEWS_BASE_URL"),
                news_path: non_empty_var("NEWS_PATH"),
                news_api_key: non_empty_var("NEWS_API_KEY"),
                http_timeout: parse_var::<u64>("HTTP_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.http_timeout),
                refresh_interval: parse_var::<u64>("REFRESH_INTERVAL_SECS")
                    .filter(|&n| n > 0)
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.refresh_interval),
                refresh_rate_per_sec: parse_var::<u32>("REFRESH_RATE_PER_SEC")
                    .filter(|&n| n > 0)
                    .unwrap_or(defaults.refresh_rate_per_sec),
                refresh_concurrency: parse_var::<usize>("REFRESH_CONCURRENCY")
                    .filter(|&n| n > 0)
                    .unwrap_or(defaults.refresh_concurrency),
                auto_refresh: parse_var::<bool>("AUTO_REFRESH").unwrap_or(defaults.auto_refresh),
                confidence_policy: non_empty_var("CONFIDENCE_POLICY")
                    .unwrap_or(defaults.confidence_policy),
                scoring_seed: parse_var::<u64>("SCORING_SEED"),
                export_dataset: non_empty_var("EXPORT_DATASET").unwrap_or(defaults.export_dataset),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_catalog_base_url(&self) -> anyhow::Result<&str> {
            self.catalog_base_url
                .as_deref()
                .context("CATALOG_BASE_URL is required")
        }

        pub fn require_news_base_url(&self) -> anyhow::Result<&str> {
            self.news_base_url
                .as_deref()
                .context("NEWS_BASE_URL is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    // Unparseable values fall back to the default rather than aborting startup.
    fn parse_var<T: FromStr>(key: &str) -> Option<T> {
        let raw = non_empty_var(key)?;
        match raw.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparseable setting");
                None
            }
        }
    }
}
