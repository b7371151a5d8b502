use crate::config::Settings;
use crate::domain::NewsItem;
use crate::news::NewsSource;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_PATH: &str = "/v1/news";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsResponse {
    pub items: Vec<NewsFeedItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsFeedItem {
    pub title: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub category: String,
    pub published: DateTime<Utc>,
    #[serde(default)]
    pub link: String,
}

/// News/filings feed over HTTP: `GET <base><path>?symbol=<SYMBOL>`.
///
/// A single attempt per symbol; the refresh loop tolerates per-symbol failures, so retrying
/// here would only stretch a cycle.
#[derive(Debug, Clone)]
pub struct HttpNewsSource {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    path: String,
}

impl HttpNewsSource {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_news_base_url()?.to_string();
        let path = settings
            .news_path
            .clone()
            .unwrap_or_else(|| DEFAULT_PATH.to_string());

        Self::new(base_url, path, settings.news_api_key.clone(), settings.http_timeout)
    }

    pub fn new(
        base_url: impl Into<String>,
        path: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build news http client")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
            path: path.into(),
        })
    }

    fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl NewsSource for HttpNewsSource {
    fn source_name(&self) -> &'static str {
        "http_news"
    }

    async fn fetch_news(&self, symbol: &str) -> Result<Vec<NewsItem>> {
        let res = self
            .http
            .get(self.url())
            .headers(self.headers()?)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .with_context(|| format!("news request failed for {symbol}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read news response")?;

        if !status.is_success() {
            anyhow::bail!("news feed HTTP {status} for {symbol}: {text}");
        }

        let parsed = serde_json::from_str::<NewsResponse>(&text)
            .with_context(|| format!("failed to parse news response for {symbol}"))?;

        Ok(into_news_items(parsed, symbol))
    }
}

fn into_news_items(resp: NewsResponse, symbol: &str) -> Vec<NewsItem> {
    resp.items
        .into_iter()
        .filter(|item| !item.title.trim().is_empty())
        .map(|item| NewsItem {
            title: item.title.trim().to_string(),
            source: item.source,
            category: item.category,
            published: item.published,
            link: item.link,
            symbol: symbol.to_string(),
        })
        .collect()
}
