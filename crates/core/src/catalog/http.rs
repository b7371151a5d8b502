use crate::catalog::{validate_stock, SymbolCatalog};
use crate::config::Settings;
use crate::domain::Stock;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

const DEFAULT_PATH: &str = "/v1/constituents";

/// Wire shape of the index constituents endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstituentsResponse {
    pub items: Vec<ConstituentItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstituentItem {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub market_cap: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub change: Option<f64>,
    #[serde(default)]
    pub change_percent: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
}

impl ConstituentItem {
    fn into_stock(self, fetched_at: DateTime<Utc>) -> Stock {
        Stock {
            symbol: self.symbol.trim().to_string(),
            name: self.name.trim().to_string(),
            sector: self.sector.map(|s| s.trim().to_string()).unwrap_or_default(),
            market_cap: self
                .market_cap
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            price: self.price.unwrap_or(0.0),
            change: self.change.unwrap_or(0.0),
            change_percent: self.change_percent.unwrap_or(0.0),
            weight: self.weight.unwrap_or(0.0),
            last_updated: fetched_at,
        }
    }
}

#[derive(Debug)]
pub struct HttpCatalog {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    path: String,
    retries: u32,

    // Last good constituents list; served when the upstream is unreachable.
    cache: tokio::sync::Mutex<Option<Vec<Stock>>>,
}

impl HttpCatalog {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_catalog_base_url()?.to_string();
        let path = settings
            .catalog_path
            .clone()
            .unwrap_or_else(|| DEFAULT_PATH.to_string());

        Self::new(
            base_url,
            path,
            settings.catalog_api_key.clone(),
            settings.http_timeout,
            settings.catalog_retries,
        )
    }

    pub fn new(
        base_url: impl Into<String>,
        path: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        retries: u32,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build catalog http client")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
            path: path.into(),
            retries: retries.max(1),
            cache: tokio::sync::Mutex::new(None),
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

    async fn fetch_once(&self) -> Result<Vec<Stock>> {
        let res = self
            .http
            .get(self.url())
            .headers(self.headers()?)
            .send()
            .await
            .context("catalog request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read catalog response")?;

        if !status.is_success() {
            anyhow::bail!("catalog HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<ConstituentsResponse>(&text)
            .context("failed to parse catalog response into ConstituentsResponse")?;

        Ok(normalize(parsed, Utc::now()))
    }

    async fn fetch_with_retries(&self) -> Result<Vec<Stock>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once().await {
                Ok(stocks) => return Ok(stocks),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, error = %err, "catalog fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Applies the degrade-to-cache rule to a fetch result.
    async fn resolve(&self, fetched: Result<Vec<Stock>>) -> Vec<Stock> {
        let mut cache = self.cache.lock().await;
        match fetched {
            Ok(stocks) if !stocks.is_empty() => {
                *cache = Some(stocks.clone());
                stocks
            }
            Ok(_) => {
                tracing::warn!("catalog returned no usable constituents; serving cached list");
                cache.clone().unwrap_or_default()
            }
            Err(err) => {
                let cached = cache.clone().unwrap_or_default();
                tracing::warn!(
                    error = %err,
                    cached = cached.len(),
                    "catalog unavailable; serving cached list"
                );
                cached
            }
        }
    }
}

#[async_trait::async_trait]
impl SymbolCatalog for HttpCatalog {
    fn catalog_name(&self) -> &'static str {
        "http_constituents"
    }

    async fn list_symbols(&self) -> Vec<Stock> {
        let fetched = self.fetch_with_retries().await;
        self.resolve(fetched).await
    }
}

/// Drops blank and duplicate entries, keeping upstream order.
fn normalize(resp: ConstituentsResponse, fetched_at: DateTime<Utc>) -> Vec<Stock> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(resp.items.len());

    for item in resp.items {
        let stock = item.into_stock(fetched_at);
        if let Err(err) = validate_stock(&stock) {
            tracing::warn!(symbol = %stock.symbol, error = %err, "dropping invalid constituent");
            continue;
        }
        if !seen.insert(stock.symbol.clone()) {
            tracing::warn!(symbol = %stock.symbol, "dropping duplicate constituent");
            continue;
        }
        out.push(stock);
    }

    out
}
