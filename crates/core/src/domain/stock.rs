use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub sector: String,
    /// Size bucket as published by the index source ("Small Cap", "Mid Cap", "Large Cap").
    #[serde(default)]
    pub market_cap: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub change_percent: f64,
    /// Index-membership weight in percent. Descriptive only; never used in scoring.
    #[serde(default)]
    pub weight: f64,
    pub last_updated: DateTime<Utc>,
}
