use crate::domain::news::NewsItem;
use crate::domain::characteristic::Characteristic;
use crate::domain::score::{total_score, MultibaggerScore, Verdict};
use crate::domain::stock::Stock;
use crate::error::SnapshotError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

/// Point-in-time bundle of every tracked stock and its score.
///
/// Stocks and scores are index-aligned and every score carries the snapshot's cycle
/// timestamp. The constructor enforces this, so a `Snapshot` handed to readers is always
/// internally consistent.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    cycle_id: Option<Uuid>,
    last_updated: Option<DateTime<Utc>>,
    stocks: Vec<Stock>,
    scores: Vec<MultibaggerScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub average_score: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// State before the first successful refresh.
    pub fn empty() -> Self {
        Self {
            cycle_id: None,
            last_updated: None,
            stocks: Vec::new(),
            scores: Vec::new(),
        }
    }

    pub fn try_new(
        cycle_id: Uuid,
        last_updated: DateTime<Utc>,
        stocks: Vec<Stock>,
        scores: Vec<MultibaggerScore>,
    ) -> Result<Self, SnapshotError> {
        let snapshot = Self {
            cycle_id: Some(cycle_id),
            last_updated: Some(last_updated),
            stocks,
            scores,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.stocks.len() != self.scores.len() {
            return Err(SnapshotError::LengthMismatch {
                stocks: self.stocks.len(),
                scores: self.scores.len(),
            });
        }

        if self.stocks.is_empty() {
            return Ok(());
        }

        let cycle_ts = self.last_updated.ok_or(SnapshotError::MissingTimestamp)?;
        let mut seen = HashSet::with_capacity(self.stocks.len());

        for (index, (stock, score)) in self.entries().enumerate() {
            if stock.symbol != score.symbol {
                return Err(SnapshotError::SymbolMismatch {
                    index,
                    stock_symbol: stock.symbol.clone(),
                    score_symbol: score.symbol.clone(),
                });
            }
            if !seen.insert(stock.symbol.as_str()) {
                return Err(SnapshotError::DuplicateSymbol(stock.symbol.clone()));
            }
            if score.last_updated != cycle_ts {
                return Err(SnapshotError::MixedCycle {
                    symbol: score.symbol.clone(),
                    score_ts: score.last_updated.to_rfc3339(),
                    cycle_ts: cycle_ts.to_rfc3339(),
                });
            }
            validate_score(score)?;
        }

        Ok(())
    }

    pub fn cycle_id(&self) -> Option<Uuid> {
        self.cycle_id
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn stocks(&self) -> &[Stock] {
        &self.stocks
    }

    pub fn scores(&self) -> &[MultibaggerScore] {
        &self.scores
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Stock, &MultibaggerScore)> {
        self.stocks.iter().zip(self.scores.iter())
    }

    /// Case-insensitive exact match on sector.
    pub fn stocks_by_sector<'a>(&'a self, sector: &'a str) -> impl Iterator<Item = &'a Stock> {
        let sector = sector.trim();
        self.stocks
            .iter()
            .filter(move |s| s.sector.eq_ignore_ascii_case(sector))
    }

    pub fn scores_by_verdict(&self, verdict: Verdict) -> impl Iterator<Item = &MultibaggerScore> {
        self.scores.iter().filter(move |s| s.verdict == verdict)
    }

    pub fn score_for(&self, symbol: &str) -> Option<&MultibaggerScore> {
        let symbol = symbol.trim();
        self.scores
            .iter()
            .find(|s| s.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Distinct non-empty sectors, in first-seen (catalog) order.
    pub fn sectors(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.stocks
            .iter()
            .filter(|s| !s.sector.is_empty())
            .filter(|s| seen.insert(s.sector.as_str()))
            .map(|s| s.sector.clone())
            .collect()
    }

    /// News across every score, newest first.
    pub fn latest_news(&self, limit: usize) -> Vec<NewsItem> {
        let mut items: Vec<NewsItem> = self
            .scores
            .iter()
            .flat_map(|s| s.news_items.iter().cloned())
            .collect();
        items.sort_by(|a, b| b.published.cmp(&a.published));
        items.truncate(limit);
        items
    }

    pub fn summary(&self) -> SnapshotSummary {
        let count = |v: Verdict| self.scores.iter().filter(|s| s.verdict == v).count();
        let average_score = if self.scores.is_empty() {
            0.0
        } else {
            self.scores.iter().map(|s| s.total_score).sum::<f64>() / self.scores.len() as f64
        };

        SnapshotSummary {
            total: self.stocks.len(),
            high: count(Verdict::High),
            medium: count(Verdict::Medium),
            low: count(Verdict::Low),
            average_score,
            last_updated: self.last_updated,
        }
    }
}

// Every characteristic present, total equal to their weighted sum, verdict matching the total.
fn validate_score(score: &MultibaggerScore) -> Result<(), SnapshotError> {
    if score.scores.len() != Characteristic::ALL.len() {
        return Err(SnapshotError::IncompleteScore {
            symbol: score.symbol.clone(),
            found: score.scores.len(),
        });
    }

    let computed = total_score(&score.scores);
    if (score.total_score - computed).abs() > 1e-9 {
        return Err(SnapshotError::TotalMismatch {
            symbol: score.symbol.clone(),
            recorded: score.total_score,
            computed,
        });
    }

    let expected = Verdict::from_total(computed);
    if score.verdict != expected {
        return Err(SnapshotError::VerdictMismatch {
            symbol: score.symbol.clone(),
            recorded: score.verdict,
            expected,
        });
    }

    Ok(())
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::domain::characteristic::{Characteristic, ScoreLevel};
    use crate::domain::score::{total_score, CharacteristicScore};
    use std::collections::BTreeMap;

    pub fn stock(symbol: &str, sector: &str) -> Stock {
        Stock {
            symbol: symbol.to_string(),
            name: format!("{symbol} Ltd"),
            sector: sector.to_string(),
            market_cap: "Mid Cap".to_string(),
            price: 100.0,
            change: 1.5,
            change_percent: 1.52,
            weight: 1.0,
            last_updated: Utc::now(),
        }
    }

    /// Bypasses validation so tests can exercise consumers against malformed input.
    pub fn unchecked(stocks: Vec<Stock>, scores: Vec<MultibaggerScore>) -> Snapshot {
        let last_updated = scores.first().map_or_else(Utc::now, |s| s.last_updated);
        Snapshot {
            cycle_id: Some(Uuid::new_v4()),
            last_updated: Some(last_updated),
            stocks,
            scores,
        }
    }

    pub fn score(symbol: &str, level: ScoreLevel, at: DateTime<Utc>) -> MultibaggerScore {
        let scores: BTreeMap<_, _> = Characteristic::ALL
            .into_iter()
            .map(|c| {
                (
                    c,
                    CharacteristicScore {
                        level,
                        confidence: 80,
                        reasoning: format!("{} fixed", c.label()),
                    },
                )
            })
            .collect();
        let total = total_score(&scores);
        MultibaggerScore {
            symbol: symbol.to_string(),
            scores,
            total_score: total,
            verdict: Verdict::from_total(total),
            confidence: 80,
            news_items: Vec::new(),
            last_updated: at,
        }
    }
}
