use crate::domain::characteristic::{Characteristic, ScoreLevel};
use crate::domain::news::NewsItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const HIGH_THRESHOLD: f64 = 8.0;
const MEDIUM_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    High,
    Medium,
    Low,
}

impl Verdict {
    /// Thresholds are inclusive lower bounds: 8 and above is High, 5 up to (not including) 8
    /// is Medium, everything below 5 is Low.
    pub fn from_total(total_score: f64) -> Self {
        if total_score >= HIGH_THRESHOLD {
            Verdict::High
        } else if total_score >= MEDIUM_THRESHOLD {
            Verdict::Medium
        } else {
            Verdict::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::High => "High",
            Verdict::Medium => "Medium",
            Verdict::Low => "Low",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Verdict::High),
            "medium" => Ok(Verdict::Medium),
            "low" => Ok(Verdict::Low),
            other => anyhow::bail!("unknown verdict: {other} (expected High, Medium or Low)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicScore {
    #[serde(rename = "score")]
    pub level: ScoreLevel,
    /// Percentage in 0..=100.
    pub confidence: u8,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultibaggerScore {
    pub symbol: String,
    pub scores: BTreeMap<Characteristic, CharacteristicScore>,
    pub total_score: f64,
    pub verdict: Verdict,
    pub confidence: u8,
    pub news_items: Vec<NewsItem>,
    pub last_updated: DateTime<Utc>,
}

impl MultibaggerScore {
    pub fn level(&self, characteristic: Characteristic) -> Option<ScoreLevel> {
        self.scores.get(&characteristic).map(|s| s.level)
    }
}

/// Weighted sum of the characteristic scores. With every weight at 1.0 this is the plain sum,
/// so the result is in 0..=10 in steps of 0.5.
pub fn total_score(scores: &BTreeMap<Characteristic, CharacteristicScore>) -> f64 {
    scores
        .iter()
        .map(|(c, s)| c.weight() * s.level.value())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_boundaries() {
        assert_eq!(Verdict::from_total(0.0), Verdict::Low);
        assert_eq!(Verdict::from_total(4.5), Verdict::Low);
        assert_eq!(Verdict::from_total(4.999), Verdict::Low);
        assert_eq!(Verdict::from_total(5.0), Verdict::Medium);
        assert_eq!(Verdict::from_total(7.5), Verdict::Medium);
        assert_eq!(Verdict::from_total(7.999), Verdict::Medium);
        assert_eq!(Verdict::from_total(8.0), Verdict::High);
        assert_eq!(Verdict::from_total(10.0), Verdict::High);
    }

    #[test]
    fn verdict_bucketing_is_total_over_half_steps() {
        for step in 0..=20 {
            let total = step as f64 * 0.5;
            let expected = if total >= 8.0 {
                Verdict::High
            } else if total >= 5.0 {
                Verdict::Medium
            } else {
                Verdict::Low
            };
            assert_eq!(Verdict::from_total(total), expected, "total={total}");
        }
    }

    #[test]
    fn verdict_parses_case_insensitively() {
        assert_eq!("high".parse::<Verdict>().unwrap(), Verdict::High);
        assert_eq!(" Medium ".parse::<Verdict>().unwrap(), Verdict::Medium);
        assert_eq!("LOW".parse::<Verdict>().unwrap(), Verdict::Low);
        assert!("unknown".parse::<Verdict>().is_err());
    }

    #[test]
    fn total_score_sums_levels() {
        let mut scores = BTreeMap::new();
        for (i, c) in Characteristic::ALL.into_iter().enumerate() {
            let level = match i % 3 {
                0 => ScoreLevel::Met,
                1 => ScoreLevel::PartiallyMet,
                _ => ScoreLevel::NotMet,
            };
            scores.insert(
                c,
                CharacteristicScore {
                    level,
                    confidence: 80,
                    reasoning: String::new(),
                },
            );
        }
        // 4 met, 3 partial, 3 not met.
        assert_eq!(total_score(&scores), 5.5);
    }
}
