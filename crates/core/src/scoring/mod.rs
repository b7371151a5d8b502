pub mod evaluator;

use crate::config::Settings;
use crate::domain::score::total_score;
use crate::domain::{Characteristic, MultibaggerScore, NewsItem, Stock, Verdict};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

pub use evaluator::{CharacteristicEvaluator, FixedEvaluator, RandomEvaluator};

/// How the overall confidence of a score is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfidencePolicy {
    /// A separate draw in 70..100, unrelated to the characteristic results.
    #[default]
    Independent,
    /// Rounded mean of the ten characteristic confidences.
    MeanOfCharacteristics,
}

impl FromStr for ConfidencePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "independent" => Ok(ConfidencePolicy::Independent),
            "mean" | "mean_of_characteristics" => Ok(ConfidencePolicy::MeanOfCharacteristics),
            other => anyhow::bail!("unknown CONFIDENCE_POLICY: {other} (expected independent or mean)"),
        }
    }
}

pub struct ScoringEngine {
    evaluator: Arc<dyn CharacteristicEvaluator>,
    confidence_policy: ConfidencePolicy,
    rng: Mutex<StdRng>,
}

impl ScoringEngine {
    pub fn new(evaluator: Arc<dyn CharacteristicEvaluator>, confidence_policy: ConfidencePolicy) -> Self {
        Self {
            evaluator,
            confidence_policy,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let policy = settings.confidence_policy.parse::<ConfidencePolicy>()?;
        let evaluator = Arc::new(RandomEvaluator::new(settings.scoring_seed));
        let mut engine = Self::new(evaluator, policy);
        if let Some(seed) = settings.scoring_seed {
            // Distinct stream from the evaluator's so the two draws stay uncorrelated.
            engine = engine.with_seed(seed.wrapping_add(1));
        }
        Ok(engine)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn evaluator_name(&self) -> &'static str {
        self.evaluator.evaluator_name()
    }

    pub fn confidence_policy(&self) -> ConfidencePolicy {
        self.confidence_policy
    }

    pub fn score(&self, stock: &Stock, news: Vec<NewsItem>) -> MultibaggerScore {
        self.score_at(stock, news, Utc::now())
    }

    /// Scores `stock` stamped with the refresh cycle's timestamp.
    pub fn score_at(
        &self,
        stock: &Stock,
        news: Vec<NewsItem>,
        at: DateTime<Utc>,
    ) -> MultibaggerScore {
        debug_assert!(
            !stock.symbol.trim().is_empty(),
            "catalog must reject stocks without a symbol"
        );

        let scores: BTreeMap<_, _> = Characteristic::ALL
            .into_iter()
            .map(|c| (c, self.evaluator.evaluate(c, stock, &news)))
            .collect();

        let total = total_score(&scores);
        let confidence = match self.confidence_policy {
            ConfidencePolicy::Independent => self
                .rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .gen_range(70..100),
            ConfidencePolicy::MeanOfCharacteristics => {
                let sum: u32 = scores.values().map(|s| u32::from(s.confidence)).sum();
                let mean = (f64::from(sum) / scores.len() as f64).round();
                mean.clamp(0.0, 100.0) as u8
            }
        };

        MultibaggerScore {
            symbol: stock.symbol.clone(),
            scores,
            total_score: total,
            verdict: Verdict::from_total(total),
            confidence,
            news_items: news,
            last_updated: at,
        }
    }
}
