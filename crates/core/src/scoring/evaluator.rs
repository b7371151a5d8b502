use crate::domain::{Characteristic, CharacteristicScore, NewsItem, ScoreLevel, Stock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Scores one characteristic for one stock.
///
/// An evaluator sees the stock, its news and the characteristic being scored, never the
/// other characteristics' results, so every dimension is derived independently.
pub trait CharacteristicEvaluator: Send + Sync {
    fn evaluator_name(&self) -> &'static str;

    fn evaluate(
        &self,
        characteristic: Characteristic,
        stock: &Stock,
        news: &[NewsItem],
    ) -> CharacteristicScore;
}

/// Placeholder heuristic standing in for a fundamentals model.
///
/// Each characteristic has a `(met, partial)` threshold pair: a first uniform draw above
/// `met` scores 1; otherwise a second draw above `partial` scores 0.5; otherwise 0.
pub struct RandomEvaluator {
    rng: Mutex<StdRng>,
}

impl RandomEvaluator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn thresholds(characteristic: Characteristic) -> (f64, f64) {
        match characteristic {
            Characteristic::Growth => (0.3, 0.5),
            Characteristic::Market => (0.2, 0.4),
            Characteristic::Scalability => (0.4, 0.6),
            Characteristic::Management => (0.25, 0.5),
            Characteristic::Debt => (0.3, 0.5),
            Characteristic::Cashflow => (0.35, 0.55),
            Characteristic::Moat => (0.4, 0.6),
            Characteristic::Valuation => (0.3, 0.5),
            Characteristic::Marketcap => (0.2, 0.4),
            Characteristic::Momentum => (0.25, 0.5),
        }
    }
}

impl CharacteristicEvaluator for RandomEvaluator {
    fn evaluator_name(&self) -> &'static str {
        "random_placeholder"
    }

    fn evaluate(
        &self,
        characteristic: Characteristic,
        _stock: &Stock,
        news: &[NewsItem],
    ) -> CharacteristicScore {
        let (met, partial) = Self::thresholds(characteristic);
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let level = if rng.gen::<f64>() > met {
            ScoreLevel::Met
        } else if rng.gen::<f64>() > partial {
            ScoreLevel::PartiallyMet
        } else {
            ScoreLevel::NotMet
        };
        let confidence = rng.gen_range(70..100);

        CharacteristicScore {
            level,
            confidence,
            reasoning: format!(
                "{}: {} (placeholder heuristic, {} recent news items)",
                characteristic.label(),
                level.describe(),
                news.len()
            ),
        }
    }
}

/// Deterministic evaluator: one level for every characteristic, optionally overridden per
/// symbol.
#[derive(Debug, Clone)]
pub struct FixedEvaluator {
    default_level: ScoreLevel,
    by_symbol: HashMap<String, ScoreLevel>,
    confidence: u8,
}

impl FixedEvaluator {
    pub fn new(default_level: ScoreLevel) -> Self {
        Self {
            default_level,
            by_symbol: HashMap::new(),
            confidence: 100,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>, level: ScoreLevel) -> Self {
        self.by_symbol.insert(symbol.into(), level);
        self
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence = confidence.min(100);
        self
    }
}

impl CharacteristicEvaluator for FixedEvaluator {
    fn evaluator_name(&self) -> &'static str {
        "fixed"
    }

    fn evaluate(
        &self,
        characteristic: Characteristic,
        stock: &Stock,
        _news: &[NewsItem],
    ) -> CharacteristicScore {
        let level = self
            .by_symbol
            .get(&stock.symbol)
            .copied()
            .unwrap_or(self.default_level);

        CharacteristicScore {
            level,
            confidence: self.confidence,
            reasoning: format!("{}: {} (fixed)", characteristic.label(), level.describe()),
        }
    }
}
