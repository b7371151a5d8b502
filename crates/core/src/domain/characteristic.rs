use serde::{Deserialize, Serialize};
use std::fmt;

/// The ten fixed scoring dimensions. Declaration order is the canonical order used for
/// maps, CSV columns and API listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Characteristic {
    Growth,
    Market,
    Scalability,
    Management,
    Debt,
    Cashflow,
    Moat,
    Valuation,
    Marketcap,
    Momentum,
}

impl Characteristic {
    pub const ALL: [Characteristic; 10] = [
        Characteristic::Growth,
        Characteristic::Market,
        Characteristic::Scalability,
        Characteristic::Management,
        Characteristic::Debt,
        Characteristic::Cashflow,
        Characteristic::Moat,
        Characteristic::Valuation,
        Characteristic::Marketcap,
        Characteristic::Momentum,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Characteristic::Growth => "growth",
            Characteristic::Market => "market",
            Characteristic::Scalability => "scalability",
            Characteristic::Management => "management",
            Characteristic::Debt => "debt",
            Characteristic::Cashflow => "cashflow",
            Characteristic::Moat => "moat",
            Characteristic::Valuation => "valuation",
            Characteristic::Marketcap => "marketcap",
            Characteristic::Momentum => "momentum",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Characteristic::Growth => "Revenue & Profit Growth",
            Characteristic::Market => "Large Addressable Market",
            Characteristic::Scalability => "Scalability & Operating Leverage",
            Characteristic::Management => "Visionary & Strong Management",
            Characteristic::Debt => "Low or Manageable Debt",
            Characteristic::Cashflow => "Positive Cash Flow & Reinvestment",
            Characteristic::Moat => "Competitive Advantage / Economic Moat",
            Characteristic::Valuation => "Undervaluation / Mispricing",
            Characteristic::Marketcap => "Market Cap Potential",
            Characteristic::Momentum => "Price Momentum / Market Recognition",
        }
    }

    /// Every characteristic is equal-weighted.
    pub fn weight(self) -> f64 {
        1.0
    }

    pub fn csv_column(self) -> &'static str {
        match self {
            Characteristic::Growth => "Growth",
            Characteristic::Market => "Market",
            Characteristic::Scalability => "Scalability",
            Characteristic::Management => "Management",
            Characteristic::Debt => "Debt",
            Characteristic::Cashflow => "Cashflow",
            Characteristic::Moat => "Moat",
            Characteristic::Valuation => "Valuation",
            // "MarketCap" is already taken by the stock's size bucket.
            Characteristic::Marketcap => "MarketCapPotential",
            Characteristic::Momentum => "Momentum",
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Three-level outcome of a single characteristic. Serialized as its numeric value
/// (0, 0.5 or 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub enum ScoreLevel {
    NotMet,
    PartiallyMet,
    Met,
}

impl ScoreLevel {
    pub fn value(self) -> f64 {
        match self {
            ScoreLevel::NotMet => 0.0,
            ScoreLevel::PartiallyMet => 0.5,
            ScoreLevel::Met => 1.0,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            ScoreLevel::NotMet => "weak",
            ScoreLevel::PartiallyMet => "moderate",
            ScoreLevel::Met => "strong",
        }
    }
}

impl From<ScoreLevel> for f64 {
    fn from(level: ScoreLevel) -> Self {
        level.value()
    }
}

impl TryFrom<f64> for ScoreLevel {
    type Error = String;

    fn try_from(v: f64) -> Result<Self, Self::Error> {
        if v == 0.0 {
            Ok(ScoreLevel::NotMet)
        } else if v == 0.5 {
            Ok(ScoreLevel::PartiallyMet)
        } else if v == 1.0 {
            Ok(ScoreLevel::Met)
        } else {
            Err(format!("characteristic score must be 0, 0.5 or 1 (got {v})"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_in_declaration_order_and_unique() {
        let mut sorted = Characteristic::ALL;
        sorted.sort();
        assert_eq!(sorted, Characteristic::ALL);

        let ids: Vec<_> = Characteristic::ALL.iter().map(|c| c.id()).collect();
        assert_eq!(
            ids,
            [
                "growth",
                "market",
                "scalability",
                "management",
                "debt",
                "cashflow",
                "moat",
                "valuation",
                "marketcap",
                "momentum"
            ]
        );
    }

    #[test]
    fn score_level_serializes_as_number() {
        let v = serde_json::to_value(ScoreLevel::PartiallyMet).unwrap();
        assert_eq!(v, serde_json::json!(0.5));

        let back: ScoreLevel = serde_json::from_value(serde_json::json!(1.0)).unwrap();
        assert_eq!(back, ScoreLevel::Met);

        assert!(serde_json::from_value::<ScoreLevel>(serde_json::json!(0.75)).is_err());
    }

    #[test]
    fn characteristic_serializes_as_lowercase_id() {
        let v = serde_json::to_value(Characteristic::Marketcap).unwrap();
        assert_eq!(v, serde_json::json!("marketcap"));
    }
}
