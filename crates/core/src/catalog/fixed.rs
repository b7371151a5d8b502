use crate::catalog::SymbolCatalog;
use crate::domain::Stock;
use chrono::Utc;

/// (symbol, name, weight, sector, market cap bucket, price, change, change %)
type Constituent = (&'static str, &'static str, f64, &'static str, &'static str, f64, f64, f64);

// Fallback Nifty Smallcap250 Momentum Quality 100 constituents, in index order.
const NIFTY_SMALLCAP_MOMENTUM: [Constituent; 10] = [
    ("BALRAMCHIN", "Balrampur Chini Mills Ltd", 1.2, "Sugar", "Mid Cap", 456.50, 23.40, 5.41),
    ("BATAINDIA", "Bata India Ltd", 0.8, "Footwear", "Large Cap", 1821.80, 15.20, 0.84),
    ("BHEL", "Bharat Heavy Electricals Ltd", 0.6, "Power Equipment", "Large Cap", 267.30, 12.80, 5.03),
    ("COALINDIA", "Coal India Ltd", 1.5, "Mining", "Large Cap", 456.90, 8.50, 1.90),
    ("DIVISLAB", "Divi's Laboratories Ltd", 2.1, "Pharmaceuticals", "Large Cap", 3856.80, 3.20, 0.08),
    ("EICHERMOT", "Eicher Motors Ltd", 1.8, "Automobiles", "Large Cap", 3456.70, -45.30, -1.29),
    ("GAIL", "GAIL (India) Ltd", 1.3, "Oil & Gas", "Large Cap", 234.50, 12.40, 5.58),
    ("HINDALCO", "Hindalco Industries Ltd", 1.1, "Metals", "Large Cap", 567.80, 18.90, 3.44),
    ("INDUSINDBK", "IndusInd Bank Ltd", 1.7, "Banking", "Large Cap", 1234.60, 34.20, 2.85),
    ("JSWSTEEL", "JSW Steel Ltd", 1.4, "Steel", "Large Cap", 789.30, 22.10, 2.88),
];

/// Catalog backed by a fixed list. Used when no constituents endpoint is configured.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    stocks: Vec<Stock>,
}

impl StaticCatalog {
    pub fn new(stocks: Vec<Stock>) -> Self {
        Self { stocks }
    }

    pub fn nifty_smallcap_momentum() -> Self {
        let now = Utc::now();
        let stocks = NIFTY_SMALLCAP_MOMENTUM
            .iter()
            .map(
                |&(symbol, name, weight, sector, market_cap, price, change, change_percent)| Stock {
                    symbol: symbol.to_string(),
                    name: name.to_string(),
                    sector: sector.to_string(),
                    market_cap: market_cap.to_string(),
                    price,
                    change,
                    change_percent,
                    weight,
                    last_updated: now,
                },
            )
            .collect();
        Self { stocks }
    }
}

#[async_trait::async_trait]
impl SymbolCatalog for StaticCatalog {
    fn catalog_name(&self) -> &'static str {
        "static"
    }

    async fn list_symbols(&self) -> Vec<Stock> {
        let now = Utc::now();
        self.stocks
            .iter()
            .cloned()
            .map(|mut s| {
                s.last_updated = now;
                s
            })
            .collect()
    }
}
