use crate::domain::{Characteristic, Snapshot};
use crate::error::ExportError;
use crate::time::ist::market_date;
use chrono::{NaiveDate, Utc};

const LEADING_COLUMNS: [&str; 7] = [
    "Symbol",
    "Name",
    "Sector",
    "MarketCap",
    "CurrentPrice",
    "Change",
    "ChangePercent",
];
const TRAILING_COLUMNS: [&str; 4] = ["TotalScore", "Verdict", "Confidence", "LastUpdated"];

#[derive(Debug, Clone)]
pub struct CsvExport {
    pub filename: String,
    pub body: String,
}

/// Fixed export header: stock columns, the ten characteristics in canonical order, then the
/// aggregate columns.
pub fn header() -> Vec<&'static str> {
    LEADING_COLUMNS
        .into_iter()
        .chain(Characteristic::ALL.into_iter().map(Characteristic::csv_column))
        .chain(TRAILING_COLUMNS)
        .collect()
}

/// One row per stock, in snapshot order.
pub fn to_csv(snapshot: &Snapshot) -> Result<String, ExportError> {
    snapshot.validate()?;

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(header())?;

    for (stock, score) in snapshot.entries() {
        let mut record: Vec<String> = Vec::with_capacity(LEADING_COLUMNS.len() + 14);
        record.push(stock.symbol.clone());
        record.push(stock.name.clone());
        record.push(stock.sector.clone());
        record.push(stock.market_cap.clone());
        record.push(stock.price.to_string());
        record.push(stock.change.to_string());
        record.push(stock.change_percent.to_string());
        for c in Characteristic::ALL {
            let level = score
                .level(c)
                .ok_or_else(|| ExportError::MissingCharacteristic {
                    symbol: score.symbol.clone(),
                    characteristic: c,
                })?;
            record.push(level.value().to_string());
        }
        record.push(score.total_score.to_string());
        record.push(score.verdict.to_string());
        record.push(score.confidence.to_string());
        record.push(score.last_updated.to_rfc3339());

        wtr.write_record(&record)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

/// `<dataset>-<YYYY-MM-DD>.csv`
pub fn export_filename(dataset: &str, date: NaiveDate) -> String {
    format!("{dataset}-{}.csv", date.format("%Y-%m-%d"))
}

/// Serializes `snapshot` and names the file after its cycle's market date (today for a
/// snapshot that was never refreshed).
///
/// The date is the IST date of the data, not the export time, so an export run after
/// midnight still carries the trading day the snapshot was taken on.
pub fn export_snapshot(dataset: &str, snapshot: &Snapshot) -> Result<CsvExport, ExportError> {
    let body = to_csv(snapshot)?;
    let date = market_date(snapshot.last_updated().unwrap_or_else(Utc::now));
    Ok(CsvExport {
        filename: export_filename(dataset, date),
        body,
    })
}
