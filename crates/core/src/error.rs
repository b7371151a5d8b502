use crate::domain::{Characteristic, Verdict};
use thiserror::Error;

/// Raised when assembling a snapshot whose stocks and scores do not line up.
#[derive(Debug, Error, PartialEq)]
pub enum SnapshotError {
    #[error("snapshot has {stocks} stocks but {scores} scores")]
    LengthMismatch { stocks: usize, scores: usize },

    #[error("score at index {index} belongs to {score_symbol}, expected {stock_symbol}")]
    SymbolMismatch {
        index: usize,
        stock_symbol: String,
        score_symbol: String,
    },

    #[error("score for {symbol} was computed at {score_ts}, snapshot cycle is {cycle_ts}")]
    MixedCycle {
        symbol: String,
        score_ts: String,
        cycle_ts: String,
    },

    #[error("duplicate symbol in snapshot: {0}")]
    DuplicateSymbol(String),

    #[error("non-empty snapshot requires a cycle timestamp")]
    MissingTimestamp,

    #[error("score for {symbol} covers {found} of 10 characteristics")]
    IncompleteScore { symbol: String, found: usize },

    #[error("score for {symbol} records total {recorded}, characteristics sum to {computed}")]
    TotalMismatch {
        symbol: String,
        recorded: f64,
        computed: f64,
    },

    #[error("score for {symbol} has verdict {recorded}, total implies {expected}")]
    VerdictMismatch {
        symbol: String,
        recorded: Verdict,
        expected: Verdict,
    },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot export a malformed snapshot: {0}")]
    Malformed(#[from] SnapshotError),

    #[error("score for {symbol} has no {characteristic} result")]
    MissingCharacteristic {
        symbol: String,
        characteristic: Characteristic,
    },

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer flush failed: {0}")]
    Flush(String),

    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
