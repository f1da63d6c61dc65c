//! Data source error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    /// The source could not be opened
    #[error("failed to open data source: {0}")]
    Open(String),

    /// Operation on a source that is not open
    #[error("data source is not open")]
    NotOpen,

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CSV parse failure
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// JSON parse failure
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Source content did not have the expected shape
    #[error("malformed data source: {0}")]
    Format(String),
}
