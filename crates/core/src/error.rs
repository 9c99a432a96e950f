//! Error types for the bioaerosol pipeline.

use std::path::Path;

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the bioaerosol pipeline.
///
/// Every variant aborts the current run; nothing downstream substitutes defaults.
#[derive(Error, Debug)]
pub enum Error {
    /// No baseline input, or not enough baseline values to derive a threshold.
    #[error("Empty baseline: {0}")]
    EmptyBaseline(String),

    /// Start-time or flow-rate metadata could not be parsed.
    #[error("Header parse error: {0}")]
    HeaderParse(String),

    /// Expected columns or layout rows are missing.
    #[error("Schema error: {0}")]
    Schema(String),

    /// No classified records to aggregate.
    #[error("Empty aggregation: {0}")]
    EmptyAggregation(String),

    /// Missing or unusable input directories/arguments.
    #[error("Input error: {0}")]
    Input(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (a cell that should be numeric is not).
    #[error("Data error: {0}")]
    Data(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading/writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an empty baseline error.
    pub fn empty_baseline(msg: impl Into<String>) -> Self {
        Error::EmptyBaseline(msg.into())
    }

    /// Create a header parse error for the given file.
    pub fn header_parse(path: &Path, msg: impl AsRef<str>) -> Self {
        Error::HeaderParse(format!("{}: {}", path.display(), msg.as_ref()))
    }

    /// Create a schema error for the given file.
    pub fn schema(path: &Path, msg: impl AsRef<str>) -> Self {
        Error::Schema(format!("{}: {}", path.display(), msg.as_ref()))
    }

    /// Create an empty aggregation error.
    pub fn empty_aggregation(msg: impl Into<String>) -> Self {
        Error::EmptyAggregation(msg.into())
    }

    /// Create an input error.
    pub fn input(msg: impl Into<String>) -> Self {
        Error::Input(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error for the given file.
    pub fn data(path: &Path, msg: impl AsRef<str>) -> Self {
        Error::Data(format!("{}: {}", path.display(), msg.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_file() {
        let err = Error::header_parse(Path::new("AQ_0001.csv"), "bad start time");
        assert_eq!(
            err.to_string(),
            "Header parse error: AQ_0001.csv: bad start time"
        );

        let err = Error::schema(Path::new("FT_0001.csv"), "missing column FL1_280");
        assert!(err.to_string().contains("FT_0001.csv"));
    }
}
