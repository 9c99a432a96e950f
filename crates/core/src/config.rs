//! Configuration structures for the bioaerosol pipeline.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration for a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fixed-layout file configuration.
    pub layout: LayoutConfig,
    /// Acquisition header configuration.
    pub header: HeaderConfig,
    /// Output configuration.
    pub output: OutputConfig,
}

impl Config {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let config: Config = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let rows = self.layout.acquisition_metadata_rows;
        if self.header.flow_rate_row >= rows {
            return Err(Error::config(format!(
                "flow_rate_row {} lies outside the {}-row metadata block",
                self.header.flow_rate_row, rows
            )));
        }
        if self.header.start_time_row >= rows {
            return Err(Error::config(format!(
                "start_time_row {} lies outside the {}-row metadata block",
                self.header.start_time_row, rows
            )));
        }
        if !(self.header.flow_rate_divisor > 0.0) {
            return Err(Error::config("flow_rate_divisor must be positive"));
        }
        self.header.reference_offset()?;
        Ok(())
    }
}

/// Fixed-layout table configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Lines preceding the header row in a baseline (FT) file.
    pub baseline_metadata_rows: usize,
    /// Lines preceding the header row in an acquisition (AQ) file.
    pub acquisition_metadata_rows: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            baseline_metadata_rows: 10,
            acquisition_metadata_rows: 10,
        }
    }
}

/// Where and how to read the acquisition header metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Metadata line carrying the flow rate (0-based).
    pub flow_rate_row: usize,
    /// Character offset of the flow-rate value within its line.
    pub flow_rate_offset: usize,
    /// Divisor turning the raw flow rate into liters per second.
    pub flow_rate_divisor: f64,
    /// Metadata line carrying the start timestamp (0-based).
    pub start_time_row: usize,
    /// Character offset of the start timestamp within its line.
    pub start_time_offset: usize,
    /// Start-time format without an AM/PM marker.
    pub datetime_format_24h: String,
    /// Start-time format used when an AM/PM marker is present.
    pub datetime_format_12h: String,
    /// Offset of the instrument clock from UTC, in seconds.
    pub utc_offset_seconds: i32,
}

impl HeaderConfig {
    /// The fixed reference timezone instrument clocks are read in.
    pub fn reference_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_seconds).ok_or_else(|| {
            Error::config(format!(
                "utc_offset_seconds {} is out of range",
                self.utc_offset_seconds
            ))
        })
    }
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            flow_rate_row: 0,
            flow_rate_offset: 10,
            flow_rate_divisor: 1e6,
            start_time_row: 3,
            start_time_offset: 11,
            datetime_format_24h: "%Y-%m-%d %H:%M:%S".to_string(),
            datetime_format_12h: "%m/%d/%Y %I:%M:%S %p".to_string(),
            utc_offset_seconds: 0,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Also emit PM2.5 and PM10 concentration rows.
    pub include_particulate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.layout.acquisition_metadata_rows, 10);
        assert_eq!(config.header.flow_rate_divisor, 1e6);
        assert!(!config.output.include_particulate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"header": {{"utc_offset_seconds": 28800}}}}"#).unwrap();

        let config = Config::from_json_file(file.path()).unwrap();
        assert_eq!(config.header.utc_offset_seconds, 28800);
        assert_eq!(config.header.start_time_row, 3);
        assert_eq!(
            config.header.reference_offset().unwrap().local_minus_utc(),
            28800
        );
    }

    #[test]
    fn test_rows_outside_metadata_block_rejected() {
        let mut config = Config::default();
        config.header.start_time_row = 10;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_out_of_range_offset_rejected() {
        let mut config = Config::default();
        config.header.utc_offset_seconds = 90_000;
        assert!(config.validate().is_err());
    }
}
