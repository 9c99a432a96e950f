//! Acquisition (AQ) file ingestion.
//!
//! Reads the start time and flow rate from the metadata block, then turns each data
//! row into a timestamped, classified [`SensorRecord`]. The final data row of every
//! file is an incomplete trailing sample and is always dropped.

use std::path::Path;

use bioaerosol_core::config::HeaderConfig;
use bioaerosol_core::{
    in_pm10, in_pm25, Config, Error, Fluorescence, Result, SensorRecord, ThresholdVector,
    Timestamp,
};
use chrono::{Duration, FixedOffset, NaiveDateTime, TimeZone};
use tracing::debug;

use crate::classifier::ParticleClassifier;
use crate::layout::FixedLayoutTable;

/// Columns an acquisition table must carry.
pub const ACQUISITION_COLUMNS: [&str; 7] = [
    "Time", "FL1_280", "FL2_280", "FL2_370", "Size", "TPCT2", "AF",
];

/// Metadata read from an acquisition file's header block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquisitionHeader {
    /// Acquisition start on the reference clock.
    pub start: Timestamp,
    /// Sampling flow rate (L/s).
    pub flow_rate: f64,
}

/// One ingested acquisition file.
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub header: AcquisitionHeader,
    pub records: Vec<SensorRecord>,
}

/// Parse the start time and flow rate out of a metadata block.
pub fn parse_header(
    metadata: &[String],
    config: &HeaderConfig,
    offset: FixedOffset,
    path: &Path,
) -> Result<AcquisitionHeader> {
    let flow_text = metadata_field(metadata, config.flow_rate_row, config.flow_rate_offset, path)?;
    let raw_flow: f64 = flow_text.parse().map_err(|_| {
        Error::header_parse(
            path,
            format!("flow rate '{flow_text}' is not a number"),
        )
    })?;
    if !raw_flow.is_finite() {
        return Err(Error::header_parse(
            path,
            format!("flow rate '{flow_text}' is not finite"),
        ));
    }

    let time_text = metadata_field(metadata, config.start_time_row, config.start_time_offset, path)?;
    let start = parse_start_time(&time_text, config, offset, path)?;

    Ok(AcquisitionHeader {
        start,
        flow_rate: raw_flow / config.flow_rate_divisor,
    })
}

/// Parse a start-time string, choosing the 12-hour format when an AM/PM marker is present.
///
/// Text after the timestamp (an annotation following the marker) is ignored.
pub fn parse_start_time(
    text: &str,
    config: &HeaderConfig,
    offset: FixedOffset,
    path: &Path,
) -> Result<Timestamp> {
    let format = if has_meridiem(text) {
        &config.datetime_format_12h
    } else {
        &config.datetime_format_24h
    };

    let (naive, rest) = NaiveDateTime::parse_and_remainder(text, format).map_err(|e| {
        Error::header_parse(
            path,
            format!("start time '{text}' does not match expected format '{format}' ({e})"),
        )
    })?;
    if !rest.trim().is_empty() {
        debug!(path = %path.display(), trailing = rest.trim(), "ignoring text after start time");
    }

    offset.from_local_datetime(&naive).single().ok_or_else(|| {
        Error::header_parse(path, format!("start time '{text}' is not a valid local time"))
    })
}

/// True when a whitespace-separated `AM`/`PM` token appears in `text`.
fn has_meridiem(text: &str) -> bool {
    text.split_whitespace()
        .any(|token| token.eq_ignore_ascii_case("AM") || token.eq_ignore_ascii_case("PM"))
}

/// Text of a metadata line from a character offset, stripped of padding and quotes.
fn metadata_field(metadata: &[String], row: usize, offset: usize, path: &Path) -> Result<String> {
    let line = metadata.get(row).ok_or_else(|| {
        Error::header_parse(
            path,
            format!("metadata line {row} missing ({} lines present)", metadata.len()),
        )
    })?;
    let tail: String = line.chars().skip(offset).collect();
    let field = clean_field(&tail);
    if field.is_empty() {
        return Err(Error::header_parse(
            path,
            format!("metadata line {row} has no value at offset {offset}: '{line}'"),
        ));
    }
    Ok(field.to_string())
}

/// Trim whitespace, quotes and the trailing separators spreadsheet exports pad lines with.
fn clean_field(text: &str) -> &str {
    text.trim()
        .trim_end_matches(',')
        .trim()
        .trim_matches('"')
        .trim()
}

/// `start` shifted by a millisecond offset, or `None` when the result is unrepresentable.
fn offset_start(start: Timestamp, time_ms: f64) -> Option<Timestamp> {
    let micros = (time_ms * 1000.0).round();
    if !(micros > i64::MIN as f64 && micros < i64::MAX as f64) {
        return None;
    }
    start.checked_add_signed(Duration::microseconds(micros as i64))
}

/// Turns acquisition files into classified sensor records.
#[derive(Debug, Clone)]
pub struct RecordIngestor {
    header: HeaderConfig,
    offset: FixedOffset,
    metadata_rows: usize,
    classifier: ParticleClassifier,
}

impl RecordIngestor {
    /// Create an ingestor for one run's configuration and threshold vector.
    pub fn new(config: &Config, threshold: ThresholdVector) -> Result<Self> {
        Ok(Self {
            header: config.header.clone(),
            offset: config.header.reference_offset()?,
            metadata_rows: config.layout.acquisition_metadata_rows,
            classifier: ParticleClassifier::new(threshold),
        })
    }

    /// Read and ingest one acquisition file.
    pub fn ingest_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Acquisition> {
        let table = FixedLayoutTable::open(path, self.metadata_rows)?;
        self.ingest_table(&table)
    }

    /// Ingest an already parsed acquisition table.
    pub fn ingest_table(&mut self, table: &FixedLayoutTable) -> Result<Acquisition> {
        let header = parse_header(&table.metadata, &self.header, self.offset, &table.path)?;
        let [time_col, fl1_col, fl2_col, fl370_col, size_col, _, _] =
            table.require_columns(ACQUISITION_COLUMNS)?;

        let usable = table.rows.len().saturating_sub(1);
        let mut records = Vec::with_capacity(usable);

        for row in &table.rows[..usable] {
            let time_ms = table.required_f64(row, time_col)?;
            if !time_ms.is_finite() {
                return Err(Error::data(
                    &table.path,
                    format!("line {}: Time '{time_ms}' is not finite", table.line_of(row)),
                ));
            }
            let timestamp = offset_start(header.start, time_ms).ok_or_else(|| {
                Error::data(
                    &table.path,
                    format!("line {}: Time '{time_ms}' is out of range", table.line_of(row)),
                )
            })?;
            let fluorescence = Fluorescence {
                fl1_280: table.required_f64(row, fl1_col)?,
                fl2_280: table.required_f64(row, fl2_col)?,
                fl2_370: table.required_f64(row, fl370_col)?,
            };
            let size = table.required_f64(row, size_col)?;

            records.push(SensorRecord {
                timestamp,
                size,
                species: self.classifier.classify(&fluorescence, size),
                flow_rate: header.flow_rate,
                pm25: in_pm25(size),
                pm10: in_pm10(size),
            });
        }

        debug!(
            path = %table.path.display(),
            start = %header.start,
            flow_rate = header.flow_rate,
            records = records.len(),
            "ingested acquisition file"
        );

        Ok(Acquisition { header, records })
    }

    /// The classifier, with statistics over everything ingested so far.
    pub fn classifier(&self) -> &ParticleClassifier {
        &self.classifier
    }
}
