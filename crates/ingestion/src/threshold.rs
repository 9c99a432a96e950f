//! Fluorescence threshold estimation from Forced-Trigger baseline files.
//!
//! Each channel's threshold is `mean + 3 * stddev` over the non-null values of all
//! baseline files combined.

use std::path::Path;

use bioaerosol_core::{Error, Result, ThresholdVector};
use statrs::statistics::Statistics;
use tracing::{debug, info};

use crate::layout::FixedLayoutTable;

/// Baseline column names, in threshold order.
pub const CHANNEL_COLUMNS: [&str; 3] = ["FL1_280", "FL2_280", "FL2_370"];

/// Number of standard deviations above the baseline mean.
pub const SIGMA_MULTIPLIER: f64 = 3.0;

/// Accumulates baseline values across files and derives the threshold vector.
#[derive(Debug, Clone)]
pub struct ThresholdEstimator {
    /// Metadata lines before the header row.
    metadata_rows: usize,
    /// Non-null values per channel.
    values: [Vec<f64>; 3],
    /// Data rows seen across all files.
    row_count: usize,
    /// Files added.
    file_count: usize,
}

impl ThresholdEstimator {
    /// Create a new estimator for baseline files with the given metadata block size.
    pub fn new(metadata_rows: usize) -> Self {
        Self {
            metadata_rows,
            values: Default::default(),
            row_count: 0,
            file_count: 0,
        }
    }

    /// Read a baseline file and add its rows.
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let table = FixedLayoutTable::open(path, self.metadata_rows)?;
        self.add_table(&table)
    }

    /// Add the rows of an already parsed baseline table.
    pub fn add_table(&mut self, table: &FixedLayoutTable) -> Result<()> {
        let columns = table.require_columns(CHANNEL_COLUMNS)?;

        for row in &table.rows {
            for (channel, &col) in columns.iter().enumerate() {
                if let Some(value) = table.optional_f64(row, col)? {
                    self.values[channel].push(value);
                }
            }
        }

        self.row_count += table.rows.len();
        self.file_count += 1;
        debug!(
            path = %table.path.display(),
            rows = table.rows.len(),
            "added baseline file"
        );
        Ok(())
    }

    /// Number of baseline rows seen.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Derive the threshold vector from everything added so far.
    pub fn estimate(&self) -> Result<ThresholdVector> {
        if self.file_count == 0 {
            return Err(Error::empty_baseline("no baseline files supplied"));
        }
        if self.row_count == 0 {
            return Err(Error::empty_baseline(format!(
                "{} baseline file(s) contain no data rows",
                self.file_count
            )));
        }

        let mut thresholds = [0.0; 3];
        for (channel, values) in self.values.iter().enumerate() {
            // Sample deviation needs two values
            if values.len() < 2 {
                return Err(Error::empty_baseline(format!(
                    "channel {} has {} non-null value(s), need at least 2",
                    CHANNEL_COLUMNS[channel],
                    values.len()
                )));
            }
            let mean = values.iter().mean();
            let std_dev = values.iter().std_dev();
            thresholds[channel] = mean + SIGMA_MULTIPLIER * std_dev;
        }

        let thresholds = ThresholdVector::from(thresholds);
        info!(
            files = self.file_count,
            rows = self.row_count,
            fl1_280 = thresholds.fl1_280,
            fl2_280 = thresholds.fl2_280,
            fl2_370 = thresholds.fl2_370,
            "estimated fluorescence thresholds"
        );
        Ok(thresholds)
    }
}

/// Estimate thresholds from the union of all baseline files.
pub fn estimate_thresholds<P: AsRef<Path>>(
    paths: &[P],
    metadata_rows: usize,
) -> Result<ThresholdVector> {
    let mut estimator = ThresholdEstimator::new(metadata_rows);
    for path in paths {
        estimator.add_file(path)?;
    }
    estimator.estimate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table(body: &str) -> FixedLayoutTable {
        let text = format!("Baseline export\nFL1_280,FL2_280,FL2_370,Size\n{body}");
        FixedLayoutTable::from_reader(text.as_bytes(), 1, Path::new("FT_test.csv")).unwrap()
    }

    #[test]
    fn test_mean_plus_three_sigma() {
        let mut estimator = ThresholdEstimator::new(1);
        estimator
            .add_table(&table("1,10,0.5,1\n2,10,0.5,1\n3,10,0.5,1\n4,10,0.5,1\n5,10,0.5,1\n"))
            .unwrap();

        let t = estimator.estimate().unwrap();
        // mean 3, sample stddev sqrt(2.5)
        assert_relative_eq!(t.fl1_280, 3.0 + 3.0 * 2.5_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(t.fl1_280, 7.743, epsilon = 1e-3);
        assert_relative_eq!(t.fl2_280, 10.0, epsilon = 1e-12);
        assert_relative_eq!(t.fl2_370, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_nulls_are_ignored_per_channel() {
        let mut estimator = ThresholdEstimator::new(1);
        estimator
            .add_table(&table("1,,2,1\n3,NA,4,1\n,6,,1\n,8,,1\n"))
            .unwrap();

        let t = estimator.estimate().unwrap();
        // FL1_280 = [1, 3], FL2_280 = [6, 8], FL2_370 = [2, 4]
        let sd = 2.0_f64.sqrt();
        assert_relative_eq!(t.fl1_280, 2.0 + 3.0 * sd, epsilon = 1e-12);
        assert_relative_eq!(t.fl2_280, 7.0 + 3.0 * sd, epsilon = 1e-12);
        assert_relative_eq!(t.fl2_370, 3.0 + 3.0 * sd, epsilon = 1e-12);
    }

    #[test]
    fn test_union_is_order_independent() {
        let a = table("1,2,3,1\n4,5,6,1\n");
        let b = table("7,8,9,1\n10,11,12,1\n13,14,15,1\n");

        let mut forward = ThresholdEstimator::new(1);
        forward.add_table(&a).unwrap();
        forward.add_table(&b).unwrap();

        let mut backward = ThresholdEstimator::new(1);
        backward.add_table(&b).unwrap();
        backward.add_table(&a).unwrap();

        let f = forward.estimate().unwrap();
        let r = backward.estimate().unwrap();
        for (x, y) in f.as_array().iter().zip(r.as_array()) {
            assert_relative_eq!(*x, y, epsilon = 1e-9);
        }
        assert_eq!(forward.row_count(), 5);
    }

    #[test]
    fn test_no_files() {
        let estimator = ThresholdEstimator::new(1);
        assert!(matches!(estimator.estimate(), Err(Error::EmptyBaseline(_))));

        let none: [&str; 0] = [];
        assert!(matches!(
            estimate_thresholds(&none, 1),
            Err(Error::EmptyBaseline(_))
        ));
    }

    #[test]
    fn test_no_rows() {
        let mut estimator = ThresholdEstimator::new(1);
        estimator.add_table(&table("")).unwrap();
        assert!(matches!(estimator.estimate(), Err(Error::EmptyBaseline(_))));
    }

    #[test]
    fn test_single_value_channel() {
        let mut estimator = ThresholdEstimator::new(1);
        estimator.add_table(&table("1,2,3,1\n4,5,,1\n")).unwrap();
        let err = estimator.estimate().unwrap_err();
        assert!(err.to_string().contains("FL2_370"));
    }

    #[test]
    fn test_missing_channel_column() {
        let text = "Baseline export\nFL1_280,FL2_280,Size\n1,2,3\n";
        let t = FixedLayoutTable::from_reader(text.as_bytes(), 1, Path::new("FT_bad.csv")).unwrap();
        let mut estimator = ThresholdEstimator::new(1);
        assert!(matches!(estimator.add_table(&t), Err(Error::Schema(_))));
    }
}
