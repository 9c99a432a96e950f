//! One complete run: baseline files in, trimmed concentration table out.

use std::path::Path;

use bioaerosol_core::{Config, Error, Granularity, Result, Species, ThresholdVector};
use bioaerosol_ingestion::{RecordIngestor, ThresholdEstimator};
use tracing::{debug, info};

use crate::aggregator::ConcentrationAggregator;
use crate::table::ConcentrationTable;

/// Runs the threshold → classify → aggregate → trim chain for one snapshot of files.
///
/// Stateless across runs: nothing from one call is reused by the next.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    /// Create a pipeline from a validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Derive the threshold vector from the union of all baseline files.
    pub fn thresholds<P: AsRef<Path>>(&self, baseline: &[P]) -> Result<ThresholdVector> {
        let mut estimator = ThresholdEstimator::new(self.config.layout.baseline_metadata_rows);
        for path in baseline {
            estimator.add_file(path)?;
        }
        estimator.estimate()
    }

    /// Aggregate every acquisition file into one table, without edge trimming.
    pub fn aggregate<P: AsRef<Path>>(
        &self,
        threshold: ThresholdVector,
        acquisition: &[P],
        granularity: Granularity,
    ) -> Result<ConcentrationTable> {
        if acquisition.is_empty() {
            return Err(Error::input("no acquisition files supplied"));
        }

        let mut ingestor = RecordIngestor::new(&self.config, threshold)?;
        let mut aggregator = ConcentrationAggregator::new(granularity);
        for path in acquisition {
            let batch = ingestor.ingest_file(path)?;
            aggregator.add_records(&batch.records);
        }

        let stats = ingestor.classifier().stats();
        info!(
            files = acquisition.len(),
            particles = stats.total,
            records = aggregator.record_count(),
            bins = aggregator.bin_count(),
            "classified acquisition files"
        );
        debug!(
            bacteria = stats.fraction(Species::Bacteria),
            fungi = stats.fraction(Species::Fungi),
            pollen = stats.fraction(Species::Pollen),
            fluorescent_others = stats.fraction(Species::FluorescentOthers),
            non_fluorescence = stats.fraction(Species::NonFluorescence),
            "species fractions"
        );
        aggregator.finish()
    }

    /// Full run: thresholds, classification, aggregation, then drop the first and last bin.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        baseline: &[P],
        acquisition: &[Q],
        granularity: Granularity,
    ) -> Result<ConcentrationTable> {
        let threshold = self.thresholds(baseline)?;
        let table = self.aggregate(threshold, acquisition, granularity)?.trim_edges();
        info!(
            granularity = %granularity,
            bins = table.len(),
            "run complete"
        );
        Ok(table)
    }
}
