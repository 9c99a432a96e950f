//! Concentration aggregation.
//!
//! Groups classified records into time bins and normalises per-species counts by
//! the bin's elapsed time and the run's average flow rate.

use std::collections::BTreeMap;

use bioaerosol_core::{Error, Granularity, Result, SensorRecord, Timestamp};
use tracing::{debug, warn};

use crate::table::{BinConcentrations, ConcentrationTable};

/// Accumulator for one time bin.
#[derive(Debug, Clone)]
struct BinAccumulator {
    counts: [u64; 5],
    pm25: u64,
    pm10: u64,
    first: Timestamp,
    last: Timestamp,
}

impl BinAccumulator {
    fn new(ts: Timestamp) -> Self {
        Self {
            counts: [0; 5],
            pm25: 0,
            pm10: 0,
            first: ts,
            last: ts,
        }
    }

    fn add(&mut self, record: &SensorRecord) {
        self.counts[record.species.index()] += 1;
        self.pm25 += record.pm25 as u64;
        self.pm10 += record.pm10 as u64;
        self.first = self.first.min(record.timestamp);
        self.last = self.last.max(record.timestamp);
    }

    fn to_concentrations(
        &self,
        bin: Timestamp,
        granularity: Granularity,
        average_flow_rate: f64,
    ) -> BinConcentrations {
        let elapsed = granularity.elapsed_units(self.last - self.first);
        BinConcentrations {
            bin,
            elapsed,
            counts: self.counts,
            pm25_count: self.pm25,
            pm10_count: self.pm10,
            denominator: elapsed * average_flow_rate,
        }
    }
}

/// Aggregates a run's records into per-bin concentrations.
pub struct ConcentrationAggregator {
    /// Bin resolution.
    granularity: Granularity,
    /// Accumulators by bin start.
    bins: BTreeMap<Timestamp, BinAccumulator>,
    /// Sum of per-record flow rates, in liters per granularity unit.
    flow_rate_sum: f64,
    /// Records added.
    record_count: u64,
}

impl ConcentrationAggregator {
    /// Create a new aggregator at the given granularity.
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            bins: BTreeMap::new(),
            flow_rate_sum: 0.0,
            record_count: 0,
        }
    }

    /// Add a classified record.
    pub fn add_record(&mut self, record: &SensorRecord) {
        let bin = record.bin(self.granularity);
        self.bins
            .entry(bin)
            .or_insert_with(|| BinAccumulator::new(record.timestamp))
            .add(record);
        self.flow_rate_sum += record.flow_rate_at(self.granularity);
        self.record_count += 1;
    }

    /// Add multiple records.
    pub fn add_records(&mut self, records: &[SensorRecord]) {
        for record in records {
            self.add_record(record);
        }
    }

    /// Number of records added.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Number of bins seen.
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Mean flow rate over all records, in liters per granularity unit.
    pub fn average_flow_rate(&self) -> Option<f64> {
        (self.record_count > 0).then(|| self.flow_rate_sum / self.record_count as f64)
    }

    /// Compute concentrations for every bin, ascending.
    pub fn finish(&self) -> Result<ConcentrationTable> {
        let average_flow_rate = self.average_flow_rate().ok_or_else(|| {
            Error::empty_aggregation("no classified records to aggregate")
        })?;

        let bins: Vec<BinConcentrations> = self
            .bins
            .iter()
            .map(|(&bin, acc)| acc.to_concentrations(bin, self.granularity, average_flow_rate))
            .collect();

        for bin in bins.iter().filter(|b| !b.is_defined()) {
            warn!(
                bin = %bin.bin,
                elapsed = bin.elapsed,
                average_flow_rate,
                "concentration undefined for bin (zero elapsed time or flow)"
            );
        }
        debug!(
            granularity = %self.granularity,
            records = self.record_count,
            bins = bins.len(),
            average_flow_rate,
            "aggregated records"
        );

        Ok(ConcentrationTable {
            granularity: self.granularity,
            average_flow_rate,
            bins,
        })
    }
}

/// Aggregate a record slice in one call.
pub fn aggregate(records: &[SensorRecord], granularity: Granularity) -> Result<ConcentrationTable> {
    let mut aggregator = ConcentrationAggregator::new(granularity);
    aggregator.add_records(records);
    aggregator.finish()
}
