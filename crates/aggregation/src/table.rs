//! Binned concentration tables.
//!
//! A [`ConcentrationTable`] is the wide form: one [`BinConcentrations`] per time bin
//! with a count for every species. [`ConcentrationTable::rows`] pivots it back to one
//! [`ConcentrationRow`] per (bin, species).

use bioaerosol_core::{Classification, ConcentrationRow, Granularity, Species, Timestamp};
use tracing::warn;

/// Counts and normalisation for one time bin.
#[derive(Debug, Clone, PartialEq)]
pub struct BinConcentrations {
    /// Bin start on the reference clock.
    pub bin: Timestamp,
    /// Time between the first and last record of the bin, in granularity units.
    pub elapsed: f64,
    /// Particles per species, indexed by [`Species::index`]. Absent species are 0.
    pub counts: [u64; 5],
    /// Particles in the PM2.5 band.
    pub pm25_count: u64,
    /// Particles in the PM10 band.
    pub pm10_count: u64,
    /// `elapsed * average flow rate`.
    pub denominator: f64,
}

impl BinConcentrations {
    /// Whether a concentration is defined for this bin.
    pub fn is_defined(&self) -> bool {
        self.denominator.is_finite() && self.denominator > 0.0
    }

    fn rate(&self, count: u64) -> Option<f64> {
        self.is_defined().then(|| count as f64 / self.denominator)
    }

    /// Particles of a species in this bin.
    pub fn count(&self, species: Species) -> u64 {
        self.counts[species.index()]
    }

    /// Concentration of a species, `None` when undefined.
    pub fn concentration(&self, species: Species) -> Option<f64> {
        self.rate(self.count(species))
    }

    /// Bacteria + Fungi + Pollen + Fluorescent-others.
    pub fn all_fluorescence(&self) -> Option<f64> {
        Species::ALL
            .into_iter()
            .filter(|species| species.is_fluorescent())
            .map(|species| self.concentration(species))
            .sum()
    }

    /// All-fluorescence + Non-fluorescence.
    pub fn all_particles(&self) -> Option<f64> {
        Some(self.all_fluorescence()? + self.concentration(Species::NonFluorescence)?)
    }

    /// PM2.5 concentration.
    pub fn pm25(&self) -> Option<f64> {
        self.rate(self.pm25_count)
    }

    /// PM10 concentration.
    pub fn pm10(&self) -> Option<f64> {
        self.rate(self.pm10_count)
    }

    /// Concentration of any reported category.
    pub fn get(&self, classification: Classification) -> Option<f64> {
        match classification {
            Classification::Species(species) => self.concentration(species),
            Classification::AllFluorescence => self.all_fluorescence(),
            Classification::AllParticles => self.all_particles(),
            Classification::Pm25 => self.pm25(),
            Classification::Pm10 => self.pm10(),
        }
    }
}

/// Concentrations for every bin of a run, ascending by bin.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcentrationTable {
    /// Bin resolution.
    pub granularity: Granularity,
    /// Mean flow rate over all records, in liters per granularity unit.
    pub average_flow_rate: f64,
    /// Bins, ascending.
    pub bins: Vec<BinConcentrations>,
}

impl ConcentrationTable {
    /// Number of bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Whether there are no bins.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Drop the first and last bin, which cover partially sampled periods.
    pub fn trim_edges(mut self) -> Self {
        let before = self.bins.len();
        if before <= 2 {
            self.bins.clear();
        } else {
            self.bins.pop();
            self.bins.remove(0);
        }
        if self.bins.is_empty() {
            warn!(
                bins = before,
                "fewer than three bins in run, nothing left after edge trimming"
            );
        }
        self
    }

    /// Categories emitted per bin, in output order.
    pub fn classifications(include_particulate: bool) -> Vec<Classification> {
        let mut out: Vec<Classification> = Species::ALL.iter().map(|&s| s.into()).collect();
        if include_particulate {
            out.push(Classification::Pm25);
            out.push(Classification::Pm10);
        }
        out
    }

    /// Long form: one row per (bin, category), bins ascending.
    ///
    /// Composites are not emitted; they remain available on [`BinConcentrations`].
    pub fn rows(&self, include_particulate: bool) -> Vec<ConcentrationRow> {
        let classifications = Self::classifications(include_particulate);
        self.bins
            .iter()
            .flat_map(|bin| {
                classifications.iter().map(move |&classification| ConcentrationRow {
                    bin: bin.bin,
                    classification,
                    conc: bin.get(classification),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn bin(minute: u32, counts: [u64; 5], denominator: f64) -> BinConcentrations {
        BinConcentrations {
            bin: FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2024, 5, 1, 10, minute, 0)
                .unwrap(),
            elapsed: 1.0,
            counts,
            pm25_count: 3,
            pm10_count: 4,
            denominator,
        }
    }

    fn table(bins: Vec<BinConcentrations>) -> ConcentrationTable {
        ConcentrationTable {
            granularity: Granularity::Minute,
            average_flow_rate: 60.0,
            bins,
        }
    }

    #[test]
    fn test_composites_sum_species() {
        let b = bin(0, [3, 5, 7, 11, 13], 7.0);
        let species_sum: f64 = Species::ALL
            .iter()
            .map(|&s| b.concentration(s).unwrap())
            .sum();
        assert_eq!(b.all_particles().unwrap(), species_sum);
        assert_eq!(
            b.all_fluorescence().unwrap(),
            b.all_particles().unwrap() - b.concentration(Species::NonFluorescence).unwrap()
        );
    }

    #[test]
    fn test_absent_species_is_zero() {
        let b = bin(0, [4, 0, 0, 0, 0], 2.0);
        assert_eq!(b.concentration(Species::Fungi), Some(0.0));
        assert_eq!(b.concentration(Species::Bacteria), Some(2.0));
    }

    #[test]
    fn test_zero_denominator_is_undefined() {
        let b = bin(0, [4, 1, 0, 0, 0], 0.0);
        assert!(!b.is_defined());
        assert_eq!(b.concentration(Species::Bacteria), None);
        assert_eq!(b.concentration(Species::Pollen), None);
        assert_eq!(b.all_particles(), None);
        assert_eq!(b.pm10(), None);
    }

    #[test]
    fn test_trim_edges() {
        let t = table(vec![
            bin(0, [1; 5], 1.0),
            bin(1, [2; 5], 1.0),
            bin(2, [3; 5], 1.0),
            bin(3, [4; 5], 1.0),
        ])
        .trim_edges();
        assert_eq!(t.len(), 2);
        assert_eq!(t.bins[0].counts, [2; 5]);
        assert_eq!(t.bins[1].counts, [3; 5]);
    }

    #[test]
    fn test_trim_edges_short_runs() {
        assert!(table(vec![bin(0, [1; 5], 1.0), bin(1, [1; 5], 1.0)])
            .trim_edges()
            .is_empty());
        assert!(table(vec![bin(0, [1; 5], 1.0)]).trim_edges().is_empty());
        assert!(table(Vec::new()).trim_edges().is_empty());

        let three = table(vec![
            bin(0, [1; 5], 1.0),
            bin(1, [2; 5], 1.0),
            bin(2, [3; 5], 1.0),
        ])
        .trim_edges();
        assert_eq!(three.len(), 1);
        assert_eq!(three.bins[0].counts, [2; 5]);
    }

    #[test]
    fn test_long_rows() {
        let t = table(vec![bin(0, [2, 0, 0, 0, 2], 4.0), bin(1, [0; 5], 1.0)]);

        let rows = t.rows(false);
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].classification.label(), "Bacteria");
        assert_eq!(rows[0].conc, Some(0.5));
        assert_eq!(rows[4].classification.label(), "Non-fluorescence");
        assert_eq!(rows[5].time(), "10:01:00");
        assert!(rows.iter().all(|r| !matches!(
            r.classification,
            Classification::AllFluorescence | Classification::AllParticles
        )));

        let rows = t.rows(true);
        assert_eq!(rows.len(), 14);
        assert_eq!(rows[5].classification, Classification::Pm25);
        assert_eq!(rows[6].conc, Some(1.0));
    }
}
