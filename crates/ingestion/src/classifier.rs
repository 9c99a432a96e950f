//! Particle species classification from fluorescence and size.
//!
//! Rules are tried in order and the first match wins. They overlap, so the order
//! is part of the policy. Anything fluorescent that no rule claims is
//! Fluorescent-others.

use bioaerosol_core::{Fluorescence, Species, ThresholdVector};

/// One entry of the ordered classification policy.
struct Rule {
    species: Species,
    matches: fn(&Fluorescence, f64, &ThresholdVector) -> bool,
}

/// The policy, highest priority first.
const RULES: [Rule; 4] = [
    Rule {
        species: Species::NonFluorescence,
        matches: non_fluorescence,
    },
    Rule {
        species: Species::Bacteria,
        matches: bacteria,
    },
    Rule {
        species: Species::Fungi,
        matches: fungi,
    },
    Rule {
        species: Species::Pollen,
        matches: pollen,
    },
];

/// Species when no rule matches.
const DEFAULT_SPECIES: Species = Species::FluorescentOthers;

fn non_fluorescence(fl: &Fluorescence, _size: f64, t: &ThresholdVector) -> bool {
    fl.all_below(t)
}

fn bacteria(fl: &Fluorescence, size: f64, t: &ThresholdVector) -> bool {
    fl.fl1_280 > t.fl1_280 && size < 1.0
}

#[allow(clippy::nonminimal_bool)]
fn fungi(fl: &Fluorescence, size: f64, t: &ThresholdVector) -> bool {
    let sized = 2.0 < size && size < 9.0;
    (fl.fl1_280 > t.fl1_280 && sized)
        || (fl.fl1_280 > t.fl1_280 && fl.fl2_280 > t.fl2_280 && sized)
}

fn pollen(fl: &Fluorescence, size: f64, t: &ThresholdVector) -> bool {
    let sized = 2.0 < size && size < 10.0;
    (fl.fl1_280 > t.fl1_280 && fl.fl2_280 > t.fl2_280 && fl.fl2_370 > t.fl2_370 && sized)
        || (fl.fl2_280 > t.fl2_280 && fl.fl2_370 > t.fl2_370 && sized)
}

/// Classify one particle. Total and deterministic.
pub fn classify(fluorescence: &Fluorescence, size: f64, threshold: &ThresholdVector) -> Species {
    RULES
        .iter()
        .find(|rule| (rule.matches)(fluorescence, size, threshold))
        .map(|rule| rule.species)
        .unwrap_or(DEFAULT_SPECIES)
}

/// Statistics about classification results.
#[derive(Debug, Clone, Default)]
pub struct ClassificationStats {
    /// Total particles classified.
    pub total: u64,
    /// Particles per species, indexed by [`Species::index`].
    pub counts: [u64; 5],
}

impl ClassificationStats {
    /// Particles assigned to a species.
    pub fn count(&self, species: Species) -> u64 {
        self.counts[species.index()]
    }

    /// Fraction of particles assigned to a species.
    pub fn fraction(&self, species: Species) -> f64 {
        if self.total > 0 {
            self.count(species) as f64 / self.total as f64
        } else {
            0.0
        }
    }
}

/// Classifier bound to one run's threshold vector.
#[derive(Debug, Clone)]
pub struct ParticleClassifier {
    threshold: ThresholdVector,
    stats: ClassificationStats,
}

impl ParticleClassifier {
    /// Create a classifier for the given thresholds.
    pub fn new(threshold: ThresholdVector) -> Self {
        Self {
            threshold,
            stats: ClassificationStats::default(),
        }
    }

    /// Classify a particle and record it in the statistics.
    pub fn classify(&mut self, fluorescence: &Fluorescence, size: f64) -> Species {
        let species = classify(fluorescence, size, &self.threshold);
        self.stats.total += 1;
        self.stats.counts[species.index()] += 1;
        species
    }

    /// Get classification statistics.
    pub fn stats(&self) -> &ClassificationStats {
        &self.stats
    }
}
