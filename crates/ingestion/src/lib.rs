//! Data ingestion and classification for the bioaerosol pipeline.
//!
//! This crate handles:
//! - Fixed-layout instrument table reading
//! - Fluorescence threshold estimation from baseline (FT) files
//! - Particle species classification
//! - Acquisition (AQ) header parsing and record normalization

pub mod layout;
pub mod threshold;
pub mod classifier;
pub mod acquisition;

pub use layout::FixedLayoutTable;
pub use threshold::{estimate_thresholds, ThresholdEstimator};
pub use classifier::{classify, ClassificationStats, ParticleClassifier};
pub use acquisition::{Acquisition, AcquisitionHeader, RecordIngestor};
