//! Concentration aggregation for the bioaerosol pipeline.
//!
//! This crate handles:
//! - Time-binned per-species counting
//! - Normalisation by elapsed bin time and average flow rate
//! - Composite categories and edge-bin trimming
//! - CSV rendering of the result
//! - The end-to-end run over a snapshot of baseline and acquisition files

pub mod aggregator;
pub mod table;
pub mod output;
pub mod pipeline;

pub use aggregator::{aggregate, ConcentrationAggregator};
pub use table::{BinConcentrations, ConcentrationTable};
pub use output::{write_table, OutputLayout};
pub use pipeline::Pipeline;
