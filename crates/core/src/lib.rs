//! Core types and configuration for the bioaerosol pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Particle and concentration types (records, species, thresholds, bins)
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
