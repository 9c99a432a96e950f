//! # bioaerosol
//!
//! Converts fluorescence particle-counter exports into time-binned concentration tables.
//!
//! ## Usage
//!
//! ```bash
//! # Minute bins from the FT_/AQ_ files in ./InstaScope_data
//! bioaerosol -i InstaScope_data -o output -f batch_process -t mins
//! ```
//!
//! Scheduling repeated runs is left to the caller.

mod selection;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bioaerosol_aggregation::{write_table, ConcentrationTable, OutputLayout, Pipeline};
use bioaerosol_core::{Config, Granularity};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::selection::{discover, select_acquisition};

/// Bioaerosol concentration pipeline
#[derive(Parser, Debug)]
#[command(name = "bioaerosol")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the FT_ (baseline) and AQ_ (acquisition) files
    #[arg(short = 'i', long, value_name = "DIR")]
    input_dir: PathBuf,

    /// Directory the output table is written to (created if absent)
    #[arg(short = 'o', long, value_name = "DIR")]
    output_dir: PathBuf,

    /// Output file name, without extension
    #[arg(short = 'f', long, value_name = "NAME")]
    filename: String,

    /// Bin granularity: secs, mins, hours or days
    #[arg(short = 't', long = "time-unit", default_value = "mins")]
    granularity: Granularity,

    /// Output layout: long (date,time,classification,conc) or wide (dashboard columns)
    #[arg(long, default_value = "long")]
    layout: OutputLayout,

    /// Also emit PM2.5 and PM10 rows in the long layout
    #[arg(long)]
    include_particulate: bool,

    /// Load settings from a JSON config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Write through a temporary file so readers never see a partial table.
///
/// The temporary file is removed again if writing or renaming fails.
fn write_atomic(
    path: &Path,
    table: &ConcentrationTable,
    layout: OutputLayout,
    include_particulate: bool,
) -> Result<()> {
    let tmp = path.with_extension("csv.tmp");
    let result = write_then_rename(&tmp, path, table, layout, include_particulate);
    if result.is_err() && tmp.exists() {
        if let Err(e) = fs::remove_file(&tmp) {
            warn!(path = %tmp.display(), error = %e, "failed to remove partial output");
        }
    }
    result
}

fn write_then_rename(
    tmp: &Path,
    path: &Path,
    table: &ConcentrationTable,
    layout: OutputLayout,
    include_particulate: bool,
) -> Result<()> {
    let file = File::create(tmp)
        .with_context(|| format!("Failed to create {}", tmp.display()))?;
    write_table(table, layout, include_particulate, BufWriter::new(file))
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(tmp, path)
        .with_context(|| format!("Failed to move output into place at {}", path.display()))?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    config.output.include_particulate |= cli.include_particulate;

    let inputs = discover(&cli.input_dir)?;
    let acquisition = select_acquisition(&inputs.acquisition);
    info!(
        baseline = inputs.baseline.len(),
        available = inputs.acquisition.len(),
        selected = acquisition.len(),
        "discovered input files"
    );

    let include_particulate = config.output.include_particulate;
    let pipeline = Pipeline::new(config)?;
    let table = pipeline.run(&inputs.baseline, acquisition, cli.granularity)?;

    fs::create_dir_all(&cli.output_dir).with_context(|| {
        format!("Failed to create output directory {}", cli.output_dir.display())
    })?;
    let output = cli.output_dir.join(format!("{}.csv", cli.filename));
    write_atomic(&output, &table, cli.layout, include_particulate)?;

    info!(path = %output.display(), bins = table.len(), "wrote concentration table");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}
