//! TIGER ingest pipeline.
//!
//! Scans a directory of TIGER road features, interpolates the address ranges
//! on both sides of every segment and writes the resulting address documents
//! as newline-delimited JSON.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cypress_tiger::pipeline::{self, FileJob};
use cypress_tiger::sink::NdjsonSink;
use cypress_tiger::source::scan_dir;
use cypress_tiger::{AdminTable, RangeInterpolator};

use crate::config::Config;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Interpolate TIGER address ranges into address documents")]
struct Args {
    /// Directory whose top level holds GeoJSONSeq exports of TIGER files
    dir: PathBuf,

    /// Output file (newline-delimited JSON), stdout if omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Optional TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV table of county FIPS codes (fips,state,county)
    #[arg(long)]
    fips_file: Option<PathBuf>,

    /// Country name attached to every address
    #[arg(long)]
    country: Option<String>,

    /// Minimum gap between addresses in degrees, 0 disables it
    #[arg(long)]
    min_gap: Option<f64>,

    /// Number of documents buffered between interpolation and output
    #[arg(long, default_value = "10000")]
    channel_capacity: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging, stdout carries the documents
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Cypress TIGER Ingest");
    info!("Directory: {}", args.dir.display());

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    // CLI flags override the config file
    if let Some(country) = args.country {
        config.admin.country = country;
    }
    if let Some(path) = args.fips_file {
        config.admin.fips_file = Some(path);
    }
    if let Some(min_gap) = args.min_gap {
        config.interpolation.min_gap = min_gap;
    }
    config.validate()?;

    let admin_table = match &config.admin.fips_file {
        Some(path) => AdminTable::load_from_file(path)?,
        None => AdminTable::embedded()?,
    }
    .with_country(config.admin.country.clone());

    let files = scan_dir(&args.dir)?;
    if files.is_empty() {
        warn!("No input files found in {}", args.dir.display());
    }

    let jobs: Vec<FileJob> = files
        .into_iter()
        .map(|path| FileJob::new(path, &admin_table))
        .collect();

    let sink = match &args.output {
        Some(path) => NdjsonSink::create(path)?,
        None => NdjsonSink::stdout(),
    };

    let pb = ProgressBar::new(jobs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let interpolator = RangeInterpolator::new(config.interpolation);
    let summary = pipeline::run(jobs, interpolator, sink, args.channel_capacity, pb)
        .await
        .context("Import failed")?;

    info!(
        "Imported {} files ({} failed): {} records, {} addresses written",
        summary.files, summary.failed_files, summary.stats.records, summary.written
    );
    info!(
        "Skipped {} unreadable records, {} invalid geometries, {} malformed ranges",
        summary.stats.unreadable_records,
        summary.stats.invalid_geometries,
        summary.stats.malformed_ranges
    );

    Ok(())
}
