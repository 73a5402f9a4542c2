//! allocplot - comparative charts for memory allocator benchmark results
//!
//! Reads benchmark CSV files (one row per allocator/benchmark measurement)
//! and renders grouped bar charts comparing throughput and latency.

mod charts;
mod data;

use anyhow::{bail, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use charts::ChartRenderer;
use data::{aggregate, allocator_summary, load, load_sources, pivot, AggFn, Metric};

#[derive(Parser)]
#[command(version, about = "Plot memory allocator benchmark results")]
struct Args {
    /// CSV file(s) containing benchmark results
    #[arg(required = true)]
    input_files: Vec<PathBuf>,

    /// Output image file (default: same as input with .png extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Create comparison plot from multiple files
    #[arg(short, long)]
    comparison: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.comparison && args.input_files.len() > 1 {
        let output = args
            .output
            .unwrap_or_else(|| PathBuf::from("comparison.png"));
        plot_comparison(&args.input_files, &output)
    } else if args.input_files.len() == 1 {
        let input = &args.input_files[0];
        let output = args.output.unwrap_or_else(|| input.with_extension("png"));
        plot_results(input, &output)
    } else {
        bail!(
            "for single file plotting, provide one input file; \
             for comparison, use -c/--comparison with multiple files"
        );
    }
}

/// Single-source mode: exact pivot per metric. Any load error fails the run.
fn plot_results(input: &Path, output: &Path) -> Result<()> {
    let records = load(input)?;
    let ops = pivot(&records, Metric::OpsPerSec)?;
    let time = pivot(&records, Metric::TimeUs)?;

    ChartRenderer::render_single(&ops, &time, output)?;
    println!("Plot saved to: {}", output.display());
    Ok(())
}

/// Comparison mode: failed sources are skipped with a warning; the run only
/// fails when no source loads.
fn plot_comparison(inputs: &[PathBuf], output: &Path) -> Result<()> {
    let outcome = load_sources(inputs)?;
    let ops = aggregate(&outcome.sets, Metric::OpsPerSec, AggFn::Mean)?;
    let time = aggregate(&outcome.sets, Metric::TimeUs, AggFn::Mean)?;
    let summary = allocator_summary(&outcome.sets);

    ChartRenderer::render_comparison(&ops, &time, &summary, output)?;
    println!("Comparison plot saved to: {}", output.display());
    Ok(())
}
