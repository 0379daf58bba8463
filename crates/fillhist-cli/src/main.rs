//! fillhist CLI

mod input;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use fillhist::{Histogram, HistogramConfig};

#[derive(Parser)]
#[command(name = "fillhist")]
#[command(about = "fillhist - fill multi-dimensional histograms from numeric data")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill a histogram from delimited numeric rows
    Fill {
        /// Histogram config (JSON: axes + kind)
        #[arg(short, long)]
        config: PathBuf,

        /// Input data file, `-` for stdin
        #[arg(short, long)]
        input: PathBuf,

        /// Field delimiter (one ASCII character). Defaults to tab.
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Coordinate columns in axis order (0-based). Defaults to the first `ndim` columns.
        #[arg(long, value_delimiter = ',')]
        columns: Vec<usize>,

        /// Weight column (0-based). Unweighted when omitted.
        #[arg(long)]
        weight_column: Option<usize>,

        /// Skip the first non-comment line
        #[arg(long)]
        skip_header: bool,

        /// Threads (0 = auto). 1 fills sequentially.
        #[arg(long, default_value = "1")]
        threads: usize,

        /// Rows per parallel chunk (0 = default)
        #[arg(long, default_value = "0")]
        chunk_size: usize,

        /// Output file for the filled histogram (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a config and print its shape
    Inspect {
        /// Histogram config (JSON: axes + kind)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Fill {
            config,
            input,
            delimiter,
            columns,
            weight_column,
            skip_header,
            threads,
            chunk_size,
            output,
        } => cmd_fill(
            &config,
            &input,
            delimiter,
            &columns,
            weight_column,
            skip_header,
            threads,
            chunk_size,
            output.as_ref(),
        ),
        Commands::Inspect { config, output } => cmd_inspect(&config, output.as_ref()),
    }
}

fn load_histogram(config: &Path) -> Result<Histogram> {
    tracing::info!(path = %config.display(), "loading histogram config");
    let cfg = HistogramConfig::from_path(config)
        .with_context(|| format!("failed to load config {}", config.display()))?;
    let h = cfg.build().with_context(|| format!("invalid config {}", config.display()))?;
    tracing::info!(ndim = h.ndim(), nbins = h.nbins(), kind = ?h.kind(), "histogram built");
    Ok(h)
}

#[allow(clippy::too_many_arguments)]
fn cmd_fill(
    config: &Path,
    input: &Path,
    delimiter: Option<char>,
    columns: &[usize],
    weight_column: Option<usize>,
    skip_header: bool,
    threads: usize,
    chunk_size: usize,
    output: Option<&PathBuf>,
) -> Result<()> {
    let mut h = load_histogram(config)?;

    let table = input::read_table_path(input, delimiter, skip_header)?;
    tracing::info!(rows = table.n_rows(), columns = table.n_columns(), "input parsed");

    let coord_columns: Vec<usize> =
        if columns.is_empty() { (0..h.ndim()).collect() } else { columns.to_vec() };
    if coord_columns.len() != h.ndim() {
        anyhow::bail!(
            "--columns names {} columns, histogram has {} axes",
            coord_columns.len(),
            h.ndim()
        );
    }
    let coords = coord_columns.iter().map(|&i| table.column(i)).collect::<Result<Vec<_>>>()?;
    let weights = weight_column.map(|i| table.column(i)).transpose()?;

    let stats = if threads == 1 {
        h.fill_columns(&coords, weights)?
    } else {
        if threads > 0 {
            // Best-effort; if a global pool already exists, keep going.
            let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
        }
        tracing::info!(threads = rayon::current_num_threads(), "parallel fill");
        h.par_fill_columns(&coords, weights, chunk_size)?
    };
    tracing::info!(filled = stats.filled, dropped = stats.dropped, "fill complete");

    let out = serde_json::json!({
        "rows": table.n_rows(),
        "filled": stats.filled,
        "dropped": stats.dropped,
        "histogram": h.snapshot(),
    });
    write_json(output, out)
}

fn cmd_inspect(config: &Path, output: Option<&PathBuf>) -> Result<()> {
    let h = load_histogram(config)?;
    let axes: Vec<serde_json::Value> = h
        .axes()
        .iter()
        .map(|a| {
            serde_json::json!({
                "bins": a.n_bins(),
                "local_bins": a.local_count(),
                "underflow": a.has_underflow(),
                "overflow": a.has_overflow(),
                "range": [a.range().0, a.range().1],
                "edges": a.bin_edges(),
            })
        })
        .collect();
    let out = serde_json::json!({
        "ndim": h.ndim(),
        "nbins": h.nbins(),
        "kind": h.kind(),
        "axes": axes,
    });
    write_json(output, out)
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
