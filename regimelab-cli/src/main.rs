//! RegimeLab CLI: regime analysis, signals and config scaffolding.
//!
//! Commands:
//! - `analyze`: run the batch over a price file (or synthetic prices) and
//!   write runs, labels, EV scores, best candidates and a manifest
//! - `signal`: latest regime-gated crossover signal for one ticker
//! - `init-config`: write the default pipeline TOML
//! - `synth`: write a synthetic price table to CSV or Parquet

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use regimelab_core::data::{synthetic_table, PriceTable, SyntheticConfig};
use regimelab_core::regime::detect_regimes;
use regimelab_core::signal::CrossoverSignal;
use regimelab_runner::{
    build_dataset, save_outputs, select_best, BatchRunner, BestCandidate, PipelineConfig,
};

#[derive(Parser)]
#[command(
    name = "regimelab",
    about = "RegimeLab CLI: trend regimes, barrier labels and expected-value screening"
)]
struct Cli {
    /// Also append logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze every instrument in a price table.
    Analyze {
        /// Long-format price file (.csv or .parquet) with date, ticker, close columns.
        #[arg(long, required_unless_present = "synthetic")]
        input: Option<PathBuf>,

        /// Pipeline TOML. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for the output tables and manifest.
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,

        /// Also write the per-point training dataset.
        #[arg(long, default_value_t = false)]
        dataset: bool,

        /// Analyze N synthetic instruments instead of reading --input.
        #[arg(long, conflicts_with = "input")]
        synthetic: Option<usize>,

        /// Process instruments on a single thread.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Number of best candidates to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Print the latest regime-gated crossover signal for one ticker.
    Signal {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        ticker: String,

        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write the default pipeline configuration.
    InitConfig {
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Write a synthetic price table (.csv or .parquet).
    Synth {
        path: PathBuf,

        #[arg(long, default_value_t = 10)]
        count: usize,

        #[arg(long, default_value_t = 750)]
        days: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file)?;

    match cli.command {
        Commands::Analyze {
            input,
            config,
            output_dir,
            dataset,
            synthetic,
            sequential,
            top,
        } => run_analyze(
            input.as_deref(),
            config.as_deref(),
            &output_dir,
            dataset,
            synthetic,
            sequential,
            top,
        ),
        Commands::Signal {
            input,
            ticker,
            config,
        } => run_signal(&input, &ticker, config.as_deref()),
        Commands::InitConfig { path, force } => run_init_config(&path, force),
        Commands::Synth {
            path,
            count,
            days,
            seed,
        } => run_synth(&path, count, days, seed),
    }
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing(log_file: Option<PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| anyhow!("failed to create log directory {parent:?}: {err}"))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| anyhow!("failed to open log file {path:?}: {err}"))?;
        let (non_blocking_writer, guard) = non_blocking(file);
        // The writer must outlive every log call; the process owns it until exit.
        let _guard = Box::leak(Box::new(guard));
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(non_blocking_writer);
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn run_analyze(
    input: Option<&Path>,
    config_path: Option<&Path>,
    output_dir: &Path,
    write_dataset: bool,
    synthetic: Option<usize>,
    sequential: bool,
    top: usize,
) -> Result<()> {
    let config = load_config(config_path)?;
    // Validate before touching the price data.
    let runner = BatchRunner::new(&config)?.with_parallelism(!sequential);

    let table = match (synthetic, input) {
        (Some(count), _) => {
            info!(count, "generating synthetic prices");
            synthetic_table(count, &SyntheticConfig::default())
        }
        (None, Some(path)) => PriceTable::load(path)
            .with_context(|| format!("failed to load prices from {}", path.display()))?,
        (None, None) => bail!("one of --input or --synthetic is required"),
    };

    let batch = runner.run(&table)?;
    let best = select_best(&batch, &config.selection);
    let dataset = write_dataset.then(|| build_dataset(&table, &batch, &config.features));
    let manifest = save_outputs(output_dir, &batch, &best, dataset.as_ref(), &config)?;

    print_summary(&best, top);
    println!();
    println!(
        "Instruments: {}  Runs: {}  Notices: {}",
        manifest.instrument_count,
        manifest.run_count,
        manifest.notices.len()
    );
    println!("Outputs saved to: {}", output_dir.display());
    Ok(())
}

fn print_summary(best: &[BestCandidate], top: usize) {
    println!();
    println!("=== Best Take-Profit per Instrument ===");
    if best.is_empty() {
        println!("(no instrument produced an eligible trade)");
        return;
    }
    println!(
        "{:<4} {:<10} {:>7} {:>10} {:>8} {:>7} {:>9}",
        "Rank", "Ticker", "TP", "EV(cost)", "WinRate", "Trades", "DaysSince"
    );
    for (rank, b) in best.iter().take(top).enumerate() {
        println!(
            "{:<4} {:<10} {:>6.2}% {:>9.4}% {:>7.1}% {:>7} {:>9}",
            rank + 1,
            b.instrument,
            b.take_profit * 100.0,
            b.ev_with_costs * 100.0,
            b.win_rate * 100.0,
            b.trade_count,
            b.days_since_last_run
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
        );
    }
}

fn run_signal(input: &Path, ticker: &str, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate()?;

    let table = PriceTable::load(input)
        .with_context(|| format!("failed to load prices from {}", input.display()))?;
    let Some(series) = table.get(ticker) else {
        bail!("ticker '{ticker}' not found in {}", input.display());
    };

    let detection = detect_regimes(series, &config.regime);
    let signal = CrossoverSignal::from_params(&config.features)
        .latest(series.closes(), &detection.mask)
        .unwrap_or_default();

    println!("Ticker:     {ticker}");
    if let Some(date) = series.last_date() {
        println!("As of:      {date}");
    }
    println!(
        "In regime:  {}",
        if detection.mask.last().copied().unwrap_or(false) { "yes" } else { "no" }
    );
    match detection.runs.last() {
        Some(run) => println!(
            "Last run:   {} to {} ({} points)",
            run.start_date, run.end_date, run.length
        ),
        None => println!("Last run:   none"),
    }
    println!("Signal:     {signal:?}");
    Ok(())
}

fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let toml = PipelineConfig::default().to_toml()?;
    std::fs::write(path, toml).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Default config written to: {}", path.display());
    Ok(())
}

fn run_synth(path: &Path, count: usize, days: usize, seed: u64) -> Result<()> {
    let config = SyntheticConfig {
        seed,
        days,
        ..SyntheticConfig::default()
    };
    let table = synthetic_table(count, &config);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => table.write_csv(path)?,
        "parquet" | "pq" => table.write_parquet(path)?,
        _ => bail!("unsupported output format '{}' (expected .csv or .parquet)", path.display()),
    }
    println!(
        "Synthetic prices ({count} instruments x {days} days) written to: {}",
        path.display()
    );
    Ok(())
}
