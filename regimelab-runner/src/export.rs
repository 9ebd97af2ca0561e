//! Output tables and manifest.
//!
//! Every table is a flat CSV with a header row; floats are written with six
//! decimals, absent values as empty cells. `manifest.json` records the schema
//! version, the config and its fingerprint, and every non-fatal notice.
//! Manifests with an unknown schema version are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use regimelab_core::domain::{EvResult, Run};
use regimelab_core::summary::{DurationSummary, RunRecency};
use regimelab_core::InstrumentNotice;

use crate::batch::{BatchResult, LabelRecord};
use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::selection::BestCandidate;

/// Current schema version for `manifest.json`.
pub const SCHEMA_VERSION: u32 = 1;

fn float(v: f64) -> String {
    format!("{v:.6}")
}

fn opt_float(v: Option<f64>) -> String {
    v.map(float).unwrap_or_default()
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── CSV tables ─────────────────────────────────────────────────────

/// Columns: instrument, start_index, end_index, start_date, end_date, length, avg_slope
pub fn export_runs_csv<'a>(runs: impl IntoIterator<Item = &'a Run>) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "instrument",
        "start_index",
        "end_index",
        "start_date",
        "end_date",
        "length",
        "avg_slope",
    ])?;
    for r in runs {
        wtr.write_record([
            &r.instrument,
            &r.start_index.to_string(),
            &r.end_index.to_string(),
            &r.start_date.to_string(),
            &r.end_date.to_string(),
            &r.length.to_string(),
            &float(r.avg_slope),
        ])?;
    }
    finish(wtr)
}

/// Columns: instrument, index, date, label (1 win, 0 loss, -1 undecided)
pub fn export_labels_csv(labels: &[LabelRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["instrument", "index", "date", "label"])?;
    for l in labels {
        wtr.write_record([
            &l.instrument,
            &l.index.to_string(),
            &l.date.to_string(),
            &l.label.code().to_string(),
        ])?;
    }
    finish(wtr)
}

pub fn export_ev_csv<'a>(results: impl IntoIterator<Item = &'a EvResult>) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "instrument",
        "take_profit",
        "win_rate",
        "loss_rate",
        "ev_net",
        "ev_realistic",
        "ev_with_costs",
        "trade_count",
        "wins",
        "losses",
        "win_loss_ratio",
        "median_run_length",
    ])?;
    for r in results {
        wtr.write_record([
            &r.instrument,
            &float(r.take_profit),
            &float(r.win_rate),
            &float(r.loss_rate),
            &float(r.ev_net),
            &float(r.ev_realistic),
            &float(r.ev_with_costs),
            &r.trade_count.to_string(),
            &r.wins.to_string(),
            &r.losses.to_string(),
            &float(r.win_loss_ratio()),
            &float(r.median_run_length),
        ])?;
    }
    finish(wtr)
}

pub fn export_best_csv(best: &[BestCandidate]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "instrument",
        "take_profit",
        "ev_with_costs",
        "ev_realistic",
        "win_rate",
        "loss_rate",
        "trade_count",
        "median_run_length",
        "days_since_last_run",
    ])?;
    for (rank, b) in best.iter().enumerate() {
        wtr.write_record([
            &(rank + 1).to_string(),
            &b.instrument,
            &float(b.take_profit),
            &float(b.ev_with_costs),
            &float(b.ev_realistic),
            &float(b.win_rate),
            &float(b.loss_rate),
            &b.trade_count.to_string(),
            &float(b.median_run_length),
            &b.days_since_last_run.map(|d| d.to_string()).unwrap_or_default(),
        ])?;
    }
    finish(wtr)
}

/// Duration summary joined with last-run recency.
pub fn export_durations_csv<'a>(
    durations: impl IntoIterator<Item = &'a DurationSummary>,
    recency: &[RunRecency],
) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "instrument",
        "run_count",
        "avg_length",
        "median_length",
        "last_run_start",
        "last_run_end",
        "days_since_last_run",
    ])?;
    for d in durations {
        let last = recency.iter().find(|r| r.instrument == d.instrument);
        wtr.write_record([
            d.instrument.clone(),
            d.run_count.to_string(),
            float(d.avg_length),
            float(d.median_length),
            last.map(|r| r.last_start.to_string()).unwrap_or_default(),
            last.map(|r| r.last_end.to_string()).unwrap_or_default(),
            last.map(|r| r.days_since_last_run.to_string())
                .unwrap_or_default(),
        ])?;
    }
    finish(wtr)
}

/// Columns: instrument, date, close, slope, in_regime, <features...>, signal, label
pub fn export_dataset_csv(dataset: &Dataset) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header: Vec<&str> = vec!["instrument", "date", "close", "slope", "in_regime"];
    header.extend(dataset.feature_names.iter().map(String::as_str));
    header.extend(["signal", "label"]);
    wtr.write_record(&header)?;

    for row in &dataset.rows {
        let mut record = vec![
            row.instrument.clone(),
            row.date.to_string(),
            float(row.close),
            opt_float(row.slope),
            u8::from(row.in_regime).to_string(),
        ];
        record.extend(row.features.iter().map(|&f| opt_float(f)));
        record.push(row.signal.to_string());
        record.push(row.label.to_string());
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

// ─── Manifest ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub config_fingerprint: String,
    pub config: PipelineConfig,
    pub instrument_count: usize,
    pub run_count: usize,
    pub dataset_end: Option<NaiveDate>,
    pub notices: Vec<InstrumentNotice>,
    pub files: Vec<String>,
}

impl Manifest {
    pub fn new(batch: &BatchResult, config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            schema_version: SCHEMA_VERSION,
            config_fingerprint: config.fingerprint()?,
            config: config.clone(),
            instrument_count: batch.len(),
            run_count: batch.runs().count(),
            dataset_end: batch.dataset_end,
            notices: batch.notices().cloned().collect(),
            files: Vec::new(),
        })
    }
}

/// Read a manifest, rejecting schema versions newer than this build.
pub fn load_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let manifest: Manifest =
        serde_json::from_str(&json).context("failed to deserialize manifest.json")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write every output table plus `manifest.json` into `output_dir`,
/// creating it if needed. Returns the manifest as written.
pub fn save_outputs(
    output_dir: &Path,
    batch: &BatchResult,
    best: &[BestCandidate],
    dataset: Option<&Dataset>,
    config: &PipelineConfig,
) -> Result<Manifest> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let recency = batch.recency();
    let mut tables: Vec<(&str, String)> = vec![
        ("runs.csv", export_runs_csv(batch.runs())?),
        ("labels.csv", export_labels_csv(&batch.label_records())?),
        ("ev_results.csv", export_ev_csv(batch.ev_results())?),
        ("best.csv", export_best_csv(best)?),
        ("durations.csv", export_durations_csv(batch.durations(), &recency)?),
    ];
    if let Some(dataset) = dataset {
        tables.push(("dataset.csv", export_dataset_csv(dataset)?));
    }

    let mut manifest = Manifest::new(batch, config)?;
    for (name, body) in &tables {
        let path: PathBuf = output_dir.join(name);
        std::fs::write(&path, body)
            .with_context(|| format!("failed to write {}", path.display()))?;
        manifest.files.push(name.to_string());
    }

    let json = serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?;
    std::fs::write(output_dir.join("manifest.json"), json)
        .context("failed to write manifest.json")?;

    info!(
        dir = %output_dir.display(),
        files = manifest.files.len(),
        "outputs written"
    );
    Ok(manifest)
}
