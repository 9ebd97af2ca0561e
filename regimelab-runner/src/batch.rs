//! Batch orchestration: analyze every instrument of a price table.
//!
//! Instruments are independent, so the batch fans out over rayon and folds
//! the per-instrument results with [`BatchResult::merge`]. The merge is keyed
//! by instrument in a `BTreeMap`, so neither thread scheduling nor reduction
//! order changes the output.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use regimelab_core::data::PriceTable;
use regimelab_core::domain::{EvResult, Label, PriceSeries, Run};
use regimelab_core::summary::{last_run_recency, DurationSummary, RunRecency};
use regimelab_core::{analyze_series, InstrumentNotice, PipelineParams, SeriesAnalysis};

use crate::config::{ConfigError, PipelineConfig};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("price table contains no instruments")]
    EmptyTable,
}

/// One instrument's analysis together with the dates it was computed on.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentResult {
    pub dates: Vec<NaiveDate>,
    pub analysis: SeriesAnalysis,
}

/// Point-level label row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub instrument: String,
    pub index: usize,
    pub date: NaiveDate,
    pub label: Label,
}

/// Merged output of a batch, keyed by instrument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    instruments: BTreeMap<String, InstrumentResult>,
    /// Latest date in the analyzed table; reference point for recency.
    pub dataset_end: Option<NaiveDate>,
}

impl BatchResult {
    pub fn single(series: &PriceSeries, analysis: SeriesAnalysis) -> Self {
        let mut instruments = BTreeMap::new();
        instruments.insert(
            series.instrument().to_string(),
            InstrumentResult {
                dates: series.dates().to_vec(),
                analysis,
            },
        );
        Self {
            instruments,
            dataset_end: series.last_date(),
        }
    }

    /// Associative, order-independent union. An instrument present on both
    /// sides keeps the right-hand result.
    pub fn merge(mut self, other: BatchResult) -> BatchResult {
        self.instruments.extend(other.instruments);
        self.dataset_end = self.dataset_end.max(other.dataset_end);
        self
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn get(&self, instrument: &str) -> Option<&InstrumentResult> {
        self.instruments.get(instrument)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InstrumentResult)> {
        self.instruments.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.instruments.values().flat_map(|r| &r.analysis.runs)
    }

    pub fn ev_results(&self) -> impl Iterator<Item = &EvResult> {
        self.instruments.values().flat_map(|r| &r.analysis.ev_results)
    }

    pub fn durations(&self) -> impl Iterator<Item = &DurationSummary> {
        self.instruments
            .values()
            .filter_map(|r| r.analysis.durations.as_ref())
    }

    pub fn notices(&self) -> impl Iterator<Item = &InstrumentNotice> {
        self.instruments.values().flat_map(|r| &r.analysis.notices)
    }

    pub fn label_records(&self) -> Vec<LabelRecord> {
        self.instruments
            .iter()
            .flat_map(|(instrument, r)| {
                r.analysis
                    .labels
                    .iter()
                    .zip(&r.dates)
                    .enumerate()
                    .map(move |(index, (&label, &date))| LabelRecord {
                        instrument: instrument.clone(),
                        index,
                        date,
                        label,
                    })
            })
            .collect()
    }

    /// Last-run recency per instrument with at least one run, measured from
    /// `dataset_end`, most recent first.
    pub fn recency(&self) -> Vec<RunRecency> {
        let Some(reference) = self.dataset_end else {
            return Vec::new();
        };
        let mut out: Vec<RunRecency> = self
            .instruments
            .values()
            .filter_map(|r| last_run_recency(&r.analysis.runs, reference))
            .collect();
        out.sort_by(|a, b| {
            a.days_since_last_run
                .cmp(&b.days_since_last_run)
                .then_with(|| a.instrument.cmp(&b.instrument))
        });
        out
    }
}

/// Validated batch runner.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    params: PipelineParams,
    parallel: bool,
}

impl BatchRunner {
    /// Fails fast on an invalid configuration, before any instrument runs.
    pub fn new(config: &PipelineConfig) -> Result<Self, BatchError> {
        Ok(Self {
            params: config.validate()?,
            parallel: true,
        })
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    pub fn run(&self, table: &PriceTable) -> Result<BatchResult, BatchError> {
        if table.is_empty() {
            return Err(BatchError::EmptyTable);
        }
        let started = Instant::now();
        info!(
            instruments = table.len(),
            points = table.point_count(),
            parallel = self.parallel,
            "batch started"
        );

        let series: Vec<&PriceSeries> = table.iter().collect();
        let analyze = |s: &&PriceSeries| BatchResult::single(s, analyze_series(s, &self.params));
        let result = if self.parallel {
            series
                .par_iter()
                .map(analyze)
                .reduce(BatchResult::default, BatchResult::merge)
        } else {
            series
                .iter()
                .map(analyze)
                .fold(BatchResult::default(), BatchResult::merge)
        };

        for notice in result.notices() {
            warn!(%notice, "instrument skipped or degraded");
        }
        info!(
            instruments = result.len(),
            runs = result.runs().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        Ok(result)
    }
}

/// Validate `config` and analyze every instrument of `table` in parallel.
pub fn run_batch(table: &PriceTable, config: &PipelineConfig) -> Result<BatchResult, BatchError> {
    BatchRunner::new(config)?.run(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regimelab_core::params::RegimeParams;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn rally_config() -> PipelineConfig {
        PipelineConfig {
            regime: RegimeParams {
                trend_window: 3,
                slope_threshold: 0.0187,
                min_duration: 3,
                ..RegimeParams::default()
            },
            ..PipelineConfig::default()
        }
    }

    fn table() -> PriceTable {
        PriceTable::from_series([
            PriceSeries::from_closes(
                "UP",
                day(1),
                &[100.0, 102.0, 104.0, 106.0, 108.0, 110.0, 108.0, 106.0],
            ),
            PriceSeries::from_closes("FLAT", day(3), &[10.0; 12]),
            PriceSeries::from_closes("TINY", day(1), &[5.0, 5.1]),
        ])
    }

    #[test]
    fn invalid_config_fails_before_running() {
        let mut config = rally_config();
        config.labeling.max_holding = 0;
        assert!(matches!(
            run_batch(&table(), &config),
            Err(BatchError::Config(_))
        ));
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(matches!(
            run_batch(&PriceTable::new(), &rally_config()),
            Err(BatchError::EmptyTable)
        ));
    }

    #[test]
    fn one_bad_instrument_does_not_abort_batch() {
        let result = run_batch(&table(), &rally_config()).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result.runs().count(), 1);
        assert!(result.notices().any(|n| matches!(
            n,
            InstrumentNotice::InsufficientData { instrument, .. } if instrument == "TINY"
        )));
        assert_eq!(result.dataset_end, Some(day(14)));
    }

    #[test]
    fn parallel_matches_sequential() {
        let runner = BatchRunner::new(&rally_config()).unwrap();
        let par = runner.run(&table()).unwrap();
        let seq = runner.clone().with_parallelism(false).run(&table()).unwrap();
        assert_eq!(par, seq);
    }

    #[test]
    fn merge_is_order_independent() {
        let t = table();
        let params = rally_config().validate().unwrap();
        let parts: Vec<BatchResult> = t
            .iter()
            .map(|s| BatchResult::single(s, analyze_series(s, &params)))
            .collect();

        let forward = parts
            .iter()
            .cloned()
            .fold(BatchResult::default(), BatchResult::merge);
        let backward = parts
            .iter()
            .rev()
            .cloned()
            .fold(BatchResult::default(), BatchResult::merge);
        assert_eq!(forward, backward);
    }

    #[test]
    fn label_records_carry_dates() {
        let result = run_batch(&table(), &rally_config()).unwrap();
        let labels = result.label_records();
        let up: Vec<&LabelRecord> = labels.iter().filter(|r| r.instrument == "UP").collect();
        assert_eq!(up.len(), 8);
        assert_eq!(up[0].date, day(1));
        assert_eq!(up[0].label, Label::WinBarrier);
    }

    #[test]
    fn recency_measured_from_dataset_end() {
        let result = run_batch(&table(), &rally_config()).unwrap();
        let recency = result.recency();
        assert_eq!(recency.len(), 1);
        // UP's run ends 2024-05-05; the table ends 2024-05-14.
        assert_eq!(recency[0].days_since_last_run, 9);
    }
}
