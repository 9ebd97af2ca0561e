//! Per-instrument analysis: regimes, labels and EV scores for one series.
//!
//! Pure function of the series and parameters. Nothing here touches shared
//! state, so instruments can be analyzed on independent threads and the
//! results merged afterwards.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::barrier::BarrierLabeler;
use crate::domain::{EvResult, Label, PriceSeries, Run};
use crate::evaluator::RegimeEvaluator;
use crate::params::PipelineParams;
use crate::regime::detect_regimes;
use crate::summary::{median_run_length, summarize_durations, DurationSummary};

/// Non-fatal conditions encountered while analyzing one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstrumentNotice {
    /// Fewer points than the trend window: no slopes, no runs.
    InsufficientData {
        instrument: String,
        required: usize,
        available: usize,
    },
    /// Slopes were computed but no run met the minimum duration.
    NoQualifiedRuns { instrument: String },
    /// Regime subsequence too short for any entry to reach its exit point.
    NoEligibleTrades {
        instrument: String,
        regime_points: usize,
        lookahead_days: usize,
    },
}

impl std::fmt::Display for InstrumentNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstrumentNotice::InsufficientData {
                instrument,
                required,
                available,
            } => write!(
                f,
                "{instrument}: insufficient data ({available} points, trend window needs {required})"
            ),
            InstrumentNotice::NoQualifiedRuns { instrument } => {
                write!(f, "{instrument}: no qualified trend runs")
            }
            InstrumentNotice::NoEligibleTrades {
                instrument,
                regime_points,
                lookahead_days,
            } => write!(
                f,
                "{instrument}: {regime_points} regime points leave no entry with a {lookahead_days}-point lookahead"
            ),
        }
    }
}

/// Everything computed for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesAnalysis {
    pub instrument: String,
    pub slopes: Vec<Option<f64>>,
    pub mask: Vec<bool>,
    pub runs: Vec<Run>,
    pub labels: Vec<Label>,
    pub ev_results: Vec<EvResult>,
    pub durations: Option<DurationSummary>,
    pub median_run_length: f64,
    pub notices: Vec<InstrumentNotice>,
}

/// Analyze one series. `params` must already be validated.
pub fn analyze_series(series: &PriceSeries, params: &PipelineParams) -> SeriesAnalysis {
    let instrument = series.instrument().to_string();
    let mut notices = Vec::new();

    let detection = detect_regimes(series, &params.regime);
    if series.len() < params.regime.trend_window {
        notices.push(InstrumentNotice::InsufficientData {
            instrument: instrument.clone(),
            required: params.regime.trend_window,
            available: series.len(),
        });
    } else if detection.runs.is_empty() {
        notices.push(InstrumentNotice::NoQualifiedRuns {
            instrument: instrument.clone(),
        });
    }

    let labels = BarrierLabeler::from_params(&params.labeling).label(series.closes());

    let median = median_run_length(&detection.runs);
    let evaluator = RegimeEvaluator::from_params(&params.evaluation);
    let ev_results = evaluator.evaluate(series, &detection.mask, median);

    let regime_points = detection.mask.iter().filter(|&&m| m).count();
    if regime_points > 0 && evaluator.eligible_count(regime_points) == 0 {
        notices.push(InstrumentNotice::NoEligibleTrades {
            instrument: instrument.clone(),
            regime_points,
            lookahead_days: params.evaluation.lookahead_days,
        });
    }

    debug!(
        instrument = %instrument,
        points = series.len(),
        runs = detection.runs.len(),
        regime_points,
        "instrument analyzed"
    );

    SeriesAnalysis {
        durations: summarize_durations(&instrument, &detection.runs),
        instrument,
        slopes: detection.slopes,
        mask: detection.mask,
        runs: detection.runs,
        labels,
        ev_results,
        median_run_length: median,
        notices,
    }
}
