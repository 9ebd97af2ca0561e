//! Trend-regime segmentation.
//!
//! Per-point trend flags are scanned left to right with a two-state machine
//! (`NoRun` / `Open`). A run opens on the first `true` after a `false` (or at
//! series start) and closes on the next `false` or at series end. Closed runs
//! shorter than `min_duration` are discarded; the rest become [`Run`]s and are
//! marked in the qualified mask.

use serde::{Deserialize, Serialize};

use crate::domain::{PriceSeries, Run};
use crate::params::RegimeParams;
use crate::slope::{trend_flags, SlopeEstimator};

/// Index-only run produced by [`RunQualifier`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSpan {
    pub start: usize,
    /// Inclusive.
    pub end: usize,
    pub length: usize,
    pub avg_slope: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Qualification {
    pub spans: Vec<RunSpan>,
    /// `true` iff the point lies inside some span.
    pub mask: Vec<bool>,
}

#[derive(Debug, Clone, Copy)]
enum RunState {
    NoRun,
    Open { start: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct RunQualifier {
    min_duration: usize,
}

impl RunQualifier {
    pub fn new(min_duration: usize) -> Self {
        assert!(min_duration >= 1, "min_duration must be >= 1");
        Self { min_duration }
    }

    /// Single forward pass over `flags`. `slopes` is aligned with `flags` and
    /// only feeds `avg_slope`; missing entries are skipped in the mean.
    pub fn qualify(&self, flags: &[bool], slopes: &[Option<f64>]) -> Qualification {
        let n = flags.len();
        let mut out = Qualification {
            spans: Vec::new(),
            mask: vec![false; n],
        };

        let mut state = RunState::NoRun;
        for (i, &flag) in flags.iter().enumerate() {
            state = match (state, flag) {
                (RunState::NoRun, false) => RunState::NoRun,
                (RunState::NoRun, true) => RunState::Open { start: i },
                (open @ RunState::Open { .. }, true) => open,
                (RunState::Open { start }, false) => {
                    self.close(start, i - 1, slopes, &mut out);
                    RunState::NoRun
                }
            };
        }
        if let RunState::Open { start } = state {
            self.close(start, n - 1, slopes, &mut out);
        }

        out
    }

    fn close(&self, start: usize, end: usize, slopes: &[Option<f64>], out: &mut Qualification) {
        let length = end - start + 1;
        if length < self.min_duration {
            return;
        }
        out.mask[start..=end].fill(true);
        out.spans.push(RunSpan {
            start,
            end,
            length,
            avg_slope: mean_defined(slopes.get(start..=end).unwrap_or(&[])),
        });
    }
}

/// Mean of the `Some` values; NaN if there are none.
fn mean_defined(values: &[Option<f64>]) -> f64 {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Slopes, flags, mask and runs for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeDetection {
    pub slopes: Vec<Option<f64>>,
    pub flags: Vec<bool>,
    pub mask: Vec<bool>,
    pub runs: Vec<Run>,
}

/// Run the slope estimator and run qualifier over one series.
pub fn detect_regimes(series: &PriceSeries, params: &RegimeParams) -> RegimeDetection {
    let slopes = SlopeEstimator::from_params(params).estimate(series.closes());
    let flags = trend_flags(&slopes, params.slope_threshold);
    let Qualification { spans, mask } =
        RunQualifier::new(params.min_duration).qualify(&flags, &slopes);

    let runs = spans
        .iter()
        .filter_map(|span| {
            Some(Run {
                instrument: series.instrument().to_string(),
                start_index: span.start,
                end_index: span.end,
                length: span.length,
                avg_slope: span.avg_slope,
                start_date: series.date(span.start)?,
                end_date: series.date(span.end)?,
            })
        })
        .collect();

    RegimeDetection {
        slopes,
        flags,
        mask,
        runs,
    }
}
