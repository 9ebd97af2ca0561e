//! Pipeline parameters and their validation.
//!
//! Every parameter set is checked before any instrument is processed: a bad
//! window or horizon would otherwise yield meaningless output for the whole
//! batch rather than failing for one instrument.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::slope::SlopeMethod;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("trend_window must be >= 2 (got {0})")]
    TrendWindow(usize),

    #[error("slope_threshold must be finite (got {0})")]
    SlopeThreshold(f64),

    #[error("min_duration must be >= 1 (got {0})")]
    MinDuration(usize),

    #[error("{name} must be a finite value > 0 (got {value})")]
    NonPositive { name: &'static str, value: f64 },

    #[error("max_holding must be >= 1 (got {0})")]
    MaxHolding(usize),

    #[error("take_profit_candidates must not be empty")]
    NoCandidates,

    #[error("lookahead_days must be >= 1 (got {0})")]
    Lookahead(usize),

    #[error("cost_per_trade must be a finite value >= 0 (got {0})")]
    Cost(f64),

    #[error("{name} period must be >= 1 (got {value})")]
    Period { name: &'static str, value: usize },

    #[error("sma_short ({short}) must be shorter than sma_long ({long})")]
    CrossoverOrder { short: usize, long: usize },
}

fn positive(name: &'static str, value: f64) -> Result<(), ParamError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParamError::NonPositive { name, value })
    }
}

/// Trend-regime detection: slope window, threshold and duration filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeParams {
    pub trend_window: usize,
    /// Slope units per point, on log or linear price depending on `use_log`.
    pub slope_threshold: f64,
    pub min_duration: usize,
    pub use_log: bool,
    pub slope_method: SlopeMethod,
}

impl Default for RegimeParams {
    fn default() -> Self {
        Self {
            trend_window: 60,
            slope_threshold: 0.001,
            min_duration: 7,
            use_log: true,
            slope_method: SlopeMethod::Exact,
        }
    }
}

impl RegimeParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.trend_window < 2 {
            return Err(ParamError::TrendWindow(self.trend_window));
        }
        if !self.slope_threshold.is_finite() {
            return Err(ParamError::SlopeThreshold(self.slope_threshold));
        }
        if self.min_duration < 1 {
            return Err(ParamError::MinDuration(self.min_duration));
        }
        Ok(())
    }
}

/// First-touch barrier labeling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelParams {
    pub take_profit: f64,
    pub stop_loss: f64,
    pub max_holding: usize,
}

impl Default for LabelParams {
    fn default() -> Self {
        Self {
            take_profit: 0.05,
            stop_loss: 0.03,
            max_holding: 20,
        }
    }
}

impl LabelParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        positive("take_profit", self.take_profit)?;
        positive("stop_loss", self.stop_loss)?;
        if self.max_holding < 1 {
            return Err(ParamError::MaxHolding(self.max_holding));
        }
        Ok(())
    }
}

/// Expected-value scoring of take-profit candidates inside regimes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalParams {
    pub take_profit_candidates: Vec<f64>,
    pub stop_loss_pct: f64,
    pub lookahead_days: usize,
    /// Flat cost charged on entry and again on exit.
    pub cost_per_trade: f64,
}

impl Default for EvalParams {
    fn default() -> Self {
        Self {
            take_profit_candidates: vec![0.04, 0.08, 0.10],
            stop_loss_pct: 0.02,
            lookahead_days: 5,
            cost_per_trade: 0.001,
        }
    }
}

impl EvalParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.take_profit_candidates.is_empty() {
            return Err(ParamError::NoCandidates);
        }
        for &tp in &self.take_profit_candidates {
            positive("take_profit_candidates", tp)?;
        }
        positive("stop_loss_pct", self.stop_loss_pct)?;
        if self.lookahead_days < 1 {
            return Err(ParamError::Lookahead(self.lookahead_days));
        }
        if !self.cost_per_trade.is_finite() || self.cost_per_trade < 0.0 {
            return Err(ParamError::Cost(self.cost_per_trade));
        }
        Ok(())
    }
}

/// Feature columns for the training dataset and the gated crossover signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureParams {
    pub sma_short: usize,
    pub sma_long: usize,
    pub rsi_period: usize,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            sma_short: 20,
            sma_long: 50,
            rsi_period: 14,
        }
    }
}

impl FeatureParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        for (name, value) in [
            ("sma_short", self.sma_short),
            ("sma_long", self.sma_long),
            ("rsi", self.rsi_period),
        ] {
            if value < 1 {
                return Err(ParamError::Period { name, value });
            }
        }
        if self.sma_short >= self.sma_long {
            return Err(ParamError::CrossoverOrder {
                short: self.sma_short,
                long: self.sma_long,
            });
        }
        Ok(())
    }
}

/// The parameter sets consumed by [`crate::pipeline::analyze_series`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    pub regime: RegimeParams,
    pub labeling: LabelParams,
    pub evaluation: EvalParams,
}

impl PipelineParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        self.regime.validate()?;
        self.labeling.validate()?;
        self.evaluation.validate()
    }
}
