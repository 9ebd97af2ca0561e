//! RegimeLab Core: trend-regime detection and triple-barrier scoring.
//!
//! This crate holds the per-instrument analytics:
//! - Trailing least-squares slope over a fixed window (linear or log prices)
//! - Qualification of sustained uptrend runs from thresholded slopes
//! - Triple-barrier labels (take-profit, stop-loss, time limit)
//! - Expected-value scoring of take-profit candidates restricted to regimes
//! - Duration and recency summaries, SMA/RSI features, gated crossover signals
//! - Price-table loading (CSV, Parquet) and deterministic synthetic prices
//!
//! Every operation is a pure function of its inputs; batch orchestration
//! lives in `regimelab-runner`.

pub mod barrier;
pub mod data;
pub mod domain;
pub mod evaluator;
pub mod features;
pub mod params;
pub mod pipeline;
pub mod regime;
pub mod signal;
pub mod slope;
pub mod summary;

pub use barrier::{resolve_touches, BarrierLabeler};
pub use domain::{EvResult, Label, PricePoint, PriceSeries, Run, SeriesError};
pub use evaluator::RegimeEvaluator;
pub use params::{EvalParams, FeatureParams, LabelParams, ParamError, PipelineParams, RegimeParams};
pub use pipeline::{analyze_series, InstrumentNotice, SeriesAnalysis};
pub use regime::{detect_regimes, RegimeDetection, RunQualifier};
pub use slope::{trend_flags, SlopeEstimator, SlopeMethod};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the runner moves across rayon workers
    /// is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<PriceSeries>();
        require_sync::<PriceSeries>();
        require_send::<data::PriceTable>();
        require_sync::<data::PriceTable>();
        require_send::<Run>();
        require_sync::<Run>();
        require_send::<Label>();
        require_sync::<Label>();
        require_send::<EvResult>();
        require_sync::<EvResult>();
        require_send::<SeriesAnalysis>();
        require_sync::<SeriesAnalysis>();
        require_send::<InstrumentNotice>();
        require_sync::<InstrumentNotice>();
        require_send::<PipelineParams>();
        require_sync::<PipelineParams>();

        require_send::<SlopeEstimator>();
        require_sync::<SlopeEstimator>();
        require_send::<RunQualifier>();
        require_sync::<RunQualifier>();
        require_send::<BarrierLabeler>();
        require_sync::<BarrierLabeler>();
        require_send::<RegimeEvaluator>();
        require_sync::<RegimeEvaluator>();
        require_send::<Box<dyn features::Feature>>();
        require_sync::<Box<dyn features::Feature>>();
    }
}
