//! Regime-gated moving-average crossover signal.
//!
//! Crossover signals are only emitted while the point sits inside a
//! qualified trend regime; outside regimes the signal is always `Hold`.

use serde::{Deserialize, Serialize};

use crate::features::{Feature, Sma};
use crate::params::FeatureParams;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl Signal {
    pub fn code(self) -> i8 {
        match self {
            Signal::Buy => 1,
            Signal::Sell => -1,
            Signal::Hold => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrossoverSignal {
    short: Sma,
    long: Sma,
}

impl CrossoverSignal {
    pub fn new(short_period: usize, long_period: usize) -> Self {
        assert!(short_period < long_period, "short period must be < long period");
        Self {
            short: Sma::new(short_period),
            long: Sma::new(long_period),
        }
    }

    pub fn from_params(params: &FeatureParams) -> Self {
        Self::new(params.sma_short, params.sma_long)
    }

    pub fn generate(&self, closes: &[f64], in_regime: &[bool]) -> Vec<Signal> {
        let short = self.short.compute(closes);
        let long = self.long.compute(closes);
        short
            .iter()
            .zip(&long)
            .zip(in_regime)
            .map(|((s, l), &gated)| match (s, l) {
                (Some(s), Some(l)) if gated && s > l => Signal::Buy,
                (Some(s), Some(l)) if gated && s < l => Signal::Sell,
                _ => Signal::Hold,
            })
            .collect()
    }

    /// Signal at the final point, `None` for an empty series.
    pub fn latest(&self, closes: &[f64], in_regime: &[bool]) -> Option<Signal> {
        self.generate(closes, in_regime).last().copied()
    }
}
