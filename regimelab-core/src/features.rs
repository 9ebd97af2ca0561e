//! Per-point features for the training dataset.
//!
//! Features are pure functions over a close series: close history in,
//! aligned `Option<f64>` series out, `None` during warm-up or wherever the
//! window contains a missing price. No value at index `t` depends on data
//! after `t`.

use crate::params::FeatureParams;

pub trait Feature: Send + Sync {
    /// Column name (e.g. "sma_20", "rsi_14").
    fn name(&self) -> &str;

    fn compute(&self, closes: &[f64]) -> Vec<Option<f64>>;
}

/// Simple moving average of closes.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }
}

impl Feature for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, closes: &[f64]) -> Vec<Option<f64>> {
        let n = closes.len();
        let mut out = vec![None; n];
        if n < self.period {
            return out;
        }

        let mut sum = 0.0;
        let mut missing = 0usize;
        for (i, &c) in closes.iter().enumerate() {
            if c.is_finite() {
                sum += c;
            } else {
                missing += 1;
            }
            if i >= self.period {
                let leaving = closes[i - self.period];
                if leaving.is_finite() {
                    sum -= leaving;
                } else {
                    missing -= 1;
                }
            }
            if i + 1 >= self.period && missing == 0 {
                out[i] = Some(sum / self.period as f64);
            }
        }
        out
    }
}

/// RSI from simple rolling means of gains and losses over `period` changes.
///
/// RSI = 100 - 100 / (1 + avg_gain / avg_loss); avg_loss == 0 gives 100,
/// and a window with no change at all has no value.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Feature for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, closes: &[f64]) -> Vec<Option<f64>> {
        let n = closes.len();
        let mut out = vec![None; n];
        if n <= self.period {
            return out;
        }

        for i in self.period..n {
            let mut gain = 0.0;
            let mut loss = 0.0;
            let mut valid = true;
            for j in (i + 1 - self.period)..=i {
                let change = closes[j] - closes[j - 1];
                if !change.is_finite() {
                    valid = false;
                    break;
                }
                if change > 0.0 {
                    gain += change;
                } else {
                    loss -= change;
                }
            }
            if !valid {
                continue;
            }
            let p = self.period as f64;
            let (avg_gain, avg_loss) = (gain / p, loss / p);
            if avg_gain == 0.0 && avg_loss == 0.0 {
                continue;
            }
            out[i] = Some(if avg_loss == 0.0 {
                100.0
            } else {
                100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
            });
        }
        out
    }
}

/// The dataset's feature set: short SMA, long SMA, RSI.
pub fn default_features(params: &FeatureParams) -> Vec<Box<dyn Feature>> {
    vec![
        Box::new(Sma::new(params.sma_short)),
        Box::new(Sma::new(params.sma_long)),
        Box::new(Rsi::new(params.rsi_period)),
    ]
}
