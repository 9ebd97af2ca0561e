//! Expected-value scoring of take-profit candidates inside qualified regimes.
//!
//! Only points where the qualified mask is set are considered, re-indexed as
//! a dense subsequence, so `lookahead_days` counts regime points rather than
//! calendar days and silently spans the gaps between separate runs. Each
//! eligible entry `j` is compared against the single exit point
//! `j + lookahead_days`; this is a horizon-exit test, not a first-touch scan.

use tracing::debug;

use crate::domain::{EvResult, PriceSeries};
use crate::params::EvalParams;

#[derive(Debug, Clone)]
pub struct RegimeEvaluator {
    candidates: Vec<f64>,
    stop_loss_pct: f64,
    lookahead: usize,
    cost_per_trade: f64,
}

impl RegimeEvaluator {
    pub fn from_params(params: &EvalParams) -> Self {
        assert!(params.lookahead_days >= 1, "lookahead_days must be >= 1");
        Self {
            candidates: params.take_profit_candidates.clone(),
            stop_loss_pct: params.stop_loss_pct,
            lookahead: params.lookahead_days,
            cost_per_trade: params.cost_per_trade,
        }
    }

    /// Closes at qualified points, in time order.
    pub fn regime_closes(series: &PriceSeries, mask: &[bool]) -> Vec<f64> {
        series
            .closes()
            .iter()
            .zip(mask)
            .filter(|(_, &in_regime)| in_regime)
            .map(|(&close, _)| close)
            .collect()
    }

    /// Number of entry points with a full lookahead inside the regime subsequence.
    pub fn eligible_count(&self, regime_points: usize) -> usize {
        regime_points.saturating_sub(self.lookahead)
    }

    /// One record per candidate take-profit, in candidate order.
    pub fn evaluate(
        &self,
        series: &PriceSeries,
        mask: &[bool],
        median_run_length: f64,
    ) -> Vec<EvResult> {
        let closes = Self::regime_closes(series, mask);
        debug!(
            instrument = series.instrument(),
            regime_points = closes.len(),
            eligible = self.eligible_count(closes.len()),
            "scoring take-profit candidates"
        );
        self.candidates
            .iter()
            .map(|&tp| self.score(series.instrument(), &closes, tp, median_run_length))
            .collect()
    }

    fn score(&self, instrument: &str, closes: &[f64], tp: f64, median_run_length: f64) -> EvResult {
        let eligible = self.eligible_count(closes.len());
        if eligible == 0 {
            return EvResult::empty(instrument, tp, median_run_length);
        }

        let mut wins = 0usize;
        let mut losses = 0usize;
        for j in 0..eligible {
            let entry = closes[j];
            let exit = closes[j + self.lookahead];
            if exit >= entry * (1.0 + tp) {
                wins += 1;
            } else if exit <= entry * (1.0 - self.stop_loss_pct) {
                losses += 1;
            }
        }

        let win_rate = wins as f64 / eligible as f64;
        let loss_rate = losses as f64 / eligible as f64;
        let ev_net = win_rate * tp - loss_rate * self.stop_loss_pct;
        // Regimes that historically end before the holding period elapses
        // cannot be relied on to deliver the target.
        let ev_realistic = if median_run_length < self.lookahead as f64 {
            -ev_net.abs()
        } else {
            ev_net
        };
        let ev_with_costs = ev_realistic - 2.0 * self.cost_per_trade;

        EvResult {
            instrument: instrument.to_string(),
            take_profit: tp,
            win_rate,
            loss_rate,
            ev_net,
            ev_realistic,
            ev_with_costs,
            trade_count: eligible,
            wins,
            losses,
            median_run_length,
        }
    }
}
