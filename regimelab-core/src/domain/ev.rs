//! Expected-value record for one (instrument, take-profit) pair.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvResult {
    pub instrument: String,
    pub take_profit: f64,
    pub win_rate: f64,
    pub loss_rate: f64,
    pub ev_net: f64,
    pub ev_realistic: f64,
    pub ev_with_costs: f64,
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub median_run_length: f64,
}

impl EvResult {
    /// Record for an instrument with no eligible entry points.
    pub fn empty(instrument: impl Into<String>, take_profit: f64, median_run_length: f64) -> Self {
        Self {
            instrument: instrument.into(),
            take_profit,
            win_rate: 0.0,
            loss_rate: 0.0,
            ev_net: 0.0,
            ev_realistic: 0.0,
            ev_with_costs: 0.0,
            trade_count: 0,
            wins: 0,
            losses: 0,
            median_run_length,
        }
    }

    /// Wins per loss. `+inf` when there are wins but no losses, `0.0` when
    /// there are neither.
    pub fn win_loss_ratio(&self) -> f64 {
        match (self.wins, self.losses) {
            (0, 0) => 0.0,
            (_, 0) => f64::INFINITY,
            (w, l) => w as f64 / l as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_with_zero_losses_is_infinite() {
        let mut r = EvResult::empty("X", 0.05, 3.0);
        r.wins = 4;
        assert!(r.win_loss_ratio().is_infinite());
        r.losses = 2;
        assert_eq!(r.win_loss_ratio(), 2.0);
    }

    #[test]
    fn ratio_without_trades_is_zero() {
        assert_eq!(EvResult::empty("X", 0.05, 0.0).win_loss_ratio(), 0.0);
    }
}
