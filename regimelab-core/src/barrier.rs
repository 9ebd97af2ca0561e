//! First-barrier-touched labeling.
//!
//! For entry index `i` the forward window is `closes[i+1 ..= i+max_holding]`,
//! truncated at series end. The earliest take-profit touch
//! (`p >= entry·(1+tp)`) and the earliest stop-loss touch
//! (`p <= entry·(1-sl)`) are located independently; whichever comes strictly
//! first decides the label. Touches at the same offset, or no touch at all,
//! leave the point `Undecided`. Regime membership plays no part here.

use crate::domain::Label;
use crate::params::LabelParams;

#[derive(Debug, Clone, Copy)]
pub struct BarrierLabeler {
    take_profit: f64,
    stop_loss: f64,
    max_holding: usize,
}

impl BarrierLabeler {
    pub fn new(take_profit: f64, stop_loss: f64, max_holding: usize) -> Self {
        assert!(take_profit > 0.0, "take_profit must be > 0");
        assert!(stop_loss > 0.0, "stop_loss must be > 0");
        assert!(max_holding >= 1, "max_holding must be >= 1");
        Self {
            take_profit,
            stop_loss,
            max_holding,
        }
    }

    pub fn from_params(params: &LabelParams) -> Self {
        Self::new(params.take_profit, params.stop_loss, params.max_holding)
    }

    /// Label a single entry index. `None` when no forward points remain.
    pub fn label_at(&self, closes: &[f64], index: usize) -> Option<Label> {
        let last = closes
            .len()
            .checked_sub(1)?
            .min(index.saturating_add(self.max_holding));
        if index >= last {
            return None;
        }

        let entry = closes[index];
        let upper = entry * (1.0 + self.take_profit);
        let lower = entry * (1.0 - self.stop_loss);
        let forward = &closes[index + 1..=last];

        let tp_hit = forward.iter().position(|&p| p >= upper);
        let sl_hit = forward.iter().position(|&p| p <= lower);
        Some(resolve_touches(tp_hit, sl_hit))
    }

    /// One label per index. The final index has no forward window and stays
    /// `Undecided`; labeling stops at the first index without one.
    pub fn label(&self, closes: &[f64]) -> Vec<Label> {
        let n = closes.len();
        let mut labels = vec![Label::Undecided; n];
        for i in 0..n.saturating_sub(1) {
            match self.label_at(closes, i) {
                Some(label) => labels[i] = label,
                None => break,
            }
        }
        labels
    }
}

/// Decide a label from the forward offsets of the first take-profit and
/// stop-loss touches. Equal offsets are `Undecided`.
pub fn resolve_touches(tp_hit: Option<usize>, sl_hit: Option<usize>) -> Label {
    match (tp_hit, sl_hit) {
        (Some(_), None) => Label::WinBarrier,
        (None, Some(_)) => Label::LossBarrier,
        (Some(tp), Some(sl)) if tp < sl => Label::WinBarrier,
        (Some(tp), Some(sl)) if sl < tp => Label::LossBarrier,
        _ => Label::Undecided,
    }
}
