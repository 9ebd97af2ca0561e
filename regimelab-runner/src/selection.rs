//! Best take-profit per instrument, ranked across the batch.

use serde::{Deserialize, Serialize};

use regimelab_core::domain::EvResult;

use crate::batch::BatchResult;
use crate::config::SelectionConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestCandidate {
    pub instrument: String,
    pub take_profit: f64,
    pub ev_with_costs: f64,
    pub ev_realistic: f64,
    pub win_rate: f64,
    pub loss_rate: f64,
    pub trade_count: usize,
    pub median_run_length: f64,
    pub days_since_last_run: Option<i64>,
}

/// Highest `ev_with_costs` among candidates that produced at least one
/// trade; earlier candidates win ties.
fn best_of(results: &[EvResult]) -> Option<&EvResult> {
    results
        .iter()
        .filter(|r| r.trade_count > 0)
        .fold(None, |best: Option<&EvResult>, r| match best {
            Some(b) if b.ev_with_costs >= r.ev_with_costs => Some(b),
            _ => Some(r),
        })
}

/// One row per eligible instrument, ranked by `ev_with_costs` descending.
///
/// With `filter_recent`, instruments whose last run ended more than
/// `recency_days` before the end of the table are dropped.
pub fn select_best(batch: &BatchResult, selection: &SelectionConfig) -> Vec<BestCandidate> {
    let recency = batch.recency();
    let days_since = |instrument: &str| {
        recency
            .iter()
            .find(|r| r.instrument == instrument)
            .map(|r| r.days_since_last_run)
    };

    let mut out: Vec<BestCandidate> = batch
        .iter()
        .filter_map(|(instrument, result)| {
            let best = best_of(&result.analysis.ev_results)?;
            let since = days_since(instrument);
            if selection.filter_recent && !since.is_some_and(|d| d <= selection.recency_days) {
                return None;
            }
            Some(BestCandidate {
                instrument: instrument.to_string(),
                take_profit: best.take_profit,
                ev_with_costs: best.ev_with_costs,
                ev_realistic: best.ev_realistic,
                win_rate: best.win_rate,
                loss_rate: best.loss_rate,
                trade_count: best.trade_count,
                median_run_length: best.median_run_length,
                days_since_last_run: since,
            })
        })
        .collect();

    out.sort_by(|a, b| {
        b.ev_with_costs
            .total_cmp(&a.ev_with_costs)
            .then_with(|| a.instrument.cmp(&b.instrument))
    });
    out
}
