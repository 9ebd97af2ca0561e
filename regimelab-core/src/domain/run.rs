//! Qualified trend run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A maximal contiguous stretch of trend-flagged points that met the
/// minimum duration. Immutable once emitted by the qualifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub instrument: String,
    pub start_index: usize,
    /// Inclusive.
    pub end_index: usize,
    pub length: usize,
    /// Mean of the defined slopes over `[start_index, end_index]`.
    pub avg_slope: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
