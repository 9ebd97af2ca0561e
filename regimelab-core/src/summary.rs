//! Run-duration statistics and recency of the last qualified run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Run;

/// Median of a sample; mean of the two middle values for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Median run length, `0.0` when the instrument has no runs.
pub fn median_run_length(runs: &[Run]) -> f64 {
    let lengths: Vec<f64> = runs.iter().map(|r| r.length as f64).collect();
    median(&lengths).unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationSummary {
    pub instrument: String,
    pub run_count: usize,
    pub avg_length: f64,
    pub median_length: f64,
}

/// `None` when there are no runs.
pub fn summarize_durations(instrument: &str, runs: &[Run]) -> Option<DurationSummary> {
    if runs.is_empty() {
        return None;
    }
    let total: usize = runs.iter().map(|r| r.length).sum();
    Some(DurationSummary {
        instrument: instrument.to_string(),
        run_count: runs.len(),
        avg_length: total as f64 / runs.len() as f64,
        median_length: median_run_length(runs),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecency {
    pub instrument: String,
    pub last_start: NaiveDate,
    pub last_end: NaiveDate,
    /// Calendar days from `last_end` to the reference date.
    pub days_since_last_run: i64,
}

/// Recency of the latest-ending run, measured against `reference` (the last
/// date in the dataset, not the wall clock).
pub fn last_run_recency(runs: &[Run], reference: NaiveDate) -> Option<RunRecency> {
    let last = runs.iter().max_by_key(|r| r.end_date)?;
    Some(RunRecency {
        instrument: last.instrument.clone(),
        last_start: last.start_date,
        last_end: last.end_date,
        days_since_last_run: (reference - last.end_date).num_days(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(start: usize, length: usize, end_day: u32) -> Run {
        Run {
            instrument: "KO".into(),
            start_index: start,
            end_index: start + length - 1,
            length,
            avg_slope: 0.001,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, end_day).unwrap(),
        }
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn durations_summary() {
        let runs = [run(0, 4, 4), run(10, 10, 20), run(30, 7, 31)];
        let s = summarize_durations("KO", &runs).unwrap();
        assert_eq!(s.run_count, 3);
        assert_eq!(s.avg_length, 7.0);
        assert_eq!(s.median_length, 7.0);
        assert!(summarize_durations("KO", &[]).is_none());
        assert_eq!(median_run_length(&[]), 0.0);
    }

    #[test]
    fn recency_uses_latest_end() {
        let runs = [run(10, 10, 20), run(0, 4, 4)];
        let reference = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let r = last_run_recency(&runs, reference).unwrap();
        assert_eq!(r.last_end, NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());
        assert_eq!(r.days_since_last_run, 12);
        assert!(last_run_recency(&[], reference).is_none());
    }
}
