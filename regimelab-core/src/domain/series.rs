//! Price series: the per-instrument input to every pipeline stage.
//!
//! Stored column-wise (dates and closes in parallel vectors) so the numeric
//! stages can borrow `&[f64]` without copying.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single `(date, close)` observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("dates for '{instrument}' are not strictly increasing at index {index} ({prev} then {next})")]
    NonIncreasing {
        instrument: String,
        index: usize,
        prev: NaiveDate,
        next: NaiveDate,
    },
}

/// Ordered close prices for one instrument.
///
/// Invariant: dates are strictly increasing. Gaps are not filled; the
/// algorithms treat consecutive entries as consecutive points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    instrument: String,
    dates: Vec<NaiveDate>,
    closes: Vec<f64>,
}

impl PriceSeries {
    pub fn new(
        instrument: impl Into<String>,
        points: Vec<PricePoint>,
    ) -> Result<Self, SeriesError> {
        let instrument = instrument.into();
        for (i, pair) in points.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(SeriesError::NonIncreasing {
                    instrument,
                    index: i + 1,
                    prev: pair[0].date,
                    next: pair[1].date,
                });
            }
        }
        let (dates, closes) = points.into_iter().map(|p| (p.date, p.close)).unzip();
        Ok(Self {
            instrument,
            dates,
            closes,
        })
    }

    /// Caller guarantees strictly increasing dates of matching length.
    pub(crate) fn from_columns(
        instrument: impl Into<String>,
        dates: Vec<NaiveDate>,
        closes: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(dates.len(), closes.len());
        debug_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        Self {
            instrument: instrument.into(),
            dates,
            closes,
        }
    }

    /// Build a series on consecutive calendar days starting at `start`.
    pub fn from_closes(instrument: impl Into<String>, start: NaiveDate, closes: &[f64]) -> Self {
        let dates = (0..closes.len())
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        Self {
            instrument: instrument.into(),
            dates,
            closes: closes.to_vec(),
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.dates.get(index).copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn points(&self) -> impl Iterator<Item = PricePoint> + '_ {
        self.dates
            .iter()
            .zip(&self.closes)
            .map(|(&date, &close)| PricePoint { date, close })
    }
}
