//! Long-format price table: one row per (date, ticker, close).
//!
//! Accepted inputs are CSV (header row required) and Parquet. Column names
//! are matched case-insensitively: `date`/`timestamp`, `ticker`/`symbol`/
//! `instrument`, `close`. Extra columns (open, high, low, volume) are ignored.
//! Rows are grouped per instrument into strictly increasing series; repeated
//! dates keep the last row.

use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{PricePoint, PriceSeries, SeriesError};

const EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(1970, 1, 1) {
    Some(d) => d,
    None => panic!("epoch"),
};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("unsupported price file format '{0}' (expected .csv or .parquet)")]
    UnsupportedFormat(String),

    #[error("missing column: expected one of {expected:?}")]
    MissingColumn { expected: Vec<&'static str> },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("polars error: {0}")]
    Polars(String),

    #[error(transparent)]
    Series(#[from] SeriesError),
}

const DATE_COLUMNS: &[&str] = &["date", "timestamp", "datetime"];
const TICKER_COLUMNS: &[&str] = &["ticker", "symbol", "instrument"];
const CLOSE_COLUMNS: &[&str] = &["close"];

fn polars_err(e: PolarsError) -> DataError {
    DataError::Polars(e.to_string())
}

fn io_err(path: &Path, e: std::io::Error) -> DataError {
    DataError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// One parsed input row. `None` fields mark a row to skip.
struct RawRow {
    date: Option<NaiveDate>,
    ticker: Option<String>,
    close: f64,
}

/// Per-instrument price series keyed by instrument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    series: BTreeMap<String, PriceSeries>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_series(series: impl IntoIterator<Item = PriceSeries>) -> Self {
        let mut table = Self::new();
        for s in series {
            table.insert(s);
        }
        table
    }

    /// Insert or replace the series for its instrument.
    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.instrument().to_string(), series);
    }

    pub fn get(&self, instrument: &str) -> Option<&PriceSeries> {
        self.series.get(instrument)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceSeries> {
        self.series.values()
    }

    /// Latest date across all instruments.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.series.values().filter_map(PriceSeries::last_date).max()
    }

    /// Total number of points across all instruments.
    pub fn point_count(&self) -> usize {
        self.series.values().map(PriceSeries::len).sum()
    }

    /// Load a `.csv` or `.parquet` file.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let table = match ext.as_str() {
            "csv" => Self::from_rows(read_csv(path)?)?,
            "parquet" | "pq" => Self::from_dataframe(&read_parquet(path)?)?,
            _ => return Err(DataError::UnsupportedFormat(path.display().to_string())),
        };
        info!(
            path = %path.display(),
            instruments = table.len(),
            points = table.point_count(),
            "price table loaded"
        );
        Ok(table)
    }

    pub fn from_dataframe(df: &DataFrame) -> Result<Self, DataError> {
        let date_col = find_column(df, DATE_COLUMNS)?
            .cast(&DataType::Date)
            .map_err(polars_err)?;
        let ticker_col = find_column(df, TICKER_COLUMNS)?
            .cast(&DataType::String)
            .map_err(polars_err)?;
        let close_col = find_column(df, CLOSE_COLUMNS)?
            .cast(&DataType::Float64)
            .map_err(polars_err)?;

        let dates = date_col.date().map_err(polars_err)?;
        let tickers = ticker_col.str().map_err(polars_err)?;
        let closes = close_col.f64().map_err(polars_err)?;

        let rows = (0..df.height()).map(|i| RawRow {
            date: dates.get(i).map(|days| EPOCH + Duration::days(days as i64)),
            ticker: tickers.get(i).map(str::to_string),
            close: closes.get(i).unwrap_or(f64::NAN),
        });
        Self::from_rows(rows)
    }

    fn from_rows(rows: impl IntoIterator<Item = RawRow>) -> Result<Self, DataError> {
        let mut grouped: BTreeMap<String, Vec<PricePoint>> = BTreeMap::new();
        let mut skipped = 0usize;
        for row in rows {
            let (Some(date), Some(ticker)) = (row.date, row.ticker) else {
                skipped += 1;
                continue;
            };
            grouped.entry(ticker).or_default().push(PricePoint {
                date,
                close: row.close,
            });
        }
        if skipped > 0 {
            warn!(skipped, "rows without a date or ticker were skipped");
        }

        let mut table = Self::new();
        for (instrument, mut points) in grouped {
            points.sort_by_key(|p| p.date);
            let before = points.len();
            dedup_keep_last(&mut points);
            if points.len() < before {
                warn!(
                    instrument = %instrument,
                    duplicates = before - points.len(),
                    "duplicate dates collapsed to the last row"
                );
            }
            table.insert(PriceSeries::new(instrument, points)?);
        }
        Ok(table)
    }

    /// Long-format frame with `date`, `ticker`, `close` columns.
    pub fn to_dataframe(&self) -> Result<DataFrame, DataError> {
        let mut dates: Vec<i32> = Vec::with_capacity(self.point_count());
        let mut tickers: Vec<&str> = Vec::with_capacity(self.point_count());
        let mut closes: Vec<f64> = Vec::with_capacity(self.point_count());
        for series in self.series.values() {
            for point in series.points() {
                dates.push((point.date - EPOCH).num_days() as i32);
                tickers.push(series.instrument());
                closes.push(point.close);
            }
        }

        DataFrame::new(vec![
            Column::new("date".into(), dates)
                .cast(&DataType::Date)
                .map_err(polars_err)?,
            Column::new("ticker".into(), tickers),
            Column::new("close".into(), closes),
        ])
        .map_err(polars_err)
    }

    /// Write the table as a single Parquet file.
    pub fn write_parquet(&self, path: &Path) -> Result<(), DataError> {
        let mut df = self.to_dataframe()?;
        let file = fs::File::create(path).map_err(|e| io_err(path, e))?;
        ParquetWriter::new(file).finish(&mut df).map_err(polars_err)?;
        Ok(())
    }

    /// Write the table as `date,ticker,close` CSV.
    pub fn write_csv(&self, path: &Path) -> Result<(), DataError> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(["date", "ticker", "close"])?;
        for series in self.series.values() {
            for point in series.points() {
                wtr.write_record([
                    point.date.to_string(),
                    series.instrument().to_string(),
                    point.close.to_string(),
                ])?;
            }
        }
        wtr.flush().map_err(|e| io_err(path, e))?;
        Ok(())
    }
}

fn find_column<'a>(df: &'a DataFrame, candidates: &[&'static str]) -> Result<&'a Column, DataError> {
    df.get_columns()
        .iter()
        .find(|c| {
            let name = c.name().to_ascii_lowercase();
            candidates.iter().any(|cand| name == *cand)
        })
        .ok_or_else(|| DataError::MissingColumn {
            expected: candidates.to_vec(),
        })
}

/// Points are sorted by date; keep the last of each run of equal dates.
fn dedup_keep_last(points: &mut Vec<PricePoint>) {
    let mut out: Vec<PricePoint> = Vec::with_capacity(points.len());
    for p in points.drain(..) {
        match out.last_mut() {
            Some(last) if last.date == p.date => *last = p,
            _ => out.push(p),
        }
    }
    *points = out;
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn header_index(headers: &csv::StringRecord, candidates: &[&'static str]) -> Result<usize, DataError> {
    headers
        .iter()
        .position(|h| {
            let name = h.trim().to_ascii_lowercase();
            candidates.iter().any(|cand| name == *cand)
        })
        .ok_or_else(|| DataError::MissingColumn {
            expected: candidates.to_vec(),
        })
}

fn read_csv(path: &Path) -> Result<Vec<RawRow>, DataError> {
    let file = fs::File::open(path).map_err(|e| io_err(path, e))?;
    let mut rdr = csv::Reader::from_reader(file);
    let headers = rdr.headers()?.clone();
    let date_idx = header_index(&headers, DATE_COLUMNS)?;
    let ticker_idx = header_index(&headers, TICKER_COLUMNS)?;
    let close_idx = header_index(&headers, CLOSE_COLUMNS)?;

    let mut rows = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let ticker = record
            .get(ticker_idx)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        let date = record.get(date_idx).and_then(parse_date);
        let close = match record.get(close_idx).map(str::trim) {
            None | Some("") => f64::NAN,
            Some(v) => v.parse::<f64>().unwrap_or_else(|_| {
                warn!(
                    row = row + 1,
                    instrument = ticker.as_deref().unwrap_or(""),
                    value = v,
                    "unparseable close treated as missing"
                );
                f64::NAN
            }),
        };
        rows.push(RawRow {
            date,
            ticker,
            close,
        });
    }
    Ok(rows)
}

fn read_parquet(path: &Path) -> Result<DataFrame, DataError> {
    let file = fs::File::open(path).map_err(|e| io_err(path, e))?;
    ParquetReader::new(file).finish().map_err(polars_err)
}
