//! Training dataset: one row per (instrument, point) with regime state,
//! features, the gated crossover signal and the barrier label.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use regimelab_core::data::PriceTable;
use regimelab_core::features::default_features;
use regimelab_core::params::FeatureParams;
use regimelab_core::signal::CrossoverSignal;
use regimelab_core::Label;

use crate::batch::BatchResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub instrument: String,
    pub date: NaiveDate,
    pub close: f64,
    pub slope: Option<f64>,
    pub in_regime: bool,
    /// Aligned with [`Dataset::feature_names`].
    pub features: Vec<Option<f64>>,
    pub signal: i8,
    pub label: i8,
}

impl DatasetRow {
    /// Every feature present and the label decided.
    pub fn is_complete(&self) -> bool {
        Label::from_code(self.label).is_some_and(Label::is_decided)
            && self.features.iter().all(Option::is_some)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub rows: Vec<DatasetRow>,
}

impl Dataset {
    pub fn complete_rows(&self) -> impl Iterator<Item = &DatasetRow> {
        self.rows.iter().filter(|r| r.is_complete())
    }
}

/// Join each analyzed instrument with its prices and computed features.
/// Instruments missing from either side, or whose table dates differ from
/// the dates the analysis ran on, are skipped.
pub fn build_dataset(table: &PriceTable, batch: &BatchResult, params: &FeatureParams) -> Dataset {
    let features = default_features(params);
    let signal = CrossoverSignal::from_params(params);
    let feature_names: Vec<String> = features.iter().map(|f| f.name().to_string()).collect();

    let mut rows = Vec::new();
    for (instrument, result) in batch.iter() {
        let Some(series) = table.get(instrument) else {
            continue;
        };
        if series.dates() != result.dates.as_slice() {
            warn!(
                instrument = %instrument,
                table_points = series.len(),
                analyzed_points = result.dates.len(),
                "price table does not match analyzed dates; instrument skipped"
            );
            continue;
        }
        let closes = series.closes();
        let analysis = &result.analysis;
        let columns: Vec<Vec<Option<f64>>> = features.iter().map(|f| f.compute(closes)).collect();
        let signals = signal.generate(closes, &analysis.mask);

        for (i, point) in series.points().enumerate() {
            rows.push(DatasetRow {
                instrument: instrument.to_string(),
                date: point.date,
                close: point.close,
                slope: analysis.slopes[i],
                in_regime: analysis.mask[i],
                features: columns.iter().map(|c| c[i]).collect(),
                signal: signals[i].code(),
                label: analysis.labels[i].code(),
            });
        }
    }

    Dataset {
        feature_names,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::run_batch;
    use crate::config::PipelineConfig;
    use regimelab_core::PriceSeries;

    #[test]
    fn rows_align_with_prices() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let table = PriceTable::from_series([PriceSeries::from_closes("LIN", start, &closes)]);
        let mut config = PipelineConfig::default();
        config.regime.trend_window = 10;
        config.regime.min_duration = 5;

        let batch = run_batch(&table, &config).unwrap();
        let dataset = build_dataset(&table, &batch, &config.features);

        assert_eq!(dataset.feature_names, vec!["sma_20", "sma_50", "rsi_14"]);
        assert_eq!(dataset.rows.len(), 80);
        let first = &dataset.rows[0];
        assert_eq!(first.slope, None);
        assert!(!first.is_complete());

        let late = &dataset.rows[60];
        assert!(late.in_regime);
        assert_eq!(late.features[0], Some(late.close - 9.5));
        // Uptrend: short SMA above long SMA inside the regime.
        assert_eq!(late.signal, 1);
        assert_eq!(*dataset.rows.last().map(|r| &r.label).unwrap(), -1);
        assert!(dataset.complete_rows().count() > 0);
    }

    #[test]
    fn mismatched_table_is_skipped() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let closes: Vec<f64> = (0..90).map(|i| 100.0 + i as f64).collect();
        let short = PriceTable::from_series([
            PriceSeries::from_closes("LIN", start, &closes[..80]),
            PriceSeries::from_closes("FLAT", start, &[50.0; 80]),
        ]);
        let long = PriceTable::from_series([
            PriceSeries::from_closes("LIN", start, &closes),
            PriceSeries::from_closes("FLAT", start, &[50.0; 80]),
        ]);
        let config = PipelineConfig::default();

        let batch = run_batch(&short, &config).unwrap();
        let dataset = build_dataset(&long, &batch, &config.features);

        assert_eq!(dataset.rows.len(), 80);
        assert!(dataset.rows.iter().all(|r| r.instrument == "FLAT"));
    }
}
