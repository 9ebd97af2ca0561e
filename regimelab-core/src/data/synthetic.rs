//! Deterministic synthetic prices for demos and tests.
//!
//! Each instrument walks through alternating drift regimes (up, flat, down)
//! with uniform daily noise. The RNG is seeded from the master seed and the
//! instrument name, so a given instrument produces the same path regardless
//! of how many other instruments are generated alongside it.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::table::PriceTable;
use crate::domain::PriceSeries;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub start: NaiveDate,
    /// Number of business days to generate.
    pub days: usize,
    pub start_price: f64,
    /// Half-width of the uniform daily return noise.
    pub noise: f64,
    /// Absolute daily drift during trending regimes.
    pub drift: f64,
    /// Regime lengths are drawn uniformly from this inclusive range.
    pub min_regime_days: usize,
    pub max_regime_days: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            days: 750,
            start_price: 100.0,
            noise: 0.015,
            drift: 0.004,
            min_regime_days: 20,
            max_regime_days: 120,
        }
    }
}

fn instrument_rng(seed: u64, instrument: &str) -> StdRng {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(instrument.as_bytes());
    StdRng::from_seed(*hasher.finalize().as_bytes())
}

fn next_business_day(mut date: NaiveDate) -> NaiveDate {
    loop {
        date += Duration::days(1);
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return date;
        }
    }
}

/// Generate one instrument's series.
pub fn synthetic_series(instrument: &str, config: &SyntheticConfig) -> PriceSeries {
    let mut rng = instrument_rng(config.seed, instrument);
    let min_len = config.min_regime_days.max(1);
    let max_len = config.max_regime_days.max(min_len);

    let mut date = config.start;
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date += Duration::days(1);
    }

    let mut dates = Vec::with_capacity(config.days);
    let mut closes = Vec::with_capacity(config.days);
    let mut price = config.start_price;
    let mut drift = 0.0;
    let mut remaining = 0usize;
    for _ in 0..config.days {
        if remaining == 0 {
            remaining = rng.gen_range(min_len..=max_len);
            drift = match rng.gen_range(0..3u8) {
                0 => config.drift,
                1 => 0.0,
                _ => -config.drift,
            };
        }
        remaining -= 1;

        let shock = if config.noise > 0.0 {
            rng.gen_range(-config.noise..config.noise)
        } else {
            0.0
        };
        price = (price * (1.0 + drift + shock)).max(0.01);
        dates.push(date);
        closes.push(price);
        date = next_business_day(date);
    }

    PriceSeries::from_columns(instrument, dates, closes)
}

/// Generate `count` instruments named `SYN000`, `SYN001`, ...
pub fn synthetic_table(count: usize, config: &SyntheticConfig) -> PriceTable {
    PriceTable::from_series((0..count).map(|i| synthetic_series(&format!("SYN{i:03}"), config)))
}
