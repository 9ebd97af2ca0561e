//! Trailing least-squares slope.
//!
//! For a window of `w` points the regressor is the relative position
//! `k = 0..w-1`, so a slope depends only on the values inside its window:
//!
//! ```text
//! slope = Σ (k - k̄)·y_k / Sxx      k̄ = (w-1)/2,  Sxx = w(w²-1)/12
//! ```
//!
//! Index `i` gets a value once `i >= w-1`. A window holding any non-finite
//! value (or a non-positive price in log mode) yields `None`, never zero,
//! because zero is a legitimate slope.

use serde::{Deserialize, Serialize};

use crate::params::RegimeParams;

/// How the per-window regression is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlopeMethod {
    /// Recompute every window from its own values. O(n·w), bit-for-bit
    /// reproducible regardless of where the window sits in the series.
    #[default]
    Exact,
    /// Maintain Σy and Σk·y across windows. O(n); agrees with `Exact` up to
    /// accumulated rounding.
    Rolling,
}

#[derive(Debug, Clone)]
pub struct SlopeEstimator {
    window: usize,
    use_log: bool,
    method: SlopeMethod,
}

impl SlopeEstimator {
    pub fn new(window: usize, use_log: bool) -> Self {
        assert!(window >= 2, "slope window must be >= 2");
        Self {
            window,
            use_log,
            method: SlopeMethod::Exact,
        }
    }

    pub fn from_params(params: &RegimeParams) -> Self {
        Self::new(params.trend_window, params.use_log).with_method(params.slope_method)
    }

    pub fn with_method(mut self, method: SlopeMethod) -> Self {
        self.method = method;
        self
    }

    /// Map prices into the regression domain. Invalid entries become NaN.
    fn transform(&self, closes: &[f64]) -> Vec<f64> {
        closes
            .iter()
            .map(|&p| {
                if !self.use_log {
                    p
                } else if p > 0.0 {
                    p.ln()
                } else {
                    f64::NAN
                }
            })
            .collect()
    }

    /// One slope per index; `None` for `i < window-1` and for windows with
    /// missing data. A series shorter than the window yields all `None`.
    pub fn estimate(&self, closes: &[f64]) -> Vec<Option<f64>> {
        let n = closes.len();
        let mut out = vec![None; n];
        if n < self.window {
            return out;
        }

        let ys = self.transform(closes);
        match self.method {
            SlopeMethod::Exact => {
                for i in (self.window - 1)..n {
                    out[i] = window_slope(&ys[i + 1 - self.window..=i]);
                }
            }
            SlopeMethod::Rolling => rolling_slopes(&ys, self.window, &mut out),
        }
        out
    }
}

/// Σ (k - k̄)² over `k = 0..w-1`.
fn position_variance(w: usize) -> f64 {
    let w = w as f64;
    w * (w * w - 1.0) / 12.0
}

/// Slope of one window against positions `0..len-1`.
pub fn window_slope(window: &[f64]) -> Option<f64> {
    let w = window.len();
    if w < 2 {
        return None;
    }
    let mean_k = (w - 1) as f64 / 2.0;
    let mut num = 0.0;
    for (k, &y) in window.iter().enumerate() {
        if !y.is_finite() {
            return None;
        }
        num += (k as f64 - mean_k) * y;
    }
    Some(num / position_variance(w))
}

fn rolling_slopes(ys: &[f64], w: usize, out: &mut [Option<f64>]) {
    let wf = w as f64;
    let mean_k = (wf - 1.0) / 2.0;
    let denom = position_variance(w);
    // Invalid values contribute zero to the sums and are counted instead, so
    // the sums are exact again as soon as the last invalid value leaves.
    let clean = |y: f64| if y.is_finite() { y } else { 0.0 };

    let mut sum_y = 0.0;
    let mut sum_ky = 0.0;
    let mut invalid = 0usize;
    for (k, &y) in ys[..w].iter().enumerate() {
        if !y.is_finite() {
            invalid += 1;
        }
        sum_y += clean(y);
        sum_ky += k as f64 * clean(y);
    }

    let slope = |sum_y: f64, sum_ky: f64, invalid: usize| {
        (invalid == 0).then(|| (sum_ky - mean_k * sum_y) / denom)
    };
    out[w - 1] = slope(sum_y, sum_ky, invalid);

    for i in w..ys.len() {
        let leaving = ys[i - w];
        let entering = ys[i];
        if !leaving.is_finite() {
            invalid -= 1;
        }
        if !entering.is_finite() {
            invalid += 1;
        }
        // Shift positions down by one: the leaving value had weight 0.
        sum_y += clean(entering) - clean(leaving);
        sum_ky += wf * clean(entering) - sum_y;
        out[i] = slope(sum_y, sum_ky, invalid);
    }
}

/// Threshold slopes into per-point trend flags. Absent slopes are `false`.
pub fn trend_flags(slopes: &[Option<f64>], threshold: f64) -> Vec<bool> {
    slopes
        .iter()
        .map(|s| s.is_some_and(|v| v >= threshold))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
        assert!(
            (actual - expected).abs() < epsilon,
            "actual={actual}, expected={expected}"
        );
    }

    #[test]
    fn warmup_is_absent() {
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0];
        let slopes = SlopeEstimator::new(3, false).estimate(&closes);
        assert_eq!(slopes[0], None);
        assert_eq!(slopes[1], None);
        assert!(slopes[2..].iter().all(Option::is_some));
    }

    #[test]
    fn linear_series_recovers_slope() {
        let closes: Vec<f64> = (0..30).map(|i| 50.0 + 1.5 * i as f64).collect();
        let slopes = SlopeEstimator::new(7, false).estimate(&closes);
        for s in slopes.iter().skip(6) {
            assert_approx(s.unwrap(), 1.5, 1e-10);
        }
    }

    #[test]
    fn log_series_recovers_growth_rate() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 * (0.002 * i as f64).exp()).collect();
        let slopes = SlopeEstimator::new(10, true).estimate(&closes);
        assert_approx(slopes[9].unwrap(), 0.002, 1e-12);
        assert_approx(slopes[39].unwrap(), 0.002, 1e-12);
    }

    #[test]
    fn flat_window_is_zero_not_absent() {
        let slopes = SlopeEstimator::new(3, false).estimate(&[5.0, 5.0, 5.0]);
        assert_eq!(slopes[2], Some(0.0));
    }

    #[test]
    fn short_series_has_no_slopes() {
        let slopes = SlopeEstimator::new(5, true).estimate(&[1.0, 2.0, 3.0]);
        assert_eq!(slopes, vec![None, None, None]);
    }

    #[test]
    fn nan_propagates_as_absence() {
        let closes = [10.0, 11.0, f64::NAN, 13.0, 14.0, 15.0];
        for method in [SlopeMethod::Exact, SlopeMethod::Rolling] {
            let slopes = SlopeEstimator::new(3, false)
                .with_method(method)
                .estimate(&closes);
            assert_eq!(slopes[2], None);
            assert_eq!(slopes[3], None);
            assert_eq!(slopes[4], None);
            assert_approx(slopes[5].unwrap(), 1.0, 1e-12);
        }
    }

    #[test]
    fn non_positive_price_is_absent_in_log_mode() {
        let slopes = SlopeEstimator::new(2, true).estimate(&[1.0, 0.0, 2.0, 4.0]);
        assert_eq!(slopes[1], None);
        assert_eq!(slopes[2], None);
        assert_approx(slopes[3].unwrap(), 2f64.ln(), 1e-12);
    }

    #[test]
    fn rolling_matches_exact() {
        let closes: Vec<f64> = (0..500)
            .map(|i| 100.0 + (i as f64 * 0.37).sin() * 5.0 + i as f64 * 0.05)
            .collect();
        let exact = SlopeEstimator::new(20, true).estimate(&closes);
        let rolling = SlopeEstimator::new(20, true)
            .with_method(SlopeMethod::Rolling)
            .estimate(&closes);
        for (e, r) in exact.iter().zip(&rolling) {
            match (e, r) {
                (Some(e), Some(r)) => assert_approx(*e, *r, 1e-9),
                (None, None) => {}
                _ => panic!("definedness differs: {e:?} vs {r:?}"),
            }
        }
    }

    #[test]
    fn exact_slope_depends_only_on_window_values() {
        let window = [3.0, 1.0, 4.0, 1.0, 5.0];
        let mut long = vec![9.0, 2.0, 6.0];
        long.extend_from_slice(&window);
        let slopes = SlopeEstimator::new(5, false).estimate(&long);
        assert_eq!(slopes[7], window_slope(&window));
    }

    #[test]
    fn flags_treat_absent_as_false() {
        let flags = trend_flags(&[None, Some(0.5), Some(1.0), Some(-1.0)], 0.5);
        assert_eq!(flags, vec![false, true, true, false]);
    }
}
