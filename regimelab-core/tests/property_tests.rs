//! Property tests for the analytics invariants.
//!
//! Uses proptest to verify:
//! 1. Slope definedness: absent before `window-1`, present afterwards on clean data
//! 2. Linear recovery: a straight line yields its own slope
//! 3. Run coverage: runs are long enough, maximal, and their union is the mask
//! 4. Qualification idempotence
//! 5. Barrier horizon: labels never depend on prices beyond `max_holding`
//! 6. Evaluation accounting: rates stay in [0, 1] and sum to at most 1

use chrono::NaiveDate;
use proptest::prelude::*;
use regimelab_core::evaluator::RegimeEvaluator;
use regimelab_core::params::EvalParams;
use regimelab_core::{
    trend_flags, BarrierLabeler, Label, PriceSeries, RunQualifier, SlopeEstimator, SlopeMethod,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_closes(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_price(), 0..max_len)
}

fn arb_flags() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 0..120)
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

// ── 1. Slope definedness ─────────────────────────────────────────────

proptest! {
    #[test]
    fn slope_defined_iff_past_warmup(
        closes in arb_closes(150),
        window in 2usize..40,
        use_log in any::<bool>(),
    ) {
        let slopes = SlopeEstimator::new(window, use_log).estimate(&closes);
        prop_assert_eq!(slopes.len(), closes.len());
        for (i, s) in slopes.iter().enumerate() {
            prop_assert_eq!(s.is_some(), i + 1 >= window, "index {}", i);
        }
    }

    #[test]
    fn rolling_tracks_exact(closes in arb_closes(200), window in 2usize..30) {
        let exact = SlopeEstimator::new(window, false).estimate(&closes);
        let rolling = SlopeEstimator::new(window, false)
            .with_method(SlopeMethod::Rolling)
            .estimate(&closes);
        for (a, b) in exact.iter().zip(&rolling) {
            match (a, b) {
                (Some(a), Some(b)) => prop_assert!((a - b).abs() < 1e-6, "{} vs {}", a, b),
                (None, None) => {}
                _ => prop_assert!(false, "definedness differs"),
            }
        }
    }
}

// ── 2. Linear recovery ───────────────────────────────────────────────

proptest! {
    #[test]
    fn linear_series_recovers_slope(
        intercept in 50.0..150.0_f64,
        slope in -0.5..0.5_f64,
        len in 5usize..120,
        window in 2usize..5,
    ) {
        let closes: Vec<f64> = (0..len).map(|i| intercept + slope * i as f64).collect();
        for s in SlopeEstimator::new(window, false).estimate(&closes).into_iter().flatten() {
            prop_assert!((s - slope).abs() < 1e-9);
        }
    }

    #[test]
    fn geometric_series_recovers_log_slope(
        growth in -0.02..0.02_f64,
        len in 5usize..120,
        window in 2usize..20,
    ) {
        let closes: Vec<f64> = (0..len).map(|i| 100.0 * (growth * i as f64).exp()).collect();
        for s in SlopeEstimator::new(window, true).estimate(&closes).into_iter().flatten() {
            prop_assert!((s - growth).abs() < 1e-9);
        }
    }
}

// ── 3-4. Run qualification ───────────────────────────────────────────

proptest! {
    #[test]
    fn runs_cover_exactly_the_mask(flags in arb_flags(), min_duration in 1usize..10) {
        let slopes: Vec<Option<f64>> = flags.iter().map(|&f| f.then_some(1.0)).collect();
        let q = RunQualifier::new(min_duration).qualify(&flags, &slopes);

        let mut covered = vec![false; flags.len()];
        for span in &q.spans {
            prop_assert!(span.length >= min_duration);
            prop_assert_eq!(span.length, span.end - span.start + 1);
            prop_assert!(flags[span.start..=span.end].iter().all(|&f| f));
            // Maximal: neighbours are false or out of range.
            prop_assert!(span.start == 0 || !flags[span.start - 1]);
            prop_assert!(span.end + 1 == flags.len() || !flags[span.end + 1]);
            for c in &mut covered[span.start..=span.end] {
                *c = true;
            }
        }
        prop_assert_eq!(covered, q.mask);
    }

    #[test]
    fn qualification_is_idempotent(flags in arb_flags(), min_duration in 1usize..10) {
        let slopes: Vec<Option<f64>> = flags.iter().map(|&f| f.then_some(0.5)).collect();
        let qualifier = RunQualifier::new(min_duration);
        prop_assert_eq!(qualifier.qualify(&flags, &slopes), qualifier.qualify(&flags, &slopes));
    }

    #[test]
    fn flags_false_where_slope_absent(closes in arb_closes(80), window in 2usize..20) {
        let slopes = SlopeEstimator::new(window, true).estimate(&closes);
        let flags = trend_flags(&slopes, f64::NEG_INFINITY);
        for (s, f) in slopes.iter().zip(&flags) {
            prop_assert_eq!(s.is_some(), *f);
        }
    }
}

// ── 5. Barrier horizon ───────────────────────────────────────────────

proptest! {
    #[test]
    fn labels_ignore_prices_past_horizon(
        closes in prop::collection::vec(arb_price(), 2..80),
        tail in arb_closes(20),
        max_holding in 1usize..10,
    ) {
        let labeler = BarrierLabeler::new(0.05, 0.03, max_holding);
        let base = labeler.label(&closes);
        let mut extended = closes.clone();
        extended.extend(tail);
        let longer = labeler.label(&extended);

        // Indices whose full horizon fits inside the shorter series are unchanged.
        for i in 0..closes.len().saturating_sub(max_holding) {
            prop_assert_eq!(base[i], longer[i], "index {}", i);
        }
        prop_assert_eq!(*base.last().unwrap(), Label::Undecided);
    }

    #[test]
    fn rising_series_wins_when_target_reachable(len in 3usize..60, max_holding in 1usize..6) {
        // +10% per step clears a 5% target on the first forward point.
        let closes: Vec<f64> = (0..len).map(|i| 100.0 * 1.1_f64.powi(i as i32)).collect();
        let labels = BarrierLabeler::new(0.05, 0.03, max_holding).label(&closes);
        for label in &labels[..len - 1] {
            prop_assert_eq!(*label, Label::WinBarrier);
        }
    }
}

// ── 6. Evaluation accounting ─────────────────────────────────────────

proptest! {
    #[test]
    fn evaluation_rates_are_fractions(
        closes in arb_closes(120),
        mask_bits in prop::collection::vec(any::<bool>(), 120),
        lookahead in 1usize..10,
        median in 0.0..20.0_f64,
    ) {
        let series = PriceSeries::from_closes("P", start(), &closes);
        let mask = &mask_bits[..closes.len()];
        let evaluator = RegimeEvaluator::from_params(&EvalParams {
            lookahead_days: lookahead,
            ..EvalParams::default()
        });
        for r in evaluator.evaluate(&series, mask, median) {
            prop_assert!(r.wins + r.losses <= r.trade_count);
            prop_assert!((0.0..=1.0).contains(&r.win_rate));
            prop_assert!((0.0..=1.0).contains(&r.loss_rate));
            if r.trade_count == 0 {
                prop_assert_eq!(r.ev_net, 0.0);
                prop_assert_eq!(r.ev_with_costs, 0.0);
            } else if median < lookahead as f64 {
                prop_assert!(r.ev_realistic <= 0.0);
            }
        }
    }
}
