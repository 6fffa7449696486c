//! Property-based tests for membership grades and premise feasibility using proptest

use proptest::prelude::*;
use rust_anfis::{AnfisConfig, Input, PremiseMomentum, TriangularMf};

/// Sorted `(a, b, c)` triples, shoulders and singletons included.
fn triangle_strategy() -> impl Strategy<Value = [f64; 3]> {
    prop_oneof![
        prop::array::uniform3(-1e3..1e3_f64),
        (-1e3..1e3_f64, 0.0..1e3_f64).prop_map(|(a, w)| [a, a, a + w]),
        (-1e3..1e3_f64, 0.0..1e3_f64).prop_map(|(a, w)| [a, a + w, a + w]),
        (-1e3..1e3_f64).prop_map(|a| [a, a, a]),
    ]
    .prop_map(|mut p| {
        p.sort_by(f64::total_cmp);
        p
    })
}

/// Per-sample `(error, delta_error, dL/dy)`, with upstream gradients far beyond any
/// realistic residual.
fn adversarial_sample() -> impl Strategy<Value = (f64, f64, f64)> {
    (-150.0..150.0_f64, -15.0..15.0_f64, -1e6..1e6_f64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn grade_is_bounded_and_exact_at_landmarks(p in triangle_strategy(), x in -2e3..2e3_f64) {
        let [a, b, c] = p;
        let mf = TriangularMf::new(a, b, c).unwrap();

        let g = mf.grade(x);
        prop_assert!((0.0..=1.0).contains(&g));
        prop_assert_eq!(mf.grade(b), 1.0);

        if a < b {
            prop_assert_eq!(mf.grade(a), 0.0);
            if x < a {
                prop_assert_eq!(g, 0.0);
            }
        }
        if b < c {
            prop_assert_eq!(mf.grade(c), 0.0);
            if x > c {
                prop_assert_eq!(g, 0.0);
            }
        }
        if mf.is_left_shoulder() && x <= b {
            prop_assert_eq!(g, 1.0);
        }
        if mf.is_right_shoulder() && x >= b {
            prop_assert_eq!(g, 1.0);
        }
    }

    #[test]
    fn grade_rises_then_falls(p in triangle_strategy(), t1 in 0.0..=1.0_f64, t2 in 0.0..=1.0_f64) {
        let [a, b, c] = p;
        let mf = TriangularMf::new(a, b, c).unwrap();
        let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };

        let r1 = (a + lo * (b - a)).clamp(a, b);
        let r2 = (a + hi * (b - a)).clamp(a, b);
        prop_assert!(mf.grade(r1) <= mf.grade(r2));

        let f1 = (b + lo * (c - b)).clamp(b, c);
        let f2 = (b + hi * (c - b)).clamp(b, c);
        prop_assert!(mf.grade(f1) >= mf.grade(f2));
    }

    #[test]
    fn normalized_firing_strengths_sum_to_one(e in -150.0..150.0_f64, de in -15.0..15.0_f64) {
        let model = AnfisConfig::default().build_model(0).unwrap();
        let mut scratch = model.scratch();
        model.forward(e, de, &mut scratch).unwrap();

        let total: f64 = scratch.normalized().iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-12, "sum={}", total);
        prop_assert_eq!(scratch.firing().len(), 25);
    }

    #[test]
    fn premise_updates_stay_feasible_and_keep_shoulders_under_adversarial_gradients(
        samples in prop::collection::vec(adversarial_sample(), 1..24),
        learning_rate in 1e-3..10.0_f64,
        step_size in 1e-3..10.0_f64,
        momentum in 0.0..0.99_f64,
    ) {
        let mut model = AnfisConfig::default().build_model(9).unwrap();
        let mut opt = PremiseMomentum::new(&model, momentum).unwrap();
        let mut scratch = model.scratch();
        let mut grads = model.gradients();

        for (e, de, d_output) in samples {
            grads.zero();
            if model.forward(e, de, &mut scratch).is_err() {
                continue;
            }
            model.backward(e, de, &scratch, d_output, &mut grads);
            prop_assume!(grads.is_finite());
            opt.step(&mut model, &grads, learning_rate, step_size);

            for var in Input::ALL {
                for m in 0..model.input(var).len() {
                    let [a, b, c] = model.get_params(var, m).unwrap();
                    prop_assert!(a.is_finite() && b.is_finite() && c.is_finite());
                    prop_assert!(a <= b && b <= c, "{:?}[{}] = ({}, {}, {})", var, m, a, b, c);
                }
                let mfs = model.input(var).mfs();
                prop_assert!(mfs[0].is_left_shoulder(), "{:?} lost its left shoulder", var);
                prop_assert!(mfs[mfs.len() - 1].is_right_shoulder(), "{:?} lost its right shoulder", var);
            }
        }
    }
}
