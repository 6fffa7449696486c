//! Membership function bank.
//!
//! Each input variable owns an ordered list of triangular membership functions and
//! their parallel linguistic labels. Evaluating a crisp value yields one grade per
//! membership function, in the variable's order.
//!
//! Shape conventions for a triangle `(a, b, c)` with `a <= b <= c`:
//!
//! - `a < b < c`: ordinary triangle, `grade(a) = grade(c) = 0`, `grade(b) = 1`.
//! - `a == b < c`: left shoulder, saturates at 1 for every `x <= b`.
//! - `a < b == c`: right shoulder, saturates at 1 for every `x >= b`.
//! - `a == b == c`: crisp singleton, 1 only at `x == b`.

use crate::{Error, Result};

/// The two input variables of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    /// Tracking error.
    Error,
    /// Rate of change of the tracking error.
    DeltaError,
}

impl Input {
    pub const ALL: [Input; 2] = [Input::Error, Input::DeltaError];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Input::Error => 0,
            Input::DeltaError => 1,
        }
    }

    /// Name used in configuration documents and model artifacts.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Input::Error => "error",
            Input::DeltaError => "delta_error",
        }
    }
}

/// Triangular membership function with parameters `(a, b, c)`: left foot, peak, right foot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangularMf {
    a: f64,
    b: f64,
    c: f64,
}

impl TriangularMf {
    /// Membership function type name in configuration documents and model artifacts.
    pub const KIND: &'static str = "trimf";

    /// Build a triangle. Parameters must be finite and satisfy `a <= b <= c`.
    pub fn new(a: f64, b: f64, c: f64) -> Result<Self> {
        check_feasible(a, b, c)?;
        Ok(Self { a, b, c })
    }

    #[inline]
    pub fn params(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }

    /// Overwrite the parameters. Infeasible triples are rejected and leave `self` unchanged.
    pub fn set_params(&mut self, a: f64, b: f64, c: f64) -> Result<()> {
        check_feasible(a, b, c)?;
        self.a = a;
        self.b = b;
        self.c = c;
        Ok(())
    }

    #[inline]
    pub fn is_left_shoulder(&self) -> bool {
        self.a == self.b && self.b < self.c
    }

    #[inline]
    pub fn is_right_shoulder(&self) -> bool {
        self.a < self.b && self.b == self.c
    }

    /// Membership grade of `x`, in `[0, 1]`. NaN lies in no support and grades `0`.
    #[inline]
    pub fn grade(&self, x: f64) -> f64 {
        self.grade_and_partials(x).0
    }

    /// Membership grade of `x` and its partial derivatives w.r.t. `(a, b, c)`.
    ///
    /// Kinks (`x` equal to a foot or the peak) and saturated regions report a zero gradient.
    pub fn grade_and_partials(&self, x: f64) -> (f64, [f64; 3]) {
        let TriangularMf { a, b, c } = *self;

        if x.is_nan() {
            return (0.0, [0.0; 3]);
        }
        if a == c {
            let g = if x == b { 1.0 } else { 0.0 };
            return (g, [0.0; 3]);
        }
        if x == b {
            return (1.0, [0.0; 3]);
        }

        if x < b {
            if a == b || x <= a {
                let g = if a == b { 1.0 } else { 0.0 };
                return (g, [0.0; 3]);
            }
            let width = b - a;
            let w2 = width * width;
            let g = ((x - a) / width).clamp(0.0, 1.0);
            (g, [(x - b) / w2, -(x - a) / w2, 0.0])
        } else {
            if b == c || x >= c {
                let g = if b == c { 1.0 } else { 0.0 };
                return (g, [0.0; 3]);
            }
            let width = c - b;
            let w2 = width * width;
            let g = ((c - x) / width).clamp(0.0, 1.0);
            (g, [0.0, (c - x) / w2, (x - b) / w2])
        }
    }

    /// Add `delta` to the parameters and project the result back onto `a <= b <= c`.
    ///
    /// Shoulders keep their shape: the tied foot follows the peak, and an overshooting
    /// peak swaps with the free foot instead of the shoulder turning around. A shoulder
    /// step that would collapse the support to a point is dropped. Returns `true` when
    /// the raw update was infeasible and had to be projected.
    pub(crate) fn apply_delta(&mut self, delta: [f64; 3]) -> bool {
        debug_assert!(delta.iter().all(|d| d.is_finite()));

        let mut p = [self.a + delta[0], self.b + delta[1], self.c + delta[2]];
        let projected = if self.is_left_shoulder() {
            let swapped = p[1] > p[2];
            if swapped {
                p.swap(1, 2);
            }
            p[0] = p[1];
            if p[1] == p[2] {
                return true;
            }
            swapped
        } else if self.is_right_shoulder() {
            let swapped = p[0] > p[1];
            if swapped {
                p.swap(0, 1);
            }
            p[2] = p[1];
            if p[0] == p[1] {
                return true;
            }
            swapped
        } else {
            let sorted = p[0] <= p[1] && p[1] <= p[2];
            if !sorted {
                p.sort_by(f64::total_cmp);
            }
            !sorted
        };

        self.a = p[0];
        self.b = p[1];
        self.c = p[2];
        projected
    }
}

fn check_feasible(a: f64, b: f64, c: f64) -> Result<()> {
    if !(a.is_finite() && b.is_finite() && c.is_finite()) {
        return Err(Error::InvalidConfig(format!(
            "triangle parameters must be finite, got [{a}, {b}, {c}]"
        )));
    }
    if !(a <= b && b <= c) {
        return Err(Error::InvalidConfig(format!(
            "triangle parameters must satisfy a <= b <= c, got [{a}, {b}, {c}]"
        )));
    }
    Ok(())
}

/// A named input variable: ordered membership functions and their labels.
///
/// `labels[i]` names `mfs[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputVariable {
    name: String,
    mfs: Vec<TriangularMf>,
    labels: Vec<String>,
}

impl InputVariable {
    pub fn new(name: impl Into<String>, mfs: Vec<TriangularMf>, labels: Vec<String>) -> Result<Self> {
        let name = name.into();
        if mfs.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "input variable '{name}' must have at least one membership function"
            )));
        }
        if mfs.len() != labels.len() {
            return Err(Error::InvalidConfig(format!(
                "input variable '{name}' has {} membership functions but {} labels",
                mfs.len(),
                labels.len()
            )));
        }
        Ok(Self { name, mfs, labels })
    }

    /// Build from raw `[a, b, c]` triples.
    pub fn from_ranges<S: AsRef<str>>(
        name: impl Into<String>,
        ranges: &[[f64; 3]],
        labels: &[S],
    ) -> Result<Self> {
        let name = name.into();
        let mut mfs = Vec::with_capacity(ranges.len());
        for (i, &[a, b, c]) in ranges.iter().enumerate() {
            let mf = TriangularMf::new(a, b, c).map_err(|e| {
                e.context(&format!("input variable '{name}' membership function {i}"))
            })?;
            mfs.push(mf);
        }
        let labels = labels.iter().map(|l| l.as_ref().to_owned()).collect();
        Self::new(name, mfs, labels)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of membership functions.
    #[inline]
    pub fn len(&self) -> usize {
        self.mfs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mfs.is_empty()
    }

    #[inline]
    pub fn mfs(&self) -> &[TriangularMf] {
        &self.mfs
    }

    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn mf(&self, idx: usize) -> Result<&TriangularMf> {
        self.mfs.get(idx).ok_or_else(|| self.index_error(idx))
    }

    /// Position of the membership function named `label`, if any.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn params(&self, idx: usize) -> Result<[f64; 3]> {
        Ok(self.mf(idx)?.params())
    }

    pub fn set_params(&mut self, idx: usize, a: f64, b: f64, c: f64) -> Result<()> {
        let err = self.index_error(idx);
        let mf = self.mfs.get_mut(idx).ok_or(err)?;
        mf.set_params(a, b, c)
    }

    /// Writes one grade per membership function into `out`.
    ///
    /// Shape contract: `out.len() == self.len()`.
    #[inline]
    pub fn grades_into(&self, x: f64, out: &mut [f64]) {
        assert_eq!(
            out.len(),
            self.mfs.len(),
            "grade buffer len {} does not match membership function count {}",
            out.len(),
            self.mfs.len()
        );
        for (g, mf) in out.iter_mut().zip(&self.mfs) {
            *g = mf.grade(x);
        }
    }

    pub fn grades(&self, x: f64) -> Vec<f64> {
        let mut out = vec![0.0; self.mfs.len()];
        self.grades_into(x, &mut out);
        out
    }

    #[inline]
    pub(crate) fn mfs_mut(&mut self) -> &mut [TriangularMf] {
        &mut self.mfs
    }

    fn index_error(&self, idx: usize) -> Error {
        Error::InvalidData(format!(
            "membership function index {idx} out of range for '{}' ({} functions)",
            self.name,
            self.mfs.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "actual={actual} expected={expected}"
        );
    }

    #[test]
    fn triangle_is_exact_at_feet_and_peak() {
        let mf = TriangularMf::new(-50.0, 0.0, 50.0).unwrap();
        assert_eq!(mf.grade(-50.0), 0.0);
        assert_eq!(mf.grade(0.0), 1.0);
        assert_eq!(mf.grade(50.0), 0.0);
        assert_close(mf.grade(-25.0), 0.5);
        assert_close(mf.grade(40.0), 0.2);
        assert_eq!(mf.grade(-80.0), 0.0);
        assert_eq!(mf.grade(51.0), 0.0);
    }

    #[test]
    fn left_shoulder_saturates_below_peak() {
        let mf = TriangularMf::new(-100.0, -100.0, -50.0).unwrap();
        assert!(mf.is_left_shoulder());
        assert_eq!(mf.grade(-100.0), 1.0);
        assert_eq!(mf.grade(-1000.0), 1.0);
        assert_close(mf.grade(-75.0), 0.5);
        assert_eq!(mf.grade(-50.0), 0.0);
        assert_eq!(mf.grade(0.0), 0.0);
    }

    #[test]
    fn right_shoulder_saturates_above_peak() {
        let mf = TriangularMf::new(50.0, 100.0, 100.0).unwrap();
        assert!(mf.is_right_shoulder());
        assert_eq!(mf.grade(50.0), 0.0);
        assert_close(mf.grade(75.0), 0.5);
        assert_eq!(mf.grade(100.0), 1.0);
        assert_eq!(mf.grade(250.0), 1.0);
        assert_eq!(mf.grade(0.0), 0.0);
    }

    #[test]
    fn singleton_only_fires_at_peak() {
        let mf = TriangularMf::new(1.0, 1.0, 1.0).unwrap();
        assert_eq!(mf.grade(1.0), 1.0);
        assert_eq!(mf.grade(0.999), 0.0);
        assert_eq!(mf.grade(1.001), 0.0);
    }

    #[test]
    fn nan_input_grades_zero_for_every_shape() {
        for p in [
            [-50.0, 0.0, 50.0],
            [-100.0, -100.0, -50.0],
            [50.0, 100.0, 100.0],
            [1.0, 1.0, 1.0],
        ] {
            let mf = TriangularMf::new(p[0], p[1], p[2]).unwrap();
            assert_eq!(mf.grade_and_partials(f64::NAN), (0.0, [0.0; 3]), "{p:?}");
        }
        let var = InputVariable::from_ranges(
            "error",
            &[[-1.0, -1.0, 0.0], [-1.0, 0.0, 1.0], [0.0, 1.0, 1.0]],
            &["N", "Z", "P"],
        )
        .unwrap();
        assert_eq!(var.grades(f64::NAN), vec![0.0; 3]);
        assert_eq!(var.grades(f64::INFINITY), vec![0.0, 0.0, 1.0]);
        assert_eq!(var.grades(f64::NEG_INFINITY), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn rejects_infeasible_triples() {
        assert!(TriangularMf::new(0.0, -1.0, 1.0).is_err());
        assert!(TriangularMf::new(0.0, 2.0, 1.0).is_err());
        assert!(TriangularMf::new(f64::NAN, 0.0, 1.0).is_err());

        let mut mf = TriangularMf::new(0.0, 1.0, 2.0).unwrap();
        assert!(mf.set_params(3.0, 1.0, 2.0).is_err());
        assert_eq!(mf.params(), [0.0, 1.0, 2.0]);
    }

    #[test]
    fn partials_match_central_differences() {
        let base = [-2.0, 1.0, 5.0];
        let eps = 1e-6;
        for &x in &[-1.3, 0.4, 2.2, 4.1] {
            let mf = TriangularMf::new(base[0], base[1], base[2]).unwrap();
            let (_, partials) = mf.grade_and_partials(x);
            for p in 0..3 {
                let mut plus = base;
                let mut minus = base;
                plus[p] += eps;
                minus[p] -= eps;
                let g_plus = TriangularMf::new(plus[0], plus[1], plus[2]).unwrap().grade(x);
                let g_minus = TriangularMf::new(minus[0], minus[1], minus[2])
                    .unwrap()
                    .grade(x);
                let numeric = (g_plus - g_minus) / (2.0 * eps);
                assert!(
                    (partials[p] - numeric).abs() < 1e-6,
                    "x={x} p={p} analytic={} numeric={numeric}",
                    partials[p]
                );
            }
        }
    }

    #[test]
    fn apply_delta_projects_infeasible_updates() {
        let mut mf = TriangularMf::new(0.0, 1.0, 2.0).unwrap();
        assert!(!mf.apply_delta([0.1, 0.1, 0.1]));
        assert!(mf.apply_delta([5.0, 0.0, 0.0]));
        let [a, b, c] = mf.params();
        assert!(a <= b && b <= c);
        assert_close(a, 1.1);
        assert_close(b, 2.1);
        assert_close(c, 5.1);
    }

    #[test]
    fn apply_delta_keeps_shoulders_tied() {
        let mut left = TriangularMf::new(-100.0, -100.0, -50.0).unwrap();
        left.apply_delta([0.0, 3.0, -1.0]);
        assert!(left.is_left_shoulder());
        assert_eq!(left.params(), [-97.0, -97.0, -51.0]);

        let mut right = TriangularMf::new(50.0, 100.0, 100.0).unwrap();
        right.apply_delta([1.0, -2.0, 0.0]);
        assert!(right.is_right_shoulder());
        assert_eq!(right.params(), [51.0, 98.0, 98.0]);
    }

    #[test]
    fn overshooting_peak_does_not_turn_a_shoulder_around() {
        let mut left = TriangularMf::new(-100.0, -100.0, -50.0).unwrap();
        assert!(left.apply_delta([0.0, 150.0, 0.0]));
        assert!(left.is_left_shoulder());
        assert!(!left.is_right_shoulder());
        assert_eq!(left.params(), [-50.0, -50.0, 50.0]);
        assert_eq!(left.grade(-100.0), 1.0);
        assert_eq!(left.grade(100.0), 0.0);

        let mut right = TriangularMf::new(50.0, 100.0, 100.0).unwrap();
        assert!(right.apply_delta([0.0, -150.0, 0.0]));
        assert!(right.is_right_shoulder());
        assert_eq!(right.params(), [-50.0, 50.0, 50.0]);
        assert_eq!(right.grade(100.0), 1.0);
        assert_eq!(right.grade(-100.0), 0.0);
    }

    #[test]
    fn shoulder_step_collapsing_the_support_is_dropped() {
        let mut left = TriangularMf::new(-100.0, -100.0, -50.0).unwrap();
        assert!(left.apply_delta([0.0, 50.0, 0.0]));
        assert_eq!(left.params(), [-100.0, -100.0, -50.0]);

        let mut right = TriangularMf::new(50.0, 100.0, 100.0).unwrap();
        assert!(right.apply_delta([50.0, 0.0, 0.0]));
        assert_eq!(right.params(), [50.0, 100.0, 100.0]);
    }

    #[test]
    fn input_variable_checks_label_count() {
        let mfs = vec![TriangularMf::new(0.0, 1.0, 2.0).unwrap()];
        assert!(InputVariable::new("error", mfs.clone(), vec![]).is_err());
        let var = InputVariable::new("error", mfs, vec!["ZE".to_owned()]).unwrap();
        assert_eq!(var.len(), 1);
        assert_eq!(var.index_of("ZE"), Some(0));
        assert_eq!(var.grades(1.0), vec![1.0]);
    }

    #[test]
    fn set_params_rejects_out_of_range_index() {
        let mut var = InputVariable::from_ranges("error", &[[0.0, 1.0, 2.0]], &["ZE"]).unwrap();
        assert!(var.set_params(1, 0.0, 1.0, 2.0).is_err());
        var.set_params(0, -1.0, 0.0, 1.0).unwrap();
        assert_eq!(var.params(0).unwrap(), [-1.0, 0.0, 1.0]);
    }
}
