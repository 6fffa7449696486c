//! The five-layer ANFIS model.
//!
//! Layers, for crisp inputs `x = (error, delta_error)`:
//!
//! 1. fuzzification: `g1 = grades(error)`, `g2 = grades(delta_error)`
//! 2. firing strength (product T-norm): `w_k = g1[i] * g2[j]` for rule `k = (i, j)`
//! 3. normalization: `nw_k = w_k / sum(w)`
//! 4. consequents: `f_k = c1_k * error + c2_k * delta_error + bias_k`
//! 5. aggregation: `y = sum(nw_k * f_k)`
//!
//! `forward` keeps every intermediate vector in a reusable `Scratch`, because the
//! hybrid trainer needs them for both the least-squares rows and the premise gradient.

use crate::membership::{Input, InputVariable};
use crate::rules::{NUM_INPUTS, RuleBase};
use crate::{Error, Result};

/// Firing-strength sums at or below this are treated as "no rule fires".
pub const DEGENERATE_FIRING_SUM: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct Anfis {
    inputs: [InputVariable; NUM_INPUTS],
    rules: RuleBase,
}

/// Reusable buffers for `Anfis::forward`.
///
/// After a successful forward pass this holds every layer's output for that sample.
#[derive(Debug, Clone)]
pub struct Scratch {
    grades: [Vec<f64>; NUM_INPUTS],
    firing: Vec<f64>,
    normalized: Vec<f64>,
    rule_outputs: Vec<f64>,
    firing_sum: f64,
    output: f64,
}

/// Gradient of the loss w.r.t. every premise parameter `(a, b, c)`.
///
/// Accumulate semantics: `Anfis::backward` adds into this buffer; call `zero` between batches.
#[derive(Debug, Clone, PartialEq)]
pub struct PremiseGradients {
    d_params: [Vec<[f64; 3]>; NUM_INPUTS],
    // dL/d(grade) per membership function, reused across samples.
    d_grades: [Vec<f64>; NUM_INPUTS],
}

impl Anfis {
    /// Assemble a model. The rule base must be generated for these inputs' membership counts.
    pub fn new(inputs: [InputVariable; NUM_INPUTS], rules: RuleBase) -> Result<Self> {
        for (idx, var) in inputs.iter().enumerate() {
            let expected = Input::ALL[idx].name();
            if var.name() != expected {
                return Err(Error::InvalidConfig(format!(
                    "input {idx} must be named '{expected}', got '{}'",
                    var.name()
                )));
            }
        }
        let counts = [inputs[0].len(), inputs[1].len()];
        if rules.mf_counts() != counts {
            return Err(Error::InvalidConfig(format!(
                "rule base was generated for membership counts {:?}, inputs have {counts:?}",
                rules.mf_counts()
            )));
        }
        Ok(Self { inputs, rules })
    }

    #[inline]
    pub fn input(&self, var: Input) -> &InputVariable {
        &self.inputs[var.index()]
    }

    #[inline]
    pub(crate) fn input_mut(&mut self, var: Input) -> &mut InputVariable {
        &mut self.inputs[var.index()]
    }

    #[inline]
    pub fn inputs(&self) -> &[InputVariable; NUM_INPUTS] {
        &self.inputs
    }

    #[inline]
    pub fn rules(&self) -> &RuleBase {
        &self.rules
    }

    #[inline]
    pub(crate) fn rules_mut(&mut self) -> &mut RuleBase {
        &mut self.rules
    }

    #[inline]
    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }

    /// Number of premise parameters (3 per membership function).
    pub fn num_premise_params(&self) -> usize {
        self.inputs.iter().map(|v| 3 * v.len()).sum()
    }

    /// Membership grades of `value` for every membership function of `var`, in order.
    ///
    /// Each grade is in `[0, 1]`; a NaN `value` grades `0` everywhere.
    pub fn grade(&self, var: Input, value: f64) -> Vec<f64> {
        self.input(var).grades(value)
    }

    pub fn get_params(&self, var: Input, idx: usize) -> Result<[f64; 3]> {
        self.input(var).params(idx)
    }

    /// Overwrite one membership function. Infeasible triples are rejected.
    pub fn set_params(&mut self, var: Input, idx: usize, a: f64, b: f64, c: f64) -> Result<()> {
        self.input_mut(var).set_params(idx, a, b, c)
    }

    pub fn consequent(&self, rule_id: usize) -> Result<([f64; NUM_INPUTS], f64)> {
        self.rules.consequent(rule_id)
    }

    pub fn set_consequent(&mut self, rule_id: usize, coefficients: &[f64], bias: f64) -> Result<()> {
        self.rules.set_consequent(rule_id, coefficients, bias)
    }

    pub fn scratch(&self) -> Scratch {
        Scratch::new(self)
    }

    pub fn gradients(&self) -> PremiseGradients {
        PremiseGradients::new(self)
    }

    /// Run all five layers for one input pair and return the output.
    ///
    /// Fails with `DegenerateInput` when no rule fires; layers 1-2 are still left in
    /// `scratch` in that case.
    ///
    /// Shape contract: `scratch` must be built for this model.
    pub fn forward(&self, error: f64, delta_error: f64, scratch: &mut Scratch) -> Result<f64> {
        self.forward_premise(error, delta_error, scratch)?;

        let x = [error, delta_error];
        let mut output = 0.0_f64;
        for (k, rule) in self.rules.all_rules().iter().enumerate() {
            let f = rule.evaluate(x);
            scratch.rule_outputs[k] = f;
            output = scratch.normalized[k].mul_add(f, output);
        }
        scratch.output = output;
        Ok(output)
    }

    /// Layers 1-3 only. These do not depend on the consequents.
    pub(crate) fn forward_premise(
        &self,
        error: f64,
        delta_error: f64,
        scratch: &mut Scratch,
    ) -> Result<()> {
        if !(error.is_finite() && delta_error.is_finite()) {
            return Err(Error::InvalidData(format!(
                "inputs must be finite, got error={error}, delta_error={delta_error}"
            )));
        }
        assert_eq!(
            scratch.firing.len(),
            self.rules.len(),
            "scratch has {} rule slots, model has {} rules",
            scratch.firing.len(),
            self.rules.len()
        );

        let x = [error, delta_error];
        for ((var, grades), &v) in self.inputs.iter().zip(scratch.grades.iter_mut()).zip(&x) {
            var.grades_into(v, grades);
        }

        let mut sum = 0.0_f64;
        for (k, rule) in self.rules.all_rules().iter().enumerate() {
            let [i, j] = rule.antecedent();
            let w = scratch.grades[0][i] * scratch.grades[1][j];
            scratch.firing[k] = w;
            sum += w;
        }
        scratch.firing_sum = sum;

        if !(sum > DEGENERATE_FIRING_SUM) {
            scratch.normalized.fill(0.0);
            return Err(Error::DegenerateInput { error, delta_error });
        }

        let inv = 1.0 / sum;
        for (nw, &w) in scratch.normalized.iter_mut().zip(&scratch.firing) {
            *nw = w * inv;
        }
        Ok(())
    }

    /// Control output for one input pair.
    ///
    /// Pure: repeated calls with the same model and inputs return identical results.
    pub fn infer(&self, error: f64, delta_error: f64) -> Result<f64> {
        let mut scratch = self.scratch();
        self.forward(error, delta_error, &mut scratch)
    }

    /// `infer`, limited to the actuator range `[min, max]`.
    pub fn infer_clamped(&self, error: f64, delta_error: f64, min: f64, max: f64) -> Result<f64> {
        if !(min.is_finite() && max.is_finite() && min <= max) {
            return Err(Error::InvalidConfig(format!(
                "output limits must be finite with min <= max, got [{min}, {max}]"
            )));
        }
        Ok(self.infer(error, delta_error)?.clamp(min, max))
    }

    /// Accumulate `dL/d(premise)` for one sample into `grads`.
    ///
    /// You must call `forward` first with the same inputs and `scratch`.
    /// `d_output` is the upstream gradient `dL/dy`.
    pub fn backward(
        &self,
        error: f64,
        delta_error: f64,
        scratch: &Scratch,
        d_output: f64,
        grads: &mut PremiseGradients,
    ) {
        assert_eq!(
            grads.d_params[0].len(),
            self.inputs[0].len(),
            "grads has {} error slots, model has {}",
            grads.d_params[0].len(),
            self.inputs[0].len()
        );
        assert_eq!(
            grads.d_params[1].len(),
            self.inputs[1].len(),
            "grads has {} delta_error slots, model has {}",
            grads.d_params[1].len(),
            self.inputs[1].len()
        );
        debug_assert!(scratch.firing_sum > DEGENERATE_FIRING_SUM);

        for d in grads.d_grades.iter_mut() {
            d.fill(0.0);
        }

        // dy/dw_k = (f_k - y) / sum(w)
        let inv_sum = 1.0 / scratch.firing_sum;
        let y = scratch.output;
        for (k, rule) in self.rules.all_rules().iter().enumerate() {
            let d_w = d_output * (scratch.rule_outputs[k] - y) * inv_sum;
            let [i, j] = rule.antecedent();
            grads.d_grades[0][i] = d_w.mul_add(scratch.grades[1][j], grads.d_grades[0][i]);
            grads.d_grades[1][j] = d_w.mul_add(scratch.grades[0][i], grads.d_grades[1][j]);
        }

        let x = [error, delta_error];
        for v in 0..NUM_INPUTS {
            for (m, mf) in self.inputs[v].mfs().iter().enumerate() {
                let d_g = grads.d_grades[v][m];
                if d_g == 0.0 {
                    continue;
                }
                let (_, partials) = mf.grade_and_partials(x[v]);
                let slot = &mut grads.d_params[v][m];
                for p in 0..3 {
                    slot[p] = d_g.mul_add(partials[p], slot[p]);
                }
            }
        }
    }
}

impl Scratch {
    pub fn new(model: &Anfis) -> Self {
        let n = model.num_rules();
        Self {
            grades: [
                vec![0.0; model.inputs[0].len()],
                vec![0.0; model.inputs[1].len()],
            ],
            firing: vec![0.0; n],
            normalized: vec![0.0; n],
            rule_outputs: vec![0.0; n],
            firing_sum: 0.0,
            output: 0.0,
        }
    }

    /// Layer 1 output for `var`.
    #[inline]
    pub fn grades(&self, var: Input) -> &[f64] {
        &self.grades[var.index()]
    }

    /// Layer 2 output (raw firing strengths).
    #[inline]
    pub fn firing(&self) -> &[f64] {
        &self.firing
    }

    /// Layer 3 output (normalized firing strengths).
    #[inline]
    pub fn normalized(&self) -> &[f64] {
        &self.normalized
    }

    /// Layer 4 output before weighting.
    #[inline]
    pub fn rule_outputs(&self) -> &[f64] {
        &self.rule_outputs
    }

    #[inline]
    pub fn firing_sum(&self) -> f64 {
        self.firing_sum
    }

    /// Layer 5 output.
    #[inline]
    pub fn output(&self) -> f64 {
        self.output
    }
}

impl PremiseGradients {
    pub fn new(model: &Anfis) -> Self {
        let n1 = model.inputs[0].len();
        let n2 = model.inputs[1].len();
        Self {
            d_params: [vec![[0.0; 3]; n1], vec![[0.0; 3]; n2]],
            d_grades: [vec![0.0; n1], vec![0.0; n2]],
        }
    }

    pub fn zero(&mut self) {
        for v in self.d_params.iter_mut() {
            v.fill([0.0; 3]);
        }
    }

    /// Gradient for membership function `idx` of `var`.
    #[inline]
    pub fn d_params(&self, var: Input, idx: usize) -> [f64; 3] {
        self.d_params[var.index()][idx]
    }

    #[inline]
    pub fn d_params_of(&self, var: Input) -> &[[f64; 3]] {
        &self.d_params[var.index()]
    }

    pub fn scale(&mut self, factor: f64) {
        for v in self.d_params.iter_mut() {
            for slot in v.iter_mut() {
                for g in slot.iter_mut() {
                    *g *= factor;
                }
            }
        }
    }

    pub fn is_finite(&self) -> bool {
        self.d_params
            .iter()
            .flat_map(|v| v.iter())
            .all(|slot| slot.iter().all(|g| g.is_finite()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnfisBuilder;

    const ERROR_RANGES: [[f64; 3]; 5] = [
        [-100.0, -100.0, -50.0],
        [-100.0, -50.0, 0.0],
        [-50.0, 0.0, 50.0],
        [0.0, 50.0, 100.0],
        [50.0, 100.0, 100.0],
    ];
    const DELTA_RANGES: [[f64; 3]; 5] = [
        [-10.0, -10.0, -5.0],
        [-10.0, -5.0, 0.0],
        [-5.0, 0.0, 5.0],
        [0.0, 5.0, 10.0],
        [5.0, 10.0, 10.0],
    ];
    const LABELS: [&str; 5] = ["NB", "NS", "ZE", "PS", "PB"];

    fn controller() -> Anfis {
        AnfisBuilder::new()
            .add_input("error", &ERROR_RANGES, &LABELS)
            .unwrap()
            .add_input("delta_error", &DELTA_RANGES, &LABELS)
            .unwrap()
            .build_with_seed(7)
            .unwrap()
    }

    // Overlapping interior triangles, so central differences never straddle a kink.
    fn smooth_model() -> Anfis {
        let mut model = AnfisBuilder::new()
            .add_input(
                "error",
                &[[-3.0, -1.0, 1.5], [-2.0, 0.5, 3.0], [-0.5, 2.0, 4.0]],
                &["N", "Z", "P"],
            )
            .unwrap()
            .add_input("delta_error", &[[-2.0, 0.0, 2.5], [-1.0, 1.0, 3.0]], &["N", "P"])
            .unwrap()
            .build()
            .unwrap();
        for k in 0..model.num_rules() {
            let kf = k as f64;
            model
                .set_consequent(k, &[0.3 * kf - 1.0, 0.7 - 0.2 * kf], 0.5 * kf)
                .unwrap();
        }
        model
    }

    fn squared_error(model: &Anfis, x: [f64; 2], target: f64) -> f64 {
        let y = model.infer(x[0], x[1]).unwrap();
        (target - y) * (target - y)
    }

    #[test]
    fn normalized_strengths_sum_to_one() {
        let model = controller();
        let mut scratch = model.scratch();
        for &(e, de) in &[(0.0, 0.0), (37.5, -2.5), (-100.0, 10.0), (150.0, -30.0), (12.0, 7.7)] {
            model.forward(e, de, &mut scratch).unwrap();
            let total: f64 = scratch.normalized().iter().sum();
            assert!((total - 1.0).abs() < 1e-12, "sum={total} at ({e}, {de})");
        }
    }

    #[test]
    fn forward_exposes_all_layers() {
        let model = controller();
        let mut scratch = model.scratch();
        let y = model.forward(25.0, 2.5, &mut scratch).unwrap();

        assert_eq!(scratch.grades(Input::Error), &[0.0, 0.0, 0.5, 0.5, 0.0]);
        assert_eq!(scratch.grades(Input::DeltaError), &[0.0, 0.0, 0.5, 0.5, 0.0]);
        assert_eq!(scratch.firing().len(), 25);
        assert!((scratch.firing_sum() - 1.0).abs() < 1e-12);

        let mut manual = 0.0;
        for k in 0..25 {
            manual += scratch.normalized()[k] * scratch.rule_outputs()[k];
        }
        assert!((manual - y).abs() < 1e-9);
        assert_eq!(scratch.output(), y);
    }

    #[test]
    fn degenerate_input_is_reported() {
        let model = AnfisBuilder::new()
            .add_input("error", &[[-1.0, 0.0, 1.0]], &["ZE"])
            .unwrap()
            .add_input("delta_error", &[[-1.0, 0.0, 1.0]], &["ZE"])
            .unwrap()
            .build()
            .unwrap();
        let err = model.infer(5.0, 0.0).unwrap_err();
        assert_eq!(
            err,
            Error::DegenerateInput {
                error: 5.0,
                delta_error: 0.0
            }
        );
        assert!(model.infer(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn infer_is_deterministic() {
        let model = controller();
        for &(e, de) in &[(0.0, 0.0), (50.0, 0.0), (-50.0, 0.0), (25.0, 5.0), (-25.0, -5.0)] {
            let a = model.infer(e, de).unwrap();
            let b = model.infer(e, de).unwrap();
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn infer_clamped_limits_output() {
        let mut model = controller();
        for k in 0..model.num_rules() {
            model.set_consequent(k, &[0.0, 0.0], 500.0).unwrap();
        }
        assert_eq!(model.infer_clamped(0.0, 0.0, -100.0, 100.0).unwrap(), 100.0);
        assert!(model.infer_clamped(0.0, 0.0, 1.0, -1.0).is_err());
    }

    #[test]
    fn rejects_mismatched_rule_base() {
        let model = controller();
        let [e, de] = model.inputs().clone();
        assert!(Anfis::new([e, de], RuleBase::new([5, 4]).unwrap()).is_err());
    }

    #[test]
    fn backward_matches_numeric_gradients() {
        let model = smooth_model();
        let x = [0.3, 0.45];
        let target = 1.75;

        let mut scratch = model.scratch();
        let mut grads = model.gradients();
        let y = model.forward(x[0], x[1], &mut scratch).unwrap();
        // L = (target - y)^2
        model.backward(x[0], x[1], &scratch, 2.0 * (y - target), &mut grads);

        let eps = 1e-6;
        for var in Input::ALL {
            for m in 0..model.input(var).len() {
                let base = model.get_params(var, m).unwrap();
                for p in 0..3 {
                    let mut plus = base;
                    let mut minus = base;
                    plus[p] += eps;
                    minus[p] -= eps;

                    let mut probe = model.clone();
                    probe.set_params(var, m, plus[0], plus[1], plus[2]).unwrap();
                    let loss_plus = squared_error(&probe, x, target);
                    probe.set_params(var, m, minus[0], minus[1], minus[2]).unwrap();
                    let loss_minus = squared_error(&probe, x, target);

                    let numeric = (loss_plus - loss_minus) / (2.0 * eps);
                    let analytic = grads.d_params(var, m)[p];
                    let scale = analytic.abs().max(numeric.abs()).max(1.0);
                    assert!(
                        (analytic - numeric).abs() / scale < 1e-5,
                        "{var:?}[{m}].{p}: analytic={analytic} numeric={numeric}"
                    );
                }
            }
        }
    }

    #[test]
    fn backward_accumulates_until_zeroed() {
        let model = smooth_model();
        let mut scratch = model.scratch();
        let mut grads = model.gradients();

        let y = model.forward(0.3, 0.45, &mut scratch).unwrap();
        model.backward(0.3, 0.45, &scratch, y, &mut grads);
        let once = grads.clone();
        model.backward(0.3, 0.45, &scratch, y, &mut grads);

        let a = once.d_params(Input::Error, 1)[1];
        let b = grads.d_params(Input::Error, 1)[1];
        assert!(a != 0.0);
        assert!((b - 2.0 * a).abs() < 1e-12);

        grads.zero();
        assert_eq!(grads.d_params(Input::Error, 1), [0.0; 3]);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn forward_panics_on_scratch_mismatch() {
        let a = controller();
        let b = smooth_model();
        let mut scratch_b = b.scratch();
        let _ = a.forward(0.0, 0.0, &mut scratch_b);
    }
}
