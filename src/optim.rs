//! Premise-parameter optimization.
//!
//! - `PremiseMomentum`: gradient descent with momentum over every `(a, b, c)`,
//!   projecting each updated triangle back onto `a <= b <= c`.
//! - `StepSize`: the adaptive step-size multiplier, driven by the per-epoch error.
//!
//! Optimizer state (velocities, error history) lives outside the model; the training
//! loop owns it and reuses it across epochs.

use crate::membership::Input;
use crate::{Anfis, Error, PremiseGradients, Result};

/// Number of trailing epoch errors kept by `StepSize`.
pub const ERROR_HISTORY: usize = 5;

/// Momentum state for every premise parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct PremiseMomentum {
    momentum: f64,
    velocity: [Vec<[f64; 3]>; 2],
}

impl PremiseMomentum {
    pub fn new(model: &Anfis, momentum: f64) -> Result<Self> {
        if !(momentum.is_finite() && (0.0..1.0).contains(&momentum)) {
            return Err(Error::InvalidConfig(format!(
                "momentum must be finite and in [0,1), got {momentum}"
            )));
        }
        Ok(Self {
            momentum,
            velocity: [
                vec![[0.0; 3]; model.input(Input::Error).len()],
                vec![[0.0; 3]; model.input(Input::DeltaError).len()],
            ],
        })
    }

    #[inline]
    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    #[inline]
    pub fn velocity(&self, var: Input, idx: usize) -> [f64; 3] {
        self.velocity[var.index()][idx]
    }

    /// Apply one update to every premise parameter:
    ///
    /// - `velocity = momentum * velocity - step_size * (learning_rate * grad)`
    /// - `param = project(param + velocity)`
    ///
    /// Returns the number of membership functions that had to be projected.
    pub fn step(
        &mut self,
        model: &mut Anfis,
        grads: &PremiseGradients,
        learning_rate: f64,
        step_size: f64,
    ) -> usize {
        assert!(
            learning_rate.is_finite() && learning_rate > 0.0,
            "learning rate must be finite and > 0"
        );
        assert!(
            step_size.is_finite() && step_size > 0.0,
            "step size must be finite and > 0"
        );

        let mut projected = 0;
        for var in Input::ALL {
            let velocity = &mut self.velocity[var.index()];
            let d_params = grads.d_params_of(var);
            let mfs = model.input_mut(var).mfs_mut();
            assert_eq!(velocity.len(), mfs.len(), "velocity shape mismatch");
            assert_eq!(d_params.len(), mfs.len(), "gradient shape mismatch");

            for ((mf, v), g) in mfs.iter_mut().zip(velocity.iter_mut()).zip(d_params) {
                for p in 0..3 {
                    v[p] = self.momentum.mul_add(v[p], -step_size * (learning_rate * g[p]));
                }
                if mf.apply_delta(*v) {
                    projected += 1;
                }
            }
        }
        projected
    }
}

/// Outcome of one step-size adaptation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAdjustment {
    Increased,
    Decreased,
    Unchanged,
}

/// Adaptive step-size multiplier.
///
/// After each epoch, `observe` the epoch error:
/// - the last 4 epoch-to-epoch changes are all strict decreases: grow by `increase_rate`
/// - the last 2 changes have strictly opposite signs (up/down or down/up): shrink by
///   `decrease_rate`
/// - otherwise leave it unchanged
#[derive(Debug, Clone, PartialEq)]
pub struct StepSize {
    value: f64,
    increase_rate: f64,
    decrease_rate: f64,
    history: [f64; ERROR_HISTORY],
    len: usize,
}

impl StepSize {
    pub fn new(initial: f64, increase_rate: f64, decrease_rate: f64) -> Result<Self> {
        if !(initial.is_finite() && initial > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "initial step size must be finite and > 0, got {initial}"
            )));
        }
        if !(increase_rate.is_finite() && increase_rate > 1.0) {
            return Err(Error::InvalidConfig(format!(
                "step size increase rate must be finite and > 1, got {increase_rate}"
            )));
        }
        if !(decrease_rate.is_finite() && decrease_rate > 0.0 && decrease_rate < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "step size decrease rate must be finite and in (0,1), got {decrease_rate}"
            )));
        }
        Ok(Self {
            value: initial,
            increase_rate,
            decrease_rate,
            history: [0.0; ERROR_HISTORY],
            len: 0,
        })
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Trailing epoch errors, oldest first.
    #[inline]
    pub fn history(&self) -> &[f64] {
        &self.history[ERROR_HISTORY - self.len..]
    }

    /// Record one epoch error and adapt the step size.
    pub fn observe(&mut self, error: f64) -> StepAdjustment {
        self.history.copy_within(1.., 0);
        self.history[ERROR_HISTORY - 1] = error;
        self.len = (self.len + 1).min(ERROR_HISTORY);

        let adjustment = self.classify();
        match adjustment {
            StepAdjustment::Increased => self.value *= self.increase_rate,
            StepAdjustment::Decreased => self.value *= self.decrease_rate,
            StepAdjustment::Unchanged => {}
        }
        adjustment
    }

    fn classify(&self) -> StepAdjustment {
        let h = self.history();

        if h.len() == ERROR_HISTORY && h.windows(2).all(|w| w[1] < w[0]) {
            return StepAdjustment::Increased;
        }

        if h.len() >= 3 {
            let [e0, e1, e2] = [h[h.len() - 3], h[h.len() - 2], h[h.len() - 1]];
            let zigzag = (e1 > e0 && e2 < e1) || (e1 < e0 && e2 > e1);
            if zigzag {
                return StepAdjustment::Decreased;
            }
        }

        StepAdjustment::Unchanged
    }
}
