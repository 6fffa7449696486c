//! Hybrid learning.
//!
//! One epoch alternates two phases over the whole training set:
//!
//! 1. consequent estimation: with the premise parameters fixed, solve all rule
//!    consequents jointly by least squares (`lse`)
//! 2. premise adaptation: with the consequents fixed, take one batch gradient step
//!    with momentum on every `(a, b, c)` (`optim`)
//!
//! The epoch error (RMSE) is measured between the two phases, on the consequents that
//! were just solved. It drives both the stopping rule and the step-size heuristic.
//!
//! `HybridTrainer` owns all training state and runs single epochs; `Anfis::fit` drives
//! epochs until the error goal or the epoch budget is reached.

use crate::lse::{LeastSquares, LseMethod, LseSolution};
use crate::metrics::{ErrorAccumulator, Metric};
use crate::optim::{PremiseMomentum, StepAdjustment, StepSize};
use crate::rules::PARAMS_PER_RULE;
use crate::{Anfis, Dataset, Error, PremiseGradients, Result, Scratch};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainConfig {
    /// Epoch budget.
    pub epochs: usize,
    /// Scales the raw premise gradient before the momentum update.
    pub learning_rate: f64,
    pub momentum: f64,
    /// Training stops once the epoch RMSE is at or below this.
    pub error_goal: f64,
    pub initial_step_size: f64,
    pub step_size_decrease_rate: f64,
    pub step_size_increase_rate: f64,
    /// Relative singular-value cutoff of the least-squares solve.
    pub lse_rcond: f64,
    /// Relative ridge factor of the least-squares fallback.
    pub ridge: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            learning_rate: 0.01,
            momentum: 0.9,
            error_goal: 0.001,
            initial_step_size: 0.01,
            step_size_decrease_rate: 0.9,
            step_size_increase_rate: 1.1,
            lse_rcond: 1e-10,
            ridge: 1e-8,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        let positive = [
            ("learning_rate", self.learning_rate),
            ("error_goal", self.error_goal),
            ("initial_step_size", self.initial_step_size),
            ("ridge", self.ridge),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be finite and > 0, got {v}"
                )));
            }
        }
        if !(self.momentum.is_finite() && (0.0..1.0).contains(&self.momentum)) {
            return Err(Error::InvalidConfig(format!(
                "momentum must be finite and in [0,1), got {}",
                self.momentum
            )));
        }
        let d = self.step_size_decrease_rate;
        if !(d.is_finite() && d > 0.0 && d < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "step_size_decrease_rate must be finite and in (0,1), got {d}"
            )));
        }
        let i = self.step_size_increase_rate;
        if !(i.is_finite() && i > 1.0) {
            return Err(Error::InvalidConfig(format!(
                "step_size_increase_rate must be finite and > 1, got {i}"
            )));
        }
        let r = self.lse_rcond;
        if !(r.is_finite() && r > 0.0 && r < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "lse_rcond must be finite and in (0,1), got {r}"
            )));
        }
        Ok(())
    }
}

/// Diagnostics for one hybrid epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// 1-based epoch index.
    pub epoch: usize,
    /// Training RMSE after the consequent solve.
    pub rmse: f64,
    /// Step size used by this epoch's premise update.
    pub step_size: f64,
    /// How the step size was adapted after this epoch.
    pub adjustment: StepAdjustment,
    pub lse_method: LseMethod,
    pub lse_rank: usize,
    /// Samples excluded because no rule fired for them.
    pub skipped_samples: usize,
    /// Membership functions projected back onto `a <= b <= c`.
    pub clamp_events: usize,
    /// `false` when the error goal was already met and the premise step was skipped.
    pub premise_updated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub epochs: Vec<EpochReport>,
    /// Training RMSE of the returned model. When the budget runs out, the consequents
    /// are solved once more for the last premise step, so this can differ from the last
    /// epoch's `rmse`.
    pub final_rmse: f64,
    /// Whether the error goal was reached within the epoch budget.
    pub converged: bool,
}

impl FitReport {
    /// Per-epoch RMSE, in order.
    pub fn error_history(&self) -> Vec<f64> {
        self.epochs.iter().map(|r| r.rmse).collect()
    }

    pub fn total_clamp_events(&self) -> usize {
        self.epochs.iter().map(|r| r.clamp_events).sum()
    }
}

/// Training state for one model: optimizer state plus reusable buffers.
///
/// The model itself is borrowed per epoch, so callers can inspect or checkpoint it
/// between epochs.
#[derive(Debug, Clone)]
pub struct HybridTrainer {
    cfg: TrainConfig,
    momentum: PremiseMomentum,
    step: StepSize,
    scratch: Scratch,
    grads: PremiseGradients,
    lse: LeastSquares,
    epoch: usize,
}

impl HybridTrainer {
    pub fn new(model: &Anfis, cfg: TrainConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            momentum: PremiseMomentum::new(model, cfg.momentum)?,
            step: StepSize::new(
                cfg.initial_step_size,
                cfg.step_size_increase_rate,
                cfg.step_size_decrease_rate,
            )?,
            scratch: model.scratch(),
            grads: model.gradients(),
            lse: LeastSquares::new(model.num_rules() * PARAMS_PER_RULE),
            epoch: 0,
        })
    }

    #[inline]
    pub fn config(&self) -> &TrainConfig {
        &self.cfg
    }

    /// Number of epochs run so far.
    #[inline]
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    #[inline]
    pub fn step_size(&self) -> &StepSize {
        &self.step
    }

    #[inline]
    pub fn momentum(&self) -> &PremiseMomentum {
        &self.momentum
    }

    /// Premise gradient of the last epoch (mean over the non-degenerate samples).
    #[inline]
    pub fn gradients(&self) -> &PremiseGradients {
        &self.grads
    }

    /// Run one hybrid epoch on `model`.
    ///
    /// `model` must be the model this trainer was created for. Errors carry the epoch
    /// number as context.
    pub fn run_epoch(&mut self, model: &mut Anfis, data: &Dataset) -> Result<EpochReport> {
        self.epoch += 1;
        let epoch = self.epoch;
        self.run_epoch_inner(model, data)
            .map_err(|e| e.context(&format!("epoch {epoch}")))
    }

    fn run_epoch_inner(&mut self, model: &mut Anfis, data: &Dataset) -> Result<EpochReport> {
        let (solution, skipped_samples) = self.solve_consequents(model, data)?;
        model.rules_mut().set_consequents_flat(&solution.theta);

        let rmse = self.premise_gradients(model, data)?;

        let step_size = self.step.value();
        let premise_updated = rmse > self.cfg.error_goal;
        let mut clamp_events = 0;
        if premise_updated {
            if !self.grads.is_finite() {
                return Err(Error::NumericInstability(
                    "premise gradient is not finite".to_owned(),
                ));
            }
            clamp_events =
                self.momentum
                    .step(model, &self.grads, self.cfg.learning_rate, step_size);
        }

        let adjustment = self.step.observe(rmse);
        if adjustment != StepAdjustment::Unchanged {
            log::debug!(
                "epoch {}: step size {adjustment:?} {step_size:.6} -> {:.6}",
                self.epoch,
                self.step.value()
            );
        }

        log::info!(
            "epoch {}: rmse={rmse:.6} step_size={step_size:.6} lse={:?} rank={}",
            self.epoch,
            solution.method,
            solution.rank
        );

        Ok(EpochReport {
            epoch: self.epoch,
            rmse,
            step_size,
            adjustment,
            lse_method: solution.method,
            lse_rank: solution.rank,
            skipped_samples,
            clamp_events,
            premise_updated,
        })
    }

    /// Re-solve the consequents for the current premises without a premise step.
    ///
    /// Returns the training RMSE of the resulting model. Does not count as an epoch.
    pub fn settle_consequents(&mut self, model: &mut Anfis, data: &Dataset) -> Result<f64> {
        let (solution, _) = self.solve_consequents(model, data)?;
        model.rules_mut().set_consequents_flat(&solution.theta);
        model.rmse(data)
    }

    /// Consequent estimation over a fixed premise snapshot.
    ///
    /// Each sample contributes the row `[nw_k * e, nw_k * de, nw_k]` for every rule `k`.
    /// Returns the solution and the number of degenerate samples left out.
    fn solve_consequents(&mut self, model: &Anfis, data: &Dataset) -> Result<(LseSolution, usize)> {
        self.lse.clear();
        let mut skipped = 0;
        for s in data {
            match model.forward_premise(s.error, s.delta_error, &mut self.scratch) {
                Ok(()) => {}
                Err(Error::DegenerateInput { .. }) => {
                    skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }
            let normalized = self.scratch.normalized();
            self.lse.push_row_with(s.target, |row| {
                for (cols, &nw) in row.chunks_exact_mut(PARAMS_PER_RULE).zip(normalized) {
                    cols[0] = nw * s.error;
                    cols[1] = nw * s.delta_error;
                    cols[2] = nw;
                }
            });
        }

        if self.lse.is_empty() {
            return Err(Error::InvalidData(format!(
                "no rule fires for any of the {} training samples",
                data.len()
            )));
        }

        let solution = self.lse.solve(self.cfg.lse_rcond, self.cfg.ridge)?;
        Ok((solution, skipped))
    }

    /// Batch gradient of the mean squared error over a fixed consequent snapshot.
    ///
    /// Fills `self.grads` and returns the training RMSE.
    fn premise_gradients(&mut self, model: &Anfis, data: &Dataset) -> Result<f64> {
        self.grads.zero();
        let mut acc = ErrorAccumulator::default();
        for s in data {
            let y = match model.forward(s.error, s.delta_error, &mut self.scratch) {
                Ok(y) => y,
                Err(Error::DegenerateInput { .. }) => continue,
                Err(e) => return Err(e),
            };
            acc.push(y, s.target);
            // d/dy (target - y)^2
            let d_output = 2.0 * (y - s.target);
            model.backward(s.error, s.delta_error, &self.scratch, d_output, &mut self.grads);
        }

        let rmse = acc.value(Metric::Rmse).ok_or_else(|| {
            Error::InvalidData("no rule fires for any training sample".to_owned())
        })?;
        self.grads.scale(1.0 / acc.count() as f64);
        Ok(rmse)
    }
}

impl Anfis {
    /// Train with hybrid learning until the error goal or the epoch budget is reached.
    ///
    /// `data` is only read. On error the model holds the parameters of the last
    /// completed step.
    pub fn fit(&mut self, data: &Dataset, cfg: TrainConfig) -> Result<FitReport> {
        let mut trainer = HybridTrainer::new(self, cfg)?;
        let mut epochs = Vec::with_capacity(cfg.epochs);
        let mut degenerate_streak = 0_usize;

        for _ in 0..cfg.epochs {
            let report = trainer.run_epoch(self, data)?;

            if report.skipped_samples > 0 {
                degenerate_streak += 1;
                if degenerate_streak >= 2 {
                    log::warn!(
                        "epoch {}: {} samples fire no rule ({} consecutive epochs)",
                        report.epoch,
                        report.skipped_samples,
                        degenerate_streak
                    );
                }
            } else {
                degenerate_streak = 0;
            }

            epochs.push(report);
            if report.rmse <= cfg.error_goal {
                log::info!(
                    "error goal {} reached at epoch {} (rmse={:.6})",
                    cfg.error_goal,
                    report.epoch,
                    report.rmse
                );
                return Ok(FitReport {
                    epochs,
                    final_rmse: report.rmse,
                    converged: true,
                });
            }
        }

        let mut final_rmse = epochs.last().map_or(f64::NAN, |r| r.rmse);
        if epochs.last().is_some_and(|r| r.premise_updated) {
            final_rmse = trainer
                .settle_consequents(self, data)
                .map_err(|e| e.context("final consequent solve"))?;
        }
        log::info!(
            "epoch budget of {} exhausted (rmse={final_rmse:.6}, goal {})",
            cfg.epochs,
            cfg.error_goal
        );
        Ok(FitReport {
            epochs,
            final_rmse,
            converged: false,
        })
    }
}
