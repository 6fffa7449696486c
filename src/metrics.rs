//! Metrics.
//!
//! Metrics are evaluation helpers (they do not participate in learning). They are
//! accumulated sample-by-sample without allocating per step.

use crate::{Anfis, Dataset, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Supported evaluation metrics.
pub enum Metric {
    /// Root-mean-square error. This is the training error metric.
    Rmse,
    /// Mean squared error.
    Mse,
    /// Mean absolute error.
    Mae,
}

/// Running sums of prediction errors.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ErrorAccumulator {
    sum_sq: f64,
    sum_abs: f64,
    count: usize,
}

impl ErrorAccumulator {
    #[inline]
    pub fn push(&mut self, prediction: f64, target: f64) {
        let r = target - prediction;
        self.sum_sq = r.mul_add(r, self.sum_sq);
        self.sum_abs += r.abs();
        self.count += 1;
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Value of `metric` over everything pushed so far, or `None` if nothing was pushed.
    pub fn value(&self, metric: Metric) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(match metric {
            Metric::Rmse => (self.sum_sq / n).sqrt(),
            Metric::Mse => self.sum_sq / n,
            Metric::Mae => self.sum_abs / n,
        })
    }
}

/// Result of `Anfis::evaluate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub metric: Metric,
    pub value: f64,
    /// Samples excluded because no rule fired for them.
    pub skipped: usize,
}

impl Anfis {
    /// Predict one output per sample of `data`.
    ///
    /// Fails on the first sample for which no rule fires.
    pub fn predict(&self, data: &Dataset) -> Result<Vec<f64>> {
        let mut scratch = self.scratch();
        let mut preds = Vec::with_capacity(data.len());
        for (idx, s) in data.iter().enumerate() {
            let y = self
                .forward(s.error, s.delta_error, &mut scratch)
                .map_err(|e| e.context(&format!("sample {idx}")))?;
            preds.push(y);
        }
        Ok(preds)
    }

    /// Evaluate `metric` over `data`.
    ///
    /// Samples for which no rule fires are skipped and counted; if every sample is
    /// skipped the evaluation fails.
    pub fn evaluate(&self, data: &Dataset, metric: Metric) -> Result<Evaluation> {
        let mut scratch = self.scratch();
        let mut acc = ErrorAccumulator::default();
        let mut skipped = 0;
        for s in data {
            match self.forward(s.error, s.delta_error, &mut scratch) {
                Ok(y) => acc.push(y, s.target),
                Err(Error::DegenerateInput { .. }) => skipped += 1,
                Err(e) => return Err(e),
            }
        }
        let value = acc.value(metric).ok_or_else(|| {
            Error::InvalidData(format!(
                "no rule fires for any of the {} samples",
                data.len()
            ))
        })?;
        Ok(Evaluation {
            metric,
            value,
            skipped,
        })
    }

    /// Training-set RMSE, the error measured by the hybrid trainer.
    pub fn rmse(&self, data: &Dataset) -> Result<f64> {
        Ok(self.evaluate(data, Metric::Rmse)?.value)
    }
}
