//! Least-squares estimation of the rule consequents.
//!
//! With the premise parameters fixed, the model output is linear in the consequents:
//! `y = sum_k nw_k * (c1_k * e1 + c2_k * e2 + bias_k)`. Each sample contributes one row
//! `[nw_0*e1, nw_0*e2, nw_0, nw_1*e1, ...]` and the target as right-hand side.
//!
//! The stacked system is solved with a truncated SVD (pseudo-inverse). Triangular
//! partitions of unity make the design matrix rank-deficient by construction, and the
//! pseudo-inverse returns the minimum-norm exact least-squares solution in that case.
//! If the SVD does not converge or produces non-finite values, the ridge-regularized
//! normal equations are solved by Cholesky instead.

use nalgebra::{DMatrix, DVector};

use crate::{Error, Result};

const SVD_MAX_ITERATIONS: usize = 10_000;

/// How a least-squares system was solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LseMethod {
    /// Truncated SVD pseudo-inverse.
    Svd,
    /// Ridge-regularized normal equations (fallback path).
    Ridge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LseSolution {
    pub theta: Vec<f64>,
    pub method: LseMethod,
    /// Numerical rank of the design matrix (SVD path); `cols` for the ridge path.
    pub rank: usize,
}

/// Row-major design matrix plus targets, grown one sample at a time.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    cols: usize,
    rows: Vec<f64>,
    targets: Vec<f64>,
}

impl LeastSquares {
    pub fn new(cols: usize) -> Self {
        Self::with_capacity(cols, 0)
    }

    pub fn with_capacity(cols: usize, rows: usize) -> Self {
        assert!(cols > 0, "least-squares system needs at least one column");
        Self {
            cols,
            rows: Vec::with_capacity(rows * cols),
            targets: Vec::with_capacity(rows),
        }
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of rows pushed so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.targets.clear();
    }

    /// Append one row. Shape contract: `row.len() == self.cols()`.
    pub fn push_row(&mut self, row: &[f64], target: f64) {
        assert_eq!(
            row.len(),
            self.cols,
            "row len {} does not match column count {}",
            row.len(),
            self.cols
        );
        self.rows.extend_from_slice(row);
        self.targets.push(target);
    }

    /// Append one row through a callback that fills a zeroed row in place.
    pub(crate) fn push_row_with(&mut self, target: f64, fill: impl FnOnce(&mut [f64])) {
        let start = self.rows.len();
        self.rows.resize(start + self.cols, 0.0);
        fill(&mut self.rows[start..]);
        self.targets.push(target);
    }

    /// Solve `min ||A theta - y||`.
    ///
    /// - `rcond`: singular values below `rcond * sigma_max` are treated as zero.
    /// - `ridge`: relative regularization of the fallback path,
    ///   `lambda = ridge * trace(A^T A) / cols`.
    pub fn solve(&self, rcond: f64, ridge: f64) -> Result<LseSolution> {
        if self.is_empty() {
            return Err(Error::InvalidData(
                "least-squares system has no rows".to_owned(),
            ));
        }
        if self.rows.iter().chain(&self.targets).any(|v| !v.is_finite()) {
            return Err(Error::NumericInstability(
                "least-squares system contains non-finite values".to_owned(),
            ));
        }

        let a = DMatrix::from_row_slice(self.len(), self.cols, &self.rows);
        let y = DVector::from_column_slice(&self.targets);

        match solve_svd(&a, &y, rcond) {
            Some(sol) => Ok(sol),
            None => {
                log::warn!(
                    "SVD least-squares solve failed ({}x{}), falling back to ridge",
                    self.len(),
                    self.cols
                );
                solve_ridge(&a, &y, ridge)
            }
        }
    }
}

fn solve_svd(a: &DMatrix<f64>, y: &DVector<f64>, rcond: f64) -> Option<LseSolution> {
    let svd = a.clone().try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATIONS)?;

    let sigma_max = svd.singular_values.max();
    let cutoff = sigma_max * rcond;
    let rank = svd.singular_values.iter().filter(|&&s| s > cutoff).count();

    let theta = svd.solve(y, cutoff).ok()?;
    if theta.iter().any(|v| !v.is_finite()) {
        return None;
    }

    log::debug!(
        "svd least squares: {}x{} rank {rank} (sigma_max={sigma_max:.3e})",
        a.nrows(),
        a.ncols()
    );
    Some(LseSolution {
        theta: theta.as_slice().to_vec(),
        method: LseMethod::Svd,
        rank,
    })
}

fn solve_ridge(a: &DMatrix<f64>, y: &DVector<f64>, ridge: f64) -> Result<LseSolution> {
    let n = a.ncols();
    let ata = a.tr_mul(a);
    let aty = a.tr_mul(y);

    let scale = (ata.trace() / n as f64).max(f64::MIN_POSITIVE);
    let lambda = ridge * scale;
    let regularized = ata + DMatrix::<f64>::identity(n, n) * lambda;

    let chol = regularized.cholesky().ok_or_else(|| {
        Error::NumericInstability(format!(
            "ridge-regularized normal equations are not positive definite (lambda={lambda:.3e})"
        ))
    })?;
    let theta = chol.solve(&aty);
    if theta.iter().any(|v| !v.is_finite()) {
        return Err(Error::NumericInstability(
            "ridge least-squares solution is not finite".to_owned(),
        ));
    }

    Ok(LseSolution {
        theta: theta.as_slice().to_vec(),
        method: LseMethod::Ridge,
        rank: n,
    })
}
