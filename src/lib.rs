//! A two-input, one-output ANFIS controller engine.
//!
//! `rust-anfis` implements an Adaptive Network-based Fuzzy Inference System used as a
//! fuzzy analogue of a PD controller: the inputs are a tracking error and its rate of
//! change (`delta_error`), the output is a control correction.
//!
//! The model is the classic five-layer first-order Takagi-Sugeno network:
//! triangular membership functions, product T-norm, normalized firing strengths,
//! linear rule consequents and weighted-average defuzzification. It learns with the
//! hybrid algorithm: least squares for the consequents and gradient descent with
//! momentum and an adaptive step size for the membership functions.
//!
//! # Panics vs `Result`
//!
//! This crate exposes two layers of API:
//!
//! - Low-level hot path (panics on misuse):
//!   - [`Anfis::forward`], [`Anfis::backward`]
//!     Buffers built for a different model are programmer error and panic via `assert!`.
//!
//! - High-level APIs (validated):
//!   - [`Anfis::infer`], [`Anfis::fit`], [`Anfis::evaluate`], [`Anfis::predict`]
//!     These validate inputs and return [`Result`].
//!
//! # Data layout
//!
//! - Scalars are `f64`.
//! - Rules are generated row-major: rule `k = i * n2 + j` pairs membership function `i`
//!   of `error` with membership function `j` of `delta_error`.
//! - Consequent vectors are laid out per rule as `[c1, c2, bias]`.
//!
//! # Logging
//!
//! Training progress is reported through the `log` facade; install any logger
//! (e.g. `env_logger`) to see it.
//!
//! # MSRV
//!
//! This crate's minimum supported Rust version (MSRV) is specified in `Cargo.toml`.

//! # Quick start
//!
//! ```rust
//! use rust_anfis::{AnfisConfig, Dataset};
//!
//! # fn main() -> rust_anfis::Result<()> {
//! let cfg = AnfisConfig::default();
//! let mut model = cfg.build_model(0)?;
//!
//! let mut inputs = Vec::new();
//! for i in -4..=4 {
//!     for j in -4..=4 {
//!         inputs.push([25.0 * i as f64, 2.5 * j as f64]);
//!     }
//! }
//! let train = Dataset::from_fn(&inputs, |e, de| 2.0 * e + 0.5 * de)?;
//!
//! let report = model.fit(&train, cfg.train_config()?)?;
//! assert!(report.converged);
//!
//! let u = model.infer(10.0, -1.0)?;
//! assert!((u - 19.5).abs() < 1e-3);
//! # Ok(())
//! # }
//! ```

//! # Driving epochs yourself
//!
//! `HybridTrainer` owns the optimizer state and buffers; run single epochs and inspect
//! the model between them:
//!
//! ```rust
//! use rust_anfis::{AnfisConfig, Dataset, HybridTrainer, TrainConfig};
//!
//! # fn main() -> rust_anfis::Result<()> {
//! let mut model = AnfisConfig::default().build_model(1)?;
//! let train = Dataset::from_rows(&[
//!     [-60.0, 4.0, 30.0],
//!     [0.0, 0.0, 0.0],
//!     [35.0, -7.5, -20.0],
//!     [80.0, 2.0, -55.0],
//! ])?;
//!
//! let mut trainer = HybridTrainer::new(&model, TrainConfig::default())?;
//! let report = trainer.run_epoch(&mut model, &train)?;
//! assert_eq!(report.epoch, 1);
//! assert_eq!(trainer.epoch(), 1);
//! # Ok(())
//! # }
//! ```

pub mod anfis;
pub mod builder;
pub mod config;
pub mod data;
pub mod error;
pub mod lse;
pub mod membership;
pub mod metrics;
pub mod optim;
pub mod rules;
pub mod train;

#[cfg(feature = "serde")]
pub mod serde_model;

pub use anfis::{Anfis, DEGENERATE_FIRING_SUM, PremiseGradients, Scratch};
pub use builder::AnfisBuilder;
pub use config::{
    AnfisConfig, MembershipFunctionsConfig, StructureConfig, TrainingParams, VariableConfig,
};
pub use data::{Dataset, TrainingSample};
pub use error::{Error, Result};
pub use lse::{LeastSquares, LseMethod, LseSolution};
pub use membership::{Input, InputVariable, TriangularMf};
pub use metrics::{ErrorAccumulator, Evaluation, Metric};
pub use optim::{PremiseMomentum, StepAdjustment, StepSize};
pub use rules::{Rule, RuleBase};
pub use train::{EpochReport, FitReport, HybridTrainer, TrainConfig};
