//! Controller configuration document.
//!
//! Mirrors `config/anfis_config.json`:
//!
//! - `anfis_structure`: variable counts and the epoch budget
//! - `membership_functions`: `(a, b, c)` triples and labels for `error` and `delta_error`
//! - `training_params`: hybrid-learning hyperparameters
//!
//! `AnfisConfig::default()` is the reference 5x5 controller. JSON parsing requires the
//! `serde` feature.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use std::path::Path;

use crate::membership::{Input, TriangularMf};
use crate::rules::NUM_INPUTS;
use crate::{Anfis, AnfisBuilder, Error, Result, TrainConfig};

const DEFAULT_LABELS: [&str; 5] = ["NB", "NS", "ZE", "PS", "PB"];

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnfisConfig {
    pub anfis_structure: StructureConfig,
    pub membership_functions: MembershipFunctionsConfig,
    pub training_params: TrainingParams,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureConfig {
    pub input_vars: usize,
    /// Membership functions per input variable.
    pub membership_functions: usize,
    pub output_vars: usize,
    pub training_epochs: usize,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            input_vars: NUM_INPUTS,
            membership_functions: 5,
            output_vars: 1,
            training_epochs: 100,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipFunctionsConfig {
    pub error: VariableConfig,
    pub delta_error: VariableConfig,
}

impl MembershipFunctionsConfig {
    pub fn variable(&self, var: Input) -> &VariableConfig {
        match var {
            Input::Error => &self.error,
            Input::DeltaError => &self.delta_error,
        }
    }
}

impl Default for MembershipFunctionsConfig {
    fn default() -> Self {
        Self {
            error: VariableConfig::trimf(
                &[
                    [-100.0, -100.0, -50.0],
                    [-100.0, -50.0, 0.0],
                    [-50.0, 0.0, 50.0],
                    [0.0, 50.0, 100.0],
                    [50.0, 100.0, 100.0],
                ],
                &DEFAULT_LABELS,
            ),
            delta_error: VariableConfig::trimf(
                &[
                    [-10.0, -10.0, -5.0],
                    [-10.0, -5.0, 0.0],
                    [-5.0, 0.0, 5.0],
                    [0.0, 5.0, 10.0],
                    [5.0, 10.0, 10.0],
                ],
                &DEFAULT_LABELS,
            ),
        }
    }
}

/// Membership functions of one input variable.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct VariableConfig {
    /// Membership function type; only `"trimf"` is supported.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
    pub ranges: Vec<[f64; 3]>,
    pub labels: Vec<String>,
}

impl VariableConfig {
    pub fn trimf<S: AsRef<str>>(ranges: &[[f64; 3]], labels: &[S]) -> Self {
        Self {
            kind: TriangularMf::KIND.to_owned(),
            ranges: ranges.to_vec(),
            labels: labels.iter().map(|l| l.as_ref().to_owned()).collect(),
        }
    }

    fn validate(&self, name: &str, expected: usize) -> Result<()> {
        if self.kind != TriangularMf::KIND {
            return Err(Error::InvalidConfig(format!(
                "{name}: unsupported membership function type '{}', expected '{}'",
                self.kind,
                TriangularMf::KIND
            )));
        }
        if self.ranges.len() != expected {
            return Err(Error::InvalidConfig(format!(
                "{name}: {} ranges, anfis_structure.membership_functions is {expected}",
                self.ranges.len()
            )));
        }
        if self.labels.len() != expected {
            return Err(Error::InvalidConfig(format!(
                "{name}: {} labels, anfis_structure.membership_functions is {expected}",
                self.labels.len()
            )));
        }
        for (i, &[a, b, c]) in self.ranges.iter().enumerate() {
            TriangularMf::new(a, b, c)
                .map_err(|e| e.context(&format!("{name}: range {i} ({})", self.labels[i])))?;
        }
        Ok(())
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingParams {
    pub learning_rate: f64,
    pub momentum: f64,
    pub error_goal: f64,
    pub initial_step_size: f64,
    pub step_size_decrease_rate: f64,
    pub step_size_increase_rate: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_lse_rcond"))]
    pub lse_rcond: f64,
    #[cfg_attr(feature = "serde", serde(default = "default_ridge"))]
    pub ridge: f64,
}

fn default_lse_rcond() -> f64 {
    TrainConfig::default().lse_rcond
}

fn default_ridge() -> f64 {
    TrainConfig::default().ridge
}

impl Default for TrainingParams {
    fn default() -> Self {
        let t = TrainConfig::default();
        Self {
            learning_rate: t.learning_rate,
            momentum: t.momentum,
            error_goal: t.error_goal,
            initial_step_size: t.initial_step_size,
            step_size_decrease_rate: t.step_size_decrease_rate,
            step_size_increase_rate: t.step_size_increase_rate,
            lse_rcond: t.lse_rcond,
            ridge: t.ridge,
        }
    }
}

impl AnfisConfig {
    /// Check every structural and numeric constraint before any training starts.
    pub fn validate(&self) -> Result<()> {
        let s = &self.anfis_structure;
        if s.input_vars != NUM_INPUTS {
            return Err(Error::InvalidConfig(format!(
                "anfis_structure.input_vars must be {NUM_INPUTS}, got {}",
                s.input_vars
            )));
        }
        if s.output_vars != 1 {
            return Err(Error::InvalidConfig(format!(
                "anfis_structure.output_vars must be 1, got {}",
                s.output_vars
            )));
        }
        if s.membership_functions == 0 {
            return Err(Error::InvalidConfig(
                "anfis_structure.membership_functions must be > 0".to_owned(),
            ));
        }
        for var in Input::ALL {
            self.membership_functions
                .variable(var)
                .validate(&format!("membership_functions.{}", var.name()), s.membership_functions)?;
        }
        self.build_train_config()
            .validate()
            .map_err(|e| e.context("training_params"))
    }

    /// Validated training hyperparameters, including the epoch budget.
    pub fn train_config(&self) -> Result<TrainConfig> {
        self.validate()?;
        Ok(self.build_train_config())
    }

    /// Validated model with seeded random initial consequents.
    pub fn build_model(&self, seed: u64) -> Result<Anfis> {
        self.validate()?;
        let mut builder = AnfisBuilder::new();
        for var in Input::ALL {
            let v = self.membership_functions.variable(var);
            builder = builder.add_input(var.name(), v.ranges.as_slice(), v.labels.as_slice())?;
        }
        builder.build_with_seed(seed)
    }

    fn build_train_config(&self) -> TrainConfig {
        let p = &self.training_params;
        TrainConfig {
            epochs: self.anfis_structure.training_epochs,
            learning_rate: p.learning_rate,
            momentum: p.momentum,
            error_goal: p.error_goal,
            initial_step_size: p.initial_step_size,
            step_size_decrease_rate: p.step_size_decrease_rate,
            step_size_increase_rate: p.step_size_increase_rate,
            lse_rcond: p.lse_rcond,
            ridge: p.ridge,
        }
    }
}

#[cfg(feature = "serde")]
impl AnfisConfig {
    /// Parse and validate a configuration document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: AnfisConfig = serde_json::from_str(s)
            .map_err(|e| Error::InvalidConfig(format!("failed to parse config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p)
            .map_err(|e| Error::InvalidConfig(format!("failed to read {}: {e}", p.display())))?;
        Self::from_json_str(&s)
    }

    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("failed to serialize config: {e}")))
    }
}
