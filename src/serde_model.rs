//! Model serialization/deserialization (feature: `serde`).
//!
//! This module defines a versioned, stable on-disk format for `Anfis`, in the same
//! style as the configuration document and extended with the learned consequents.
//!
//! Design notes:
//! - We do NOT directly serialize `Anfis`/`RuleBase`, to keep the file format stable
//!   even if the internal representation changes.
//! - All deserialization validates variable names and counts, rule count and order,
//!   triangle feasibility, and that all parameters are finite.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::membership::{Input, InputVariable, TriangularMf};
use crate::rules::{NUM_INPUTS, RuleBase};
use crate::{Anfis, Error, Result};

#[cfg(feature = "serde")]
use std::path::Path;

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedAnfis {
    pub format_version: u32,
    /// `error` first, then `delta_error`.
    pub input_variables: Vec<SerializedInputVariable>,
    /// Row-major over `(error mf, delta_error mf)`.
    pub rules: Vec<SerializedRule>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedInputVariable {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
    pub ranges: Vec<[f64; 3]>,
    pub labels: Vec<String>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SerializedRule {
    pub antecedent: [usize; NUM_INPUTS],
    pub coefficients: [f64; NUM_INPUTS],
    pub bias: f64,
}

impl SerializedAnfis {
    pub fn validate(&self) -> Result<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported model format_version {}; expected {}",
                self.format_version, MODEL_FORMAT_VERSION
            )));
        }
        if self.input_variables.len() != NUM_INPUTS {
            return Err(Error::InvalidData(format!(
                "serialized model must have {NUM_INPUTS} input variables, got {}",
                self.input_variables.len()
            )));
        }

        let mut counts = [0; NUM_INPUTS];
        for (var, (ser, count)) in Input::ALL
            .into_iter()
            .zip(self.input_variables.iter().zip(counts.iter_mut()))
        {
            ser.validate(var)?;
            *count = ser.ranges.len();
        }

        let expected_rules = counts[0]
            .checked_mul(counts[1])
            .ok_or_else(|| Error::InvalidData("rule count overflow".to_owned()))?;
        if self.rules.len() != expected_rules {
            return Err(Error::InvalidData(format!(
                "rules length {} does not match {} * {} membership functions",
                self.rules.len(),
                counts[0],
                counts[1]
            )));
        }

        for (k, rule) in self.rules.iter().enumerate() {
            let expected = [k / counts[1], k % counts[1]];
            if rule.antecedent != expected {
                return Err(Error::InvalidData(format!(
                    "rule {k} has antecedent {:?}, expected {expected:?} (row-major order)",
                    rule.antecedent
                )));
            }
            if !(rule.coefficients.iter().all(|c| c.is_finite()) && rule.bias.is_finite()) {
                return Err(Error::InvalidData(format!(
                    "rule {k} consequent must contain only finite values"
                )));
            }
        }

        Ok(())
    }
}

impl SerializedInputVariable {
    fn validate(&self, var: Input) -> Result<()> {
        if self.name != var.name() {
            return Err(Error::InvalidData(format!(
                "input variable {} must be named '{}', got '{}'",
                var.index(),
                var.name(),
                self.name
            )));
        }
        if self.kind != TriangularMf::KIND {
            return Err(Error::InvalidData(format!(
                "{}: unsupported membership function type '{}'",
                self.name, self.kind
            )));
        }
        if self.ranges.is_empty() || self.ranges.len() != self.labels.len() {
            return Err(Error::InvalidData(format!(
                "{}: {} ranges and {} labels (must be equal and > 0)",
                self.name,
                self.ranges.len(),
                self.labels.len()
            )));
        }
        for (i, &[a, b, c]) in self.ranges.iter().enumerate() {
            TriangularMf::new(a, b, c).map_err(|e| {
                Error::InvalidData(format!("{}: range {i} invalid: {e}", self.name))
            })?;
        }
        Ok(())
    }

    fn into_input_variable(self) -> Result<InputVariable> {
        InputVariable::from_ranges(self.name, self.ranges.as_slice(), self.labels.as_slice())
            .map_err(|e| Error::InvalidData(format!("input variable invalid: {e}")))
    }
}

impl From<&Anfis> for SerializedAnfis {
    fn from(model: &Anfis) -> Self {
        let input_variables = model
            .inputs()
            .iter()
            .map(SerializedInputVariable::from)
            .collect();
        let rules = model
            .rules()
            .all_rules()
            .iter()
            .map(|r| SerializedRule {
                antecedent: r.antecedent(),
                coefficients: r.coefficients(),
                bias: r.bias(),
            })
            .collect();
        Self {
            format_version: MODEL_FORMAT_VERSION,
            input_variables,
            rules,
        }
    }
}

impl From<&InputVariable> for SerializedInputVariable {
    fn from(var: &InputVariable) -> Self {
        Self {
            name: var.name().to_owned(),
            kind: TriangularMf::KIND.to_owned(),
            ranges: var.mfs().iter().map(TriangularMf::params).collect(),
            labels: var.labels().to_vec(),
        }
    }
}

impl TryFrom<SerializedAnfis> for Anfis {
    type Error = Error;

    fn try_from(value: SerializedAnfis) -> std::result::Result<Self, Self::Error> {
        value.validate()?;

        let mut vars = value.input_variables.into_iter();
        let (Some(error), Some(delta_error)) = (vars.next(), vars.next()) else {
            return Err(Error::InvalidData(
                "serialized model must have 2 input variables".to_owned(),
            ));
        };
        let inputs = [error.into_input_variable()?, delta_error.into_input_variable()?];

        let mut rules = RuleBase::new([inputs[0].len(), inputs[1].len()])?;
        for (k, rule) in value.rules.iter().enumerate() {
            rules.set_consequent(k, &rule.coefficients, rule.bias)?;
        }

        Anfis::new(inputs, rules).map_err(|e| Error::InvalidData(format!("model invalid: {e}")))
    }
}

#[cfg(feature = "serde")]
impl Anfis {
    /// Serialize the model to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        let ser = SerializedAnfis::from(self);
        serde_json::to_string_pretty(&ser)
            .map_err(|e| Error::InvalidData(format!("failed to serialize model: {e}")))
    }

    /// Serialize the model to a compact JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        let ser = SerializedAnfis::from(self);
        serde_json::to_string(&ser)
            .map_err(|e| Error::InvalidData(format!("failed to serialize model: {e}")))
    }

    /// Parse a model from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedAnfis = serde_json::from_str(s)
            .map_err(|e| Error::InvalidData(format!("failed to parse model json: {e}")))?;
        ser.try_into()
    }

    /// Save the model to a JSON file (pretty-printed).
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string_pretty()?;
        let p = path.as_ref();
        std::fs::write(p, s)
            .map_err(|e| Error::InvalidData(format!("failed to write {}: {e}", p.display())))?;
        Ok(())
    }

    /// Load a model from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p)
            .map_err(|e| Error::InvalidData(format!("failed to read {}: {e}", p.display())))?;
        Self::from_json_str(&s)
    }
}
