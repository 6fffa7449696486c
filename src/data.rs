//! Training data.
//!
//! A `Dataset` is an ordered, validated collection of immutable
//! `(error, delta_error, target)` samples. Training only ever borrows it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use std::path::Path;

use crate::{Error, Result};

/// One labeled sample: crisp inputs plus the desired control output.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingSample {
    pub error: f64,
    pub delta_error: f64,
    pub target: f64,
}

impl TrainingSample {
    #[inline]
    pub fn new(error: f64, delta_error: f64, target: f64) -> Self {
        Self {
            error,
            delta_error,
            target,
        }
    }

    #[inline]
    pub fn inputs(&self) -> [f64; 2] {
        [self.error, self.delta_error]
    }

    fn validate(&self, idx: usize) -> Result<()> {
        if !(self.error.is_finite() && self.delta_error.is_finite() && self.target.is_finite()) {
            return Err(Error::InvalidData(format!(
                "sample {idx} has non-finite values: {self:?}"
            )));
        }
        Ok(())
    }
}

/// Serialized as a bare JSON array of samples; deserializing runs the same validation
/// as [`Dataset::from_samples`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "Vec<TrainingSample>", into = "Vec<TrainingSample>")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    samples: Vec<TrainingSample>,
}

impl Dataset {
    /// Build a dataset. Every value must be finite and there must be at least one sample.
    pub fn from_samples(samples: Vec<TrainingSample>) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::InvalidData("dataset must not be empty".to_owned()));
        }
        for (i, s) in samples.iter().enumerate() {
            s.validate(i)?;
        }
        Ok(Self { samples })
    }

    /// Build from `[error, delta_error, target]` rows.
    pub fn from_rows(rows: &[[f64; 3]]) -> Result<Self> {
        Self::from_samples(
            rows.iter()
                .map(|&[e, de, t]| TrainingSample::new(e, de, t))
                .collect(),
        )
    }

    /// Label `inputs` with a known control law, e.g. a reference PD controller.
    pub fn from_fn(inputs: &[[f64; 2]], target: impl Fn(f64, f64) -> f64) -> Result<Self> {
        Self::from_samples(
            inputs
                .iter()
                .map(|&[e, de]| TrainingSample::new(e, de, target(e, de)))
                .collect(),
        )
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Panics if `idx >= len`.
    #[inline]
    pub fn sample(&self, idx: usize) -> &TrainingSample {
        &self.samples[idx]
    }

    #[inline]
    pub fn samples(&self) -> &[TrainingSample] {
        &self.samples
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, TrainingSample> {
        self.samples.iter()
    }
}

impl TryFrom<Vec<TrainingSample>> for Dataset {
    type Error = Error;

    fn try_from(samples: Vec<TrainingSample>) -> Result<Self> {
        Self::from_samples(samples)
    }
}

impl From<Dataset> for Vec<TrainingSample> {
    fn from(data: Dataset) -> Self {
        data.samples
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a TrainingSample;
    type IntoIter = std::slice::Iter<'a, TrainingSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg(feature = "serde")]
impl Dataset {
    /// Parse a JSON array of `{error, delta_error, target}` objects.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| Error::InvalidData(format!("failed to parse dataset json: {e}")))
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::InvalidData(format!("failed to serialize dataset: {e}")))
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string()?;
        let p = path.as_ref();
        std::fs::write(p, s)
            .map_err(|e| Error::InvalidData(format!("failed to write {}: {e}", p.display())))
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p)
            .map_err(|e| Error::InvalidData(format!("failed to read {}: {e}", p.display())))?;
        Self::from_json_str(&s)
    }
}
