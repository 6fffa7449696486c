//! Model builder.
//!
//! `AnfisBuilder` is the recommended way to define a model from raw triangle triples.
//! Inputs are added in order, `error` first and `delta_error` second; the rule base is
//! generated from their membership function counts.
//!
//! Consequents start at zero with `build`, or uniformly random in `[-1, 1]` with
//! `build_with_seed` / `build_with_rng`. The first hybrid epoch overwrites them either way.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::membership::{Input, InputVariable};
use crate::rules::{NUM_INPUTS, PARAMS_PER_RULE, RuleBase};
use crate::{Anfis, Error, Result};

#[derive(Debug, Clone, Default)]
/// Builder for an `Anfis`.
///
/// Example:
///
/// ```rust
/// use rust_anfis::AnfisBuilder;
///
/// # fn main() -> rust_anfis::Result<()> {
/// let model = AnfisBuilder::new()
///     .add_input("error", &[[-1.0, -1.0, 0.0], [-1.0, 0.0, 1.0], [0.0, 1.0, 1.0]], &["N", "Z", "P"])?
///     .add_input("delta_error", &[[-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0]], &["N", "P"])?
///     .build_with_seed(0)?;
/// assert_eq!(model.num_rules(), 6);
/// # Ok(())
/// # }
/// ```
pub struct AnfisBuilder {
    inputs: Vec<InputVariable>,
}

impl AnfisBuilder {
    pub fn new() -> Self {
        Self { inputs: Vec::new() }
    }

    /// Add the next input variable.
    ///
    /// `ranges[i]` is the `(a, b, c)` triple of membership function `i`, named `labels[i]`.
    pub fn add_input<S: AsRef<str>>(
        mut self,
        name: &str,
        ranges: &[[f64; 3]],
        labels: &[S],
    ) -> Result<Self> {
        let position = self.inputs.len();
        let Some(expected) = Input::ALL.get(position) else {
            return Err(Error::InvalidConfig(format!(
                "model accepts exactly {NUM_INPUTS} inputs, cannot add '{name}'"
            )));
        };
        if name != expected.name() {
            return Err(Error::InvalidConfig(format!(
                "input {position} must be named '{}', got '{name}'",
                expected.name()
            )));
        }
        self.inputs
            .push(InputVariable::from_ranges(name, ranges, labels)?);
        Ok(self)
    }

    /// Build with all consequents set to zero.
    pub fn build(self) -> Result<Anfis> {
        let inputs = self.into_inputs()?;
        let rules = RuleBase::new([inputs[0].len(), inputs[1].len()])?;
        Anfis::new(inputs, rules)
    }

    /// Build using a deterministic seed for the initial consequents.
    pub fn build_with_seed(self, seed: u64) -> Result<Anfis> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG for the initial consequents.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Anfis> {
        let mut model = self.build()?;
        let theta: Vec<f64> = (0..model.num_rules() * PARAMS_PER_RULE)
            .map(|_| rng.gen_range(-1.0..=1.0))
            .collect();
        model.rules_mut().set_consequents_flat(&theta);
        Ok(model)
    }

    fn into_inputs(self) -> Result<[InputVariable; NUM_INPUTS]> {
        let count = self.inputs.len();
        <[InputVariable; NUM_INPUTS]>::try_from(self.inputs).map_err(|_| {
            Error::InvalidConfig(format!(
                "model needs exactly {NUM_INPUTS} inputs (error, delta_error), got {count}"
            ))
        })
    }
}
