//! Rule base.
//!
//! Rules are the Cartesian product of the membership functions of both inputs,
//! generated once in row-major order: rule `k = i * n2 + j` pairs membership function
//! `i` of the error with membership function `j` of the delta-error.
//!
//! Each rule owns a first-order (Takagi-Sugeno) consequent
//! `f = c1 * error + c2 * delta_error + bias`.

use crate::{Error, Result};

/// Number of crisp inputs.
pub const NUM_INPUTS: usize = 2;

/// Consequent parameters per rule: one coefficient per input plus a bias.
pub const PARAMS_PER_RULE: usize = NUM_INPUTS + 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    antecedent: [usize; NUM_INPUTS],
    coefficients: [f64; NUM_INPUTS],
    bias: f64,
}

impl Rule {
    /// Membership function index per input variable.
    #[inline]
    pub fn antecedent(&self) -> [usize; NUM_INPUTS] {
        self.antecedent
    }

    #[inline]
    pub fn coefficients(&self) -> [f64; NUM_INPUTS] {
        self.coefficients
    }

    #[inline]
    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Consequent output for crisp inputs `x`.
    #[inline]
    pub fn evaluate(&self, x: [f64; NUM_INPUTS]) -> f64 {
        let mut acc = self.bias;
        for (c, v) in self.coefficients.iter().zip(x) {
            acc = c.mul_add(v, acc);
        }
        acc
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleBase {
    mf_counts: [usize; NUM_INPUTS],
    rules: Vec<Rule>,
}

impl RuleBase {
    /// Generate the full rule set for the given per-input membership function counts.
    ///
    /// All consequents start at zero.
    pub fn new(mf_counts: [usize; NUM_INPUTS]) -> Result<Self> {
        if mf_counts.contains(&0) {
            return Err(Error::InvalidConfig(format!(
                "every input needs at least one membership function, got counts {mf_counts:?}"
            )));
        }

        let [n1, n2] = mf_counts;
        let mut rules = Vec::with_capacity(n1 * n2);
        for i in 0..n1 {
            for j in 0..n2 {
                rules.push(Rule {
                    antecedent: [i, j],
                    coefficients: [0.0; NUM_INPUTS],
                    bias: 0.0,
                });
            }
        }

        Ok(Self { mf_counts, rules })
    }

    #[inline]
    pub fn mf_counts(&self) -> [usize; NUM_INPUTS] {
        self.mf_counts
    }

    #[inline]
    pub fn all_rules(&self) -> &[Rule] {
        &self.rules
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Id of the rule pairing error membership function `i` with delta-error function `j`.
    pub fn rule_id(&self, i: usize, j: usize) -> Option<usize> {
        let [n1, n2] = self.mf_counts;
        (i < n1 && j < n2).then_some(i * n2 + j)
    }

    pub fn rule(&self, rule_id: usize) -> Result<&Rule> {
        self.rules.get(rule_id).ok_or_else(|| {
            Error::InvalidData(format!(
                "rule id {rule_id} out of range ({} rules)",
                self.rules.len()
            ))
        })
    }

    pub fn consequent(&self, rule_id: usize) -> Result<([f64; NUM_INPUTS], f64)> {
        let rule = self.rule(rule_id)?;
        Ok((rule.coefficients, rule.bias))
    }

    /// Overwrite one rule's consequent. `coefficients` must hold one value per input.
    pub fn set_consequent(&mut self, rule_id: usize, coefficients: &[f64], bias: f64) -> Result<()> {
        if coefficients.len() != NUM_INPUTS {
            return Err(Error::InvalidData(format!(
                "consequent needs {NUM_INPUTS} coefficients, got {}",
                coefficients.len()
            )));
        }
        let len = self.rules.len();
        let rule = self.rules.get_mut(rule_id).ok_or_else(|| {
            Error::InvalidData(format!("rule id {rule_id} out of range ({len} rules)"))
        })?;
        rule.coefficients.copy_from_slice(coefficients);
        rule.bias = bias;
        Ok(())
    }

    /// Overwrite every consequent from a flat vector laid out as
    /// `[c1_0, c2_0, bias_0, c1_1, c2_1, bias_1, ...]`.
    pub(crate) fn set_consequents_flat(&mut self, theta: &[f64]) {
        assert_eq!(
            theta.len(),
            self.rules.len() * PARAMS_PER_RULE,
            "theta len {} does not match rules * {PARAMS_PER_RULE} ({})",
            theta.len(),
            self.rules.len() * PARAMS_PER_RULE
        );
        for (rule, p) in self.rules.iter_mut().zip(theta.chunks_exact(PARAMS_PER_RULE)) {
            rule.coefficients.copy_from_slice(&p[..NUM_INPUTS]);
            rule.bias = p[NUM_INPUTS];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_are_row_major_cartesian_product() {
        let rb = RuleBase::new([5, 5]).unwrap();
        assert_eq!(rb.len(), 25);
        assert_eq!(rb.all_rules()[0].antecedent(), [0, 0]);
        assert_eq!(rb.all_rules()[1].antecedent(), [0, 1]);
        assert_eq!(rb.all_rules()[5].antecedent(), [1, 0]);
        assert_eq!(rb.all_rules()[24].antecedent(), [4, 4]);
        assert_eq!(rb.rule_id(2, 3), Some(13));
        assert_eq!(rb.rule_id(5, 0), None);
    }

    #[test]
    fn rule_count_is_product_of_mf_counts() {
        for (n1, n2) in [(1, 1), (3, 4), (7, 2)] {
            assert_eq!(RuleBase::new([n1, n2]).unwrap().len(), n1 * n2);
        }
        assert!(RuleBase::new([0, 3]).is_err());
    }

    #[test]
    fn consequent_roundtrips_and_checks_dimensionality() {
        let mut rb = RuleBase::new([2, 2]).unwrap();
        rb.set_consequent(3, &[1.5, -2.0], 0.25).unwrap();
        assert_eq!(rb.consequent(3).unwrap(), ([1.5, -2.0], 0.25));
        assert!(rb.set_consequent(3, &[1.0], 0.0).is_err());
        assert!(rb.set_consequent(4, &[1.0, 2.0], 0.0).is_err());
        assert!(rb.consequent(4).is_err());
    }

    #[test]
    fn evaluate_is_linear_in_inputs() {
        let mut rb = RuleBase::new([1, 1]).unwrap();
        rb.set_consequent(0, &[2.0, 0.5], -1.0).unwrap();
        let rule = rb.all_rules()[0];
        assert_eq!(rule.evaluate([3.0, 4.0]), 2.0 * 3.0 + 0.5 * 4.0 - 1.0);
    }
}
