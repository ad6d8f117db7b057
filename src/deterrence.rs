//! Log-normal deterrence function mapping travel cost to attractiveness.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, GravityError, Result};

/// Deterrence `f(c) = a · exp(-b · ln(c + 1)²)`.
///
/// The `+ 1` keeps `f(0)` finite and positive, so a zero cost does not by
/// itself produce zero deterrence. Disconnected zone pairs are handled by the
/// model driver, not here.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogNormalDeterrence {
    /// Scale of the deterrence values.
    pub a: f64,
    /// How quickly deterrence decays with log-cost.
    pub b: f64,
}

impl Default for LogNormalDeterrence {
    fn default() -> Self {
        Self { a: 0.05, b: 0.2 }
    }
}

impl LogNormalDeterrence {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    /// Both constants must be positive and finite.
    pub fn validate(&self) -> Result<()> {
        if !(self.a.is_finite() && self.a > 0.0) {
            return Err(GravityError::invalid_parameter(
                "a",
                "must be positive and finite",
                self.a,
            ));
        }
        if !(self.b.is_finite() && self.b > 0.0) {
            return Err(GravityError::invalid_parameter(
                "b",
                "must be positive and finite",
                self.b,
            ));
        }
        Ok(())
    }

    /// Evaluates the function for a single non-negative cost.
    pub fn evaluate(&self, cost: f64) -> f64 {
        let log_cost = cost.ln_1p();
        self.a * (-self.b * log_cost * log_cost).exp()
    }

    /// Applies the function to every cell of `cost`, returning a new matrix.
    pub fn apply(&self, cost: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        self.validate()?;
        ensure_non_negative("cost", cost.iter(), cost.shape())?;
        Ok(cost.map(|c| self.evaluate(c)))
    }
}

/// Computes the deterrence matrix for `cost` with constants `a` and `b`.
pub fn compute_deterrence(cost: &DMatrix<f64>, a: f64, b: f64) -> Result<DMatrix<f64>> {
    LogNormalDeterrence::new(a, b).apply(cost)
}
