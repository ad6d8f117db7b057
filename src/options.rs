//! Configuration for a complete gravity model run.

use serde::{Deserialize, Serialize};

use crate::deterrence::LogNormalDeterrence;
use crate::error::{GravityError, Result};
use crate::solving::BalancingOptions;

/// Aggregated configuration used by [`GravityModel`](crate::GravityModel).
///
/// `missing_value_substitute` is the deterrence assigned to zone pairs with
/// zero cost. With `0.0` those pairs never carry trips, but a network whose
/// connections cannot satisfy the trip ends will not converge. A small
/// positive value such as `1e-6` usually lets the run converge at the price of
/// routing some trips over pairs that have no connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityModelOptions {
    /// Constants of the deterrence function.
    pub deterrence: LogNormalDeterrence,
    /// Settings for the balancing loop.
    pub balancing: BalancingOptions,
    /// Deterrence used where the cost matrix has no connection.
    pub missing_value_substitute: f64,
}

impl Default for GravityModelOptions {
    fn default() -> Self {
        Self {
            deterrence: LogNormalDeterrence::default(),
            balancing: BalancingOptions::default(),
            missing_value_substitute: 0.0,
        }
    }
}

impl GravityModelOptions {
    /// Override the deterrence constants while preserving other defaults.
    pub fn with_deterrence(mut self, deterrence: LogNormalDeterrence) -> Self {
        self.deterrence = deterrence;
        self
    }

    /// Override the balancing settings while preserving other defaults.
    pub fn with_balancing(mut self, balancing: BalancingOptions) -> Self {
        self.balancing = balancing;
        self
    }

    /// Set the deterrence assigned to disconnected zone pairs.
    pub fn with_missing_value_substitute(mut self, substitute: f64) -> Self {
        self.missing_value_substitute = substitute;
        self
    }

    /// Validates every nested setting.
    pub fn validate(&self) -> Result<()> {
        self.deterrence.validate()?;
        self.balancing.validate()?;
        if !(self.missing_value_substitute.is_finite() && self.missing_value_substitute >= 0.0) {
            return Err(GravityError::invalid_parameter(
                "missing_value_substitute",
                "must be non-negative and finite",
                self.missing_value_substitute,
            ));
        }
        Ok(())
    }
}
