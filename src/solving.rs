//! Balancing solver configuration and diagnostics.

use serde::{Deserialize, Serialize};

use crate::error::{GravityError, Result};

/// Configuration for the Furness balancing loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancingOptions {
    /// Maximum number of balancing iterations; also the only bound on runtime.
    pub max_steps: usize,
    /// Relative margin imbalance below which the run counts as converged.
    pub error_limit: f64,
    /// Guard added to every factor denominator so unreachable zones stay finite.
    pub epsilon: f64,
}

impl Default for BalancingOptions {
    fn default() -> Self {
        Self {
            max_steps: 1_000,
            error_limit: 1e-3,
            epsilon: 1e-9,
        }
    }
}

impl BalancingOptions {
    /// Creates options with the given iteration budget and tolerance and the default guard.
    pub fn new(max_steps: usize, error_limit: f64) -> Self {
        Self {
            max_steps,
            error_limit,
            ..Self::default()
        }
    }

    /// Overrides the iteration budget.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Overrides the convergence tolerance.
    pub fn with_error_limit(mut self, error_limit: f64) -> Self {
        self.error_limit = error_limit;
        self
    }

    /// Overrides the denominator guard.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Rejects settings the balancing loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_steps < 1 {
            return Err(GravityError::invalid_parameter(
                "max_steps",
                "must be at least 1",
                self.max_steps as f64,
            ));
        }
        if !(self.error_limit.is_finite() && self.error_limit > 0.0) {
            return Err(GravityError::invalid_parameter(
                "error_limit",
                "must be positive and finite",
                self.error_limit,
            ));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(GravityError::invalid_parameter(
                "epsilon",
                "must be positive and finite",
                self.epsilon,
            ));
        }
        Ok(())
    }
}

/// How a balancing run terminated.
///
/// Both variants are normal outcomes; callers decide whether an exhausted
/// budget should be treated as a failure.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConvergenceReport {
    /// The margin error dropped below the limit after `iterations` iterations.
    Converged { iterations: usize, error: f64 },
    /// `max_steps` iterations ran without reaching the limit.
    Exhausted { iterations: usize, error: f64 },
}

impl ConvergenceReport {
    /// Whether the tolerance was met.
    pub fn converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }

    /// Number of iterations performed.
    pub fn iterations(&self) -> usize {
        match *self {
            Self::Converged { iterations, .. } | Self::Exhausted { iterations, .. } => iterations,
        }
    }

    /// Relative margin error of the returned trip matrix.
    pub fn error(&self) -> f64 {
        match *self {
            Self::Converged { error, .. } | Self::Exhausted { error, .. } => error,
        }
    }
}
