use thiserror::Error;

/// Unified error type for `gravflow` operations.
///
/// Failing to converge is deliberately absent: an exhausted iteration budget is
/// reported through [`ConvergenceReport`](crate::solving::ConvergenceReport).
#[derive(Debug, Error)]
pub enum GravityError {
    /// Raised when provided vectors or matrices have incompatible dimensions.
    #[error("dimension mismatch in {context}: expected {expected} but found {found}")]
    DimensionMismatch {
        /// Human-readable context describing the operation.
        context: &'static str,
        /// The required dimension, usually the zone count.
        expected: usize,
        /// The dimension that was actually supplied.
        found: usize,
    },

    /// Raised when a cost, supply, demand or deterrence entry is negative.
    #[error("{context} at index {index} must be non-negative, found {value}")]
    NegativeValue {
        context: &'static str,
        /// Flattened position (row-major for matrices).
        index: usize,
        value: f64,
    },

    /// Raised when an input entry is NaN or infinite.
    #[error("{context} at index {index} must be finite, found {value}")]
    NonFiniteValue {
        context: &'static str,
        index: usize,
        value: f64,
    },

    /// Raised when a model or solver parameter is outside its domain.
    #[error("parameter `{name}` {requirement}, found {value}")]
    InvalidParameter {
        name: &'static str,
        requirement: &'static str,
        value: f64,
    },

    /// Raised when a total used as a divisor is zero.
    #[error("total {context} must be positive")]
    ZeroTotal { context: &'static str },

    /// Raised when two zones share the same label.
    #[error("zone label `{label}` appears more than once")]
    DuplicateZoneLabel { label: String },
}

impl GravityError {
    /// Helper to format a [`DimensionMismatch`](GravityError::DimensionMismatch) error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            found,
        }
    }

    /// Helper to reject a parameter value.
    pub fn invalid_parameter(name: &'static str, requirement: &'static str, value: f64) -> Self {
        Self::InvalidParameter {
            name,
            requirement,
            value,
        }
    }

    /// Returns `true` for every precondition failure other than a dimension mismatch.
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, Self::DimensionMismatch { .. })
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, GravityError>;

/// Checks that every entry is finite and non-negative.
///
/// `values` must be in nalgebra storage order (column-major); the reported
/// index is row-major so that it matches how matrices are written by hand.
pub(crate) fn ensure_non_negative<'a, I>(
    context: &'static str,
    values: I,
    shape: (usize, usize),
) -> Result<()>
where
    I: IntoIterator<Item = &'a f64>,
{
    let (nrows, ncols) = shape;
    for (position, value) in values.into_iter().enumerate() {
        let index = if nrows > 1 && ncols > 1 {
            let (col, row) = (position / nrows, position % nrows);
            row * ncols + col
        } else {
            position
        };
        if !value.is_finite() {
            return Err(GravityError::NonFiniteValue {
                context,
                index,
                value: *value,
            });
        }
        if *value < 0.0 {
            return Err(GravityError::NegativeValue {
                context,
                index,
                value: *value,
            });
        }
    }
    Ok(())
}
