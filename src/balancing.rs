//! Furness balancing: fits a deterrence matrix to origin and destination totals.

use log::{info, trace, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, GravityError, Result};
use crate::solving::{BalancingOptions, ConvergenceReport};

/// Trip matrix produced by [`balance`] together with its diagnostics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BalancedMatrix {
    /// Trips from origin `i` (row) to destination `j` (column).
    pub trips: DMatrix<f64>,
    /// How the run terminated.
    pub report: ConvergenceReport,
    /// Origin scaling factors used to compute `trips`.
    pub origin_factors: DVector<f64>,
    /// Destination balance coefficients used to compute `trips`.
    pub balance_coefficients: DVector<f64>,
}

/// Balances `deterrence` so that row sums approach `supply` and column sums approach `demand`.
///
/// Each iteration derives origin factors from the current destination
/// coefficients, recomputes the whole trip matrix, then derives the next
/// destination coefficients. The margin error is measured on the trip matrix
/// built with the coefficients from the start of the iteration, so a
/// coefficient update only shows in the error one iteration later.
///
/// Running out of iterations is not an error; see [`ConvergenceReport`].
pub fn balance(
    deterrence: &DMatrix<f64>,
    supply: &DVector<f64>,
    demand: &DVector<f64>,
    options: &BalancingOptions,
) -> Result<BalancedMatrix> {
    let n = check_dimensions(deterrence, supply, demand)?;
    options.validate()?;
    ensure_non_negative("deterrence", deterrence.iter(), deterrence.shape())?;
    ensure_non_negative("supply", supply.iter(), supply.shape())?;
    ensure_non_negative("demand", demand.iter(), demand.shape())?;

    let total_supply = supply.sum();
    if total_supply <= 0.0 {
        return Err(GravityError::ZeroTotal { context: "supply" });
    }

    let epsilon = options.epsilon;
    let mut balance = DVector::from_element(n, 1.0);
    let mut trips = DMatrix::zeros(n, n);
    let mut origin_factors = DVector::zeros(n);
    let mut applied_balance = balance.clone();
    let mut error = f64::INFINITY;

    for step in 1..=options.max_steps {
        let weighted_demand = balance.component_mul(demand);
        let scaling = (deterrence * &weighted_demand).map(|reach| 1.0 / (reach + epsilon));

        for j in 0..n {
            for i in 0..n {
                trips[(i, j)] =
                    scaling[i] * supply[i] * balance[j] * demand[j] * deterrence[(i, j)];
            }
        }

        let origin_mass = scaling.component_mul(supply);
        let updated = deterrence
            .tr_mul(&origin_mass)
            .map(|reach| 1.0 / (reach + epsilon));

        error = relative_imbalance(&trips, supply, demand, total_supply);
        trace!("balancing iteration {step}: error {error:e}");

        origin_factors = scaling;
        if error < options.error_limit {
            info!("balancing converged after {step} iterations (error {error:e})");
            return Ok(BalancedMatrix {
                trips,
                report: ConvergenceReport::Converged {
                    iterations: step,
                    error,
                },
                origin_factors,
                balance_coefficients: balance,
            });
        }

        applied_balance = std::mem::replace(&mut balance, updated);
    }

    warn!(
        "balancing did not converge within {} iterations (error {error:e})",
        options.max_steps
    );
    Ok(BalancedMatrix {
        trips,
        report: ConvergenceReport::Exhausted {
            iterations: options.max_steps,
            error,
        },
        origin_factors,
        balance_coefficients: applied_balance,
    })
}

fn check_dimensions(
    deterrence: &DMatrix<f64>,
    supply: &DVector<f64>,
    demand: &DVector<f64>,
) -> Result<usize> {
    let n = deterrence.nrows();
    if deterrence.ncols() != n {
        return Err(GravityError::dimension_mismatch(
            "deterrence columns",
            n,
            deterrence.ncols(),
        ));
    }
    if supply.len() != n {
        return Err(GravityError::dimension_mismatch(
            "supply length",
            n,
            supply.len(),
        ));
    }
    if demand.len() != n {
        return Err(GravityError::dimension_mismatch(
            "demand length",
            n,
            demand.len(),
        ));
    }
    Ok(n)
}

/// Row sums of `trips`, i.e. trips leaving each origin.
pub fn row_sums(trips: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(trips.nrows(), trips.row_iter().map(|row| row.sum()))
}

/// Column sums of `trips`, i.e. trips arriving at each destination.
pub fn column_sums(trips: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(trips.ncols(), trips.column_iter().map(|col| col.sum()))
}

/// Relative L1 imbalance of both margins of `trips`, normalised by total supply.
pub fn margin_error(
    trips: &DMatrix<f64>,
    supply: &DVector<f64>,
    demand: &DVector<f64>,
) -> Result<f64> {
    check_dimensions(trips, supply, demand)?;
    let total_supply = supply.sum();
    if total_supply <= 0.0 {
        return Err(GravityError::ZeroTotal { context: "supply" });
    }
    Ok(relative_imbalance(trips, supply, demand, total_supply))
}

fn relative_imbalance(
    trips: &DMatrix<f64>,
    supply: &DVector<f64>,
    demand: &DVector<f64>,
    total_supply: f64,
) -> f64 {
    let origin_gap: f64 = (supply - row_sums(trips)).abs().sum();
    let destination_gap: f64 = (demand - column_sums(trips)).abs().sum();
    (origin_gap + destination_gap) / total_supply
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn uniform_problem() -> (DMatrix<f64>, DVector<f64>, DVector<f64>) {
        (
            DMatrix::from_element(2, 2, 0.04),
            DVector::from_vec(vec![10.0, 10.0]),
            DVector::from_vec(vec![10.0, 10.0]),
        )
    }

    #[test]
    fn symmetric_problem_converges_in_one_iteration() {
        let (deterrence, supply, demand) = uniform_problem();
        let result = balance(&deterrence, &supply, &demand, &BalancingOptions::default()).unwrap();
        assert!(result.report.converged());
        assert_eq!(result.report.iterations(), 1);
        for trip in result.trips.iter() {
            assert_relative_eq!(*trip, 5.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn first_iteration_uses_unit_balance_coefficients() {
        let deterrence = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 1.0]);
        let supply = DVector::from_vec(vec![10.0, 30.0]);
        let demand = DVector::from_vec(vec![25.0, 15.0]);
        let options = BalancingOptions::new(1, 1e-12);

        let result = balance(&deterrence, &supply, &demand, &options).unwrap();
        assert!(!result.report.converged());
        assert_eq!(result.balance_coefficients, DVector::from_element(2, 1.0));

        // With unit coefficients every row is an exact split of its supply.
        let rows = row_sums(&result.trips);
        assert_relative_eq!(rows, supply, epsilon = 1e-6);
        let reach = 1.0 * 25.0 + 2.0 * 15.0;
        assert_relative_eq!(result.trips[(0, 1)], 10.0 * 2.0 * 15.0 / reach, epsilon = 1e-9);
    }

    #[test]
    fn exhausted_run_reports_the_last_error() {
        let deterrence = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        let supply = DVector::from_vec(vec![10.0, 30.0]);
        let demand = DVector::from_vec(vec![30.0, 10.0]);
        let options = BalancingOptions::new(25, 1e-3);

        let result = balance(&deterrence, &supply, &demand, &options).unwrap();
        assert!(!result.report.converged());
        assert_eq!(result.report.iterations(), 25);
        let recomputed = margin_error(&result.trips, &supply, &demand).unwrap();
        assert_relative_eq!(result.report.error(), recomputed, epsilon = 1e-12);
        assert!(result.report.error() > 0.5);
    }

    #[test]
    fn zero_deterrence_zone_receives_no_flow() {
        let deterrence = DMatrix::from_row_slice(
            3,
            3,
            &[0.04, 0.03, 0.0, 0.02, 0.04, 0.0, 0.0, 0.0, 0.0],
        );
        let supply = DVector::from_vec(vec![10.0, 10.0, 10.0]);
        let demand = DVector::from_vec(vec![10.0, 10.0, 10.0]);
        let options = BalancingOptions::new(50, 1e-3);

        let result = balance(&deterrence, &supply, &demand, &options).unwrap();
        assert!(!result.report.converged());
        for k in 0..3 {
            assert_eq!(result.trips[(2, k)], 0.0);
            assert_eq!(result.trips[(k, 2)], 0.0);
        }
        assert!(result.origin_factors[2] > 1e8);
        assert!(result.trips.iter().all(|t| t.is_finite() && *t >= 0.0));
    }

    #[test]
    fn idle_zone_with_no_totals_still_converges() {
        let deterrence = DMatrix::from_row_slice(
            3,
            3,
            &[0.04, 0.03, 0.0, 0.02, 0.04, 0.0, 0.0, 0.0, 0.0],
        );
        let supply = DVector::from_vec(vec![10.0, 10.0, 0.0]);
        let demand = DVector::from_vec(vec![10.0, 10.0, 0.0]);

        let result = balance(&deterrence, &supply, &demand, &BalancingOptions::default()).unwrap();
        assert!(result.report.converged());
        assert!(result.report.error() < 1e-3);
    }

    #[test]
    fn successive_runs_do_not_share_state() {
        let deterrence = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 1.0]);
        let supply = DVector::from_vec(vec![10.0, 30.0]);
        let demand = DVector::from_vec(vec![25.0, 15.0]);
        let options = BalancingOptions::default();

        let first = balance(&deterrence, &supply, &demand, &options).unwrap();
        let second = balance(&deterrence, &supply, &demand, &options).unwrap();
        assert_eq!(first.trips, second.trips);
        assert_eq!(first.report, second.report);
    }

    #[test]
    fn mismatched_supply_length_is_rejected() {
        let deterrence = DMatrix::from_element(5, 5, 0.01);
        let supply = DVector::from_element(4, 1.0);
        let demand = DVector::from_element(5, 1.0);
        let err = balance(&deterrence, &supply, &demand, &BalancingOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            GravityError::DimensionMismatch {
                expected: 5,
                found: 4,
                ..
            }
        ));
    }

    #[test]
    fn non_square_deterrence_is_rejected() {
        let deterrence = DMatrix::from_element(2, 3, 0.01);
        let supply = DVector::from_element(2, 1.0);
        let err = balance(&deterrence, &supply, &supply, &BalancingOptions::default()).unwrap_err();
        assert!(matches!(err, GravityError::DimensionMismatch { .. }));
    }

    #[test]
    fn negative_demand_is_rejected() {
        let (deterrence, supply, _) = uniform_problem();
        let demand = DVector::from_vec(vec![10.0, -1.0]);
        let err = balance(&deterrence, &supply, &demand, &BalancingOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            GravityError::NegativeValue {
                context: "demand",
                index: 1,
                ..
            }
        ));
    }

    #[test]
    fn zero_total_supply_is_rejected() {
        let (deterrence, _, demand) = uniform_problem();
        let supply = DVector::zeros(2);
        let err = balance(&deterrence, &supply, &demand, &BalancingOptions::default()).unwrap_err();
        assert!(matches!(err, GravityError::ZeroTotal { .. }));
    }

    #[test]
    fn margins_are_summed_along_the_right_axis() {
        let trips = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(row_sums(&trips), DVector::from_vec(vec![3.0, 7.0]));
        assert_eq!(column_sums(&trips), DVector::from_vec(vec![4.0, 6.0]));
    }
}
