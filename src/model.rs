//! Gravity model driver: demand rescaling, deterrence construction and balancing.

use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::balancing::balance;
use crate::data::ZoneData;
use crate::deterrence::LogNormalDeterrence;
use crate::error::{GravityError, Result};
use crate::options::GravityModelOptions;
use crate::solving::{BalancingOptions, ConvergenceReport};

/// Doubly-constrained gravity model with a fixed configuration.
#[derive(Clone, Debug, Default)]
pub struct GravityModel {
    options: GravityModelOptions,
}

impl GravityModel {
    /// Constructs a model after validating its configuration.
    pub fn new(options: GravityModelOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Accessor for the model configuration.
    pub fn options(&self) -> &GravityModelOptions {
        &self.options
    }

    /// Distributes the trips described by `data` over its zone pairs.
    pub fn run(&self, data: &ZoneData) -> Result<GravityModelResult> {
        let demand = rescale_demand(data.supply(), data.demand())?;
        let deterrence = build_deterrence_matrix(
            data.cost(),
            &self.options.deterrence,
            self.options.missing_value_substitute,
        )?;
        let balanced = balance(
            &deterrence,
            data.supply(),
            &demand,
            &self.options.balancing,
        )?;

        Ok(GravityModelResult {
            trips: balanced.trips,
            report: balanced.report,
            demand,
            deterrence,
            origin_factors: balanced.origin_factors,
            balance_coefficients: balanced.balance_coefficients,
        })
    }
}

/// Describes the result of a gravity model run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GravityModelResult {
    /// Trips from origin `i` (row) to destination `j` (column).
    pub trips: DMatrix<f64>,
    /// How the balancing loop terminated.
    pub report: ConvergenceReport,
    /// Destination totals after rescaling to the total supply.
    pub demand: DVector<f64>,
    /// Deterrence matrix that was balanced, including substituted cells.
    pub deterrence: DMatrix<f64>,
    /// Final origin scaling factors.
    pub origin_factors: DVector<f64>,
    /// Destination balance coefficients used for `trips`.
    pub balance_coefficients: DVector<f64>,
}

impl GravityModelResult {
    pub fn converged(&self) -> bool {
        self.report.converged()
    }

    pub fn iterations(&self) -> usize {
        self.report.iterations()
    }

    pub fn final_error(&self) -> f64 {
        self.report.error()
    }
}

/// Runs the model with default deterrence constants and the given substitute for
/// disconnected pairs.
pub fn run_gravity_model(
    cost: &DMatrix<f64>,
    supply: &DVector<f64>,
    demand: &DVector<f64>,
    missing_value_substitute: f64,
    balancing: &BalancingOptions,
) -> Result<GravityModelResult> {
    let data = ZoneData::new(cost.clone(), supply.clone(), demand.clone())?;
    let options = GravityModelOptions::default()
        .with_balancing(balancing.clone())
        .with_missing_value_substitute(missing_value_substitute);
    GravityModel::new(options)?.run(&data)
}

/// Scales `demand` proportionally so that its total equals the total of `supply`.
pub fn rescale_demand(supply: &DVector<f64>, demand: &DVector<f64>) -> Result<DVector<f64>> {
    if demand.len() != supply.len() {
        return Err(GravityError::dimension_mismatch(
            "demand length",
            supply.len(),
            demand.len(),
        ));
    }

    let total_supply = supply.sum();
    let total_demand = demand.sum();
    if total_supply == total_demand {
        return Ok(demand.clone());
    }
    if total_demand <= 0.0 {
        return Err(GravityError::ZeroTotal { context: "demand" });
    }

    let factor = total_supply / total_demand;
    debug!("rescaling demand by {factor} (supply {total_supply}, demand {total_demand})");
    Ok(demand * factor)
}

/// Builds the deterrence matrix for `cost`, assigning `missing_value_substitute`
/// to every zero-cost cell.
pub fn build_deterrence_matrix(
    cost: &DMatrix<f64>,
    deterrence: &LogNormalDeterrence,
    missing_value_substitute: f64,
) -> Result<DMatrix<f64>> {
    if !(missing_value_substitute.is_finite() && missing_value_substitute >= 0.0) {
        return Err(GravityError::invalid_parameter(
            "missing_value_substitute",
            "must be non-negative and finite",
            missing_value_substitute,
        ));
    }

    let mut matrix = deterrence.apply(cost)?;
    let mut substituted = 0usize;
    for (value, c) in matrix.iter_mut().zip(cost.iter()) {
        if *c == 0.0 {
            *value = missing_value_substitute;
            substituted += 1;
        }
    }
    debug!(
        "deterrence built for {} zones; {substituted} disconnected cells set to {missing_value_substitute}",
        cost.nrows()
    );
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn rescaled_demand_matches_total_supply() {
        let supply = DVector::from_vec(vec![80.0, 150.0, 100.0]);
        let demand = DVector::from_vec(vec![100.0, 90.0, 320.0]);
        let rescaled = rescale_demand(&supply, &demand).unwrap();
        assert_relative_eq!(rescaled.sum(), supply.sum(), max_relative = 1e-9);
        assert_relative_eq!(rescaled[0] / rescaled[2], 100.0 / 320.0, epsilon = 1e-12);
    }

    #[test]
    fn balanced_demand_is_returned_unchanged() {
        let supply = DVector::from_vec(vec![3.0, 7.0]);
        let demand = DVector::from_vec(vec![6.0, 4.0]);
        assert_eq!(rescale_demand(&supply, &demand).unwrap(), demand);
    }

    #[test]
    fn zero_demand_cannot_be_rescaled() {
        let supply = DVector::from_vec(vec![3.0, 7.0]);
        let demand = DVector::zeros(2);
        let err = rescale_demand(&supply, &demand).unwrap_err();
        assert!(matches!(err, GravityError::ZeroTotal { context: "demand" }));
    }

    #[test]
    fn zero_cost_cells_take_the_substitute() {
        let cost = DMatrix::from_row_slice(2, 2, &[0.0, 10.0, 20.0, 0.0]);
        let function = LogNormalDeterrence::default();
        let matrix = build_deterrence_matrix(&cost, &function, 1e-6).unwrap();
        assert_eq!(matrix[(0, 0)], 1e-6);
        assert_eq!(matrix[(1, 1)], 1e-6);
        assert_eq!(matrix[(0, 1)], function.evaluate(10.0));
        assert_eq!(matrix[(1, 0)], function.evaluate(20.0));
    }

    #[test]
    fn unit_cost_two_zone_model_splits_evenly() {
        let cost = DMatrix::from_element(2, 2, 1.0);
        let trip_ends = DVector::from_vec(vec![10.0, 10.0]);
        let result = run_gravity_model(
            &cost,
            &trip_ends,
            &trip_ends,
            0.0,
            &BalancingOptions::default(),
        )
        .unwrap();
        assert!(result.converged());
        assert_eq!(result.iterations(), 1);
        assert!(result.final_error() < 1e-3);
        for trip in result.trips.iter() {
            assert_relative_eq!(*trip, 5.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn invalid_configuration_is_rejected_up_front() {
        let options = GravityModelOptions::default()
            .with_balancing(BalancingOptions::default().with_max_steps(0));
        assert!(GravityModel::new(options).is_err());
    }
}
