//! Zone-level input data and validation used by the gravity model.

use std::collections::HashSet;

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::error::{ensure_non_negative, GravityError, Result};

/// Validated inputs for one gravity model run: costs plus trip ends per zone.
///
/// A cost of exactly zero marks a zone pair with no direct connection.
#[derive(Clone, Debug, Serialize)]
pub struct ZoneData {
    labels: Vec<String>,
    cost: DMatrix<f64>,
    supply: DVector<f64>,
    demand: DVector<f64>,
}

impl ZoneData {
    /// Creates a `ZoneData` instance from unlabelled components.
    pub fn new(cost: DMatrix<f64>, supply: DVector<f64>, demand: DVector<f64>) -> Result<Self> {
        ZoneDataBuilder::new(cost).supply(supply).demand(demand).build()
    }

    /// Number of zones.
    pub fn zone_count(&self) -> usize {
        self.supply.len()
    }

    /// Travel cost matrix; rows are origins, columns destinations.
    pub fn cost(&self) -> &DMatrix<f64> {
        &self.cost
    }

    /// Trips produced by each zone.
    pub fn supply(&self) -> &DVector<f64> {
        &self.supply
    }

    /// Trips attracted by each zone, as supplied (not rescaled).
    pub fn demand(&self) -> &DVector<f64> {
        &self.demand
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, zone: usize) -> &str {
        &self.labels[zone]
    }

    pub fn total_supply(&self) -> f64 {
        self.supply.sum()
    }

    pub fn total_demand(&self) -> f64 {
        self.demand.sum()
    }

    /// Whether a direct connection exists from `origin` to `destination`.
    pub fn is_connected(&self, origin: usize, destination: usize) -> bool {
        self.cost[(origin, destination)] != 0.0
    }

    /// All `(origin, destination)` pairs without a direct connection, row by row.
    pub fn disconnected_pairs(&self) -> Vec<(usize, usize)> {
        let n = self.zone_count();
        (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .filter(|&(i, j)| !self.is_connected(i, j))
            .collect()
    }
}

/// Builder that validates dimensions and values before constructing [`ZoneData`].
#[derive(Debug)]
pub struct ZoneDataBuilder {
    cost: DMatrix<f64>,
    supply: Option<DVector<f64>>,
    demand: Option<DVector<f64>>,
    labels: Option<Vec<String>>,
}

impl ZoneDataBuilder {
    /// Start building zone data from a square cost matrix.
    pub fn new(cost: DMatrix<f64>) -> Self {
        Self {
            cost,
            supply: None,
            demand: None,
            labels: None,
        }
    }

    /// Sets the trips produced per zone.
    pub fn supply(mut self, supply: DVector<f64>) -> Self {
        self.supply = Some(supply);
        self
    }

    /// Sets the trips attracted per zone.
    pub fn demand(mut self, demand: DVector<f64>) -> Self {
        self.demand = Some(demand);
        self
    }

    /// Sets zone labels; defaults to `A`, `B`, `C`, ... when omitted.
    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Finalizes construction after validating shapes and entries.
    pub fn build(self) -> Result<ZoneData> {
        let n = self.cost.nrows();
        if self.cost.ncols() != n {
            return Err(GravityError::dimension_mismatch(
                "cost columns",
                n,
                self.cost.ncols(),
            ));
        }

        let supply = self
            .supply
            .ok_or_else(|| GravityError::dimension_mismatch("supply length", n, 0))?;
        if supply.len() != n {
            return Err(GravityError::dimension_mismatch(
                "supply length",
                n,
                supply.len(),
            ));
        }

        let demand = self
            .demand
            .ok_or_else(|| GravityError::dimension_mismatch("demand length", n, 0))?;
        if demand.len() != n {
            return Err(GravityError::dimension_mismatch(
                "demand length",
                n,
                demand.len(),
            ));
        }

        let labels = self.labels.unwrap_or_else(|| default_labels(n));
        if labels.len() != n {
            return Err(GravityError::dimension_mismatch(
                "zone labels",
                n,
                labels.len(),
            ));
        }
        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(GravityError::DuplicateZoneLabel {
                    label: label.clone(),
                });
            }
        }

        ensure_non_negative("cost", self.cost.iter(), self.cost.shape())?;
        ensure_non_negative("supply", supply.iter(), supply.shape())?;
        ensure_non_negative("demand", demand.iter(), demand.shape())?;

        Ok(ZoneData {
            labels,
            cost: self.cost,
            supply,
            demand,
        })
    }
}

/// Spreadsheet-style labels: `A`..`Z`, then `AA`, `AB`, ...
fn default_labels(n: usize) -> Vec<String> {
    (0..n)
        .map(|mut index| {
            let mut label = Vec::new();
            loop {
                label.push(b'A' + (index % 26) as u8);
                if index < 26 {
                    break;
                }
                index = index / 26 - 1;
            }
            label.reverse();
            String::from_utf8_lossy(&label).into_owned()
        })
        .collect()
}
