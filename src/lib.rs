//! Doubly-constrained gravity model for trip distribution.
//!
//! Given a travel-cost matrix between zones and the number of trips each zone
//! produces and attracts, this crate estimates the full origin-destination
//! trip matrix. Costs are turned into deterrence values by a log-normal
//! function and the resulting matrix is balanced by iterative proportional
//! fitting (the Furness method) until its row and column sums match the trip
//! ends. It offers tools to
//!
//! - validate zone-level inputs (`data` module),
//! - evaluate the deterrence function (`deterrence` module),
//! - balance a deterrence matrix against trip ends (`balancing` module), and
//! - run the whole model, including demand rescaling and the policy for
//!   disconnected zone pairs (`model` module).
//!
//! A cost of exactly zero marks a pair of zones with no direct connection.
//! Such pairs receive a configurable substitute deterrence instead of the
//! function value; see [`GravityModelOptions`].
//!
//! # Quick start
//!
//! ```no_run
//! use gravflow::data::ZoneData;
//! use gravflow::{GravityModel, GravityModelOptions};
//! use nalgebra::{DMatrix, DVector};
//!
//! let cost = DMatrix::from_row_slice(3, 3, &[5.0, 12.0, 30.0, 12.0, 4.0, 18.0, 30.0, 18.0, 6.0]);
//! let supply = DVector::from_vec(vec![120.0, 80.0, 60.0]);
//! let demand = DVector::from_vec(vec![90.0, 100.0, 70.0]);
//! let data = ZoneData::new(cost, supply, demand).expect("validated zones");
//!
//! let model = GravityModel::new(GravityModelOptions::default()).expect("valid options");
//! let result = model.run(&data).expect("well-formed inputs");
//! if !result.converged() {
//!     eprintln!("stopped with error {}", result.final_error());
//! }
//! println!("{}", result.trips);
//! ```

pub mod balancing;
pub mod data;
pub mod deterrence;
pub mod error;
pub mod model;
pub mod options;
pub mod scenario;
pub mod solving;

pub use balancing::{balance, BalancedMatrix};
pub use deterrence::{compute_deterrence, LogNormalDeterrence};
pub use error::{GravityError, Result};
pub use model::{run_gravity_model, GravityModel, GravityModelResult};
pub use options::GravityModelOptions;
pub use solving::{BalancingOptions, ConvergenceReport};
