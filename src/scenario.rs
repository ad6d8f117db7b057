//! Ready-made zone systems: the five-zone reference network and seeded synthetic instances.

use nalgebra::{DMatrix, DVector};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};

use crate::data::{ZoneData, ZoneDataBuilder};

/// Five zones `A`..`E` with a sparse network.
///
/// Zone `E` attracts more trips than `D`, its only connected origin, can
/// produce, so the instance has no solution that keeps disconnected pairs
/// empty. Demand is given before rescaling (total 890 against 670 supplied).
pub fn five_zone_reference() -> ZoneData {
    #[rustfmt::skip]
    let cost = DMatrix::from_row_slice(5, 5, &[
        0.0,  0.0, 50.0,  0.0,  0.0,
        0.0,  0.0, 60.0,  0.0,  0.0,
        0.0,  0.0,  0.0, 30.0,  0.0,
        20.0, 0.0, 80.0,  0.0, 20.0,
        0.0, 70.0, 90.0, 10.0,  0.0,
    ]);
    let supply = DVector::from_vec(vec![80.0, 150.0, 100.0, 160.0, 180.0]);
    let demand = DVector::from_vec(vec![100.0, 90.0, 320.0, 80.0, 300.0]);

    ZoneDataBuilder::new(cost)
        .supply(supply)
        .demand(demand)
        .labels(["A", "B", "C", "D", "E"])
        .build()
        .expect("validated reference network")
}

/// Generates a fully connected instance with `zones` zones from `seed`.
///
/// Costs are `1 + LogNormal(ln 20, 0.75)`, so every pair is connected. Trip
/// ends are uniform in `[10, 200)` and the totals are generally unequal.
pub fn random_connected(zones: usize, seed: u64) -> ZoneData {
    assert!(zones > 0, "at least one zone is required");
    let mut rng = SmallRng::seed_from_u64(seed);
    let costs = LogNormal::new(20.0_f64.ln(), 0.75).expect("valid log-normal parameters");

    let cost = DMatrix::from_fn(zones, zones, |_, _| 1.0 + costs.sample(&mut rng));
    let supply = DVector::from_fn(zones, |_, _| rng.gen_range(10.0..200.0));
    let demand = DVector::from_fn(zones, |_, _| rng.gen_range(10.0..200.0));

    ZoneData::new(cost, supply, demand).expect("validated synthetic zones")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_network_has_expected_shape() {
        let data = five_zone_reference();
        assert_eq!(data.zone_count(), 5);
        assert_eq!(data.label(4), "E");
        assert_eq!(data.total_supply(), 670.0);
        assert_eq!(data.total_demand(), 890.0);
        assert_eq!(data.disconnected_pairs().len(), 16);
    }

    #[test]
    fn random_instances_are_connected_and_reproducible() {
        let first = random_connected(6, 11);
        let second = random_connected(6, 11);
        assert_eq!(first.cost(), second.cost());
        assert_eq!(first.supply(), second.supply());
        assert!(first.disconnected_pairs().is_empty());
        assert!(first.cost().iter().all(|c| *c >= 1.0));
    }
}
