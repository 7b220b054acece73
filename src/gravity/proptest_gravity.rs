//! Property-based tests for the force law and aggregation modes.

use bevy::math::DVec3;
use proptest::prelude::*;

use super::{GravityEngine, SimulationMode};
use crate::body::CelestialBody;
use crate::config::GravityConfig;
use crate::test_utils::fixtures;
use crate::types::{km_to_units, G};

fn engine(mode: SimulationMode) -> (std::sync::Arc<crate::registry::BodyRegistry>, GravityEngine) {
    let (registry, _, engine) = fixtures::gravity_stack(GravityConfig {
        mode,
        ..Default::default()
    });
    (registry, engine)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Above the distance floor the magnitude follows `G·M·m / r²` in SI, times the physics scale.
    #[test]
    fn prop_inverse_square_law(
        mass in 1.0e18f64..1.0e26,
        target_mass in 1.0f64..1.0e5,
        distance_km in 2.0f64..1.0e6,
        dir in (-1.0f64..1.0, -1.0f64..1.0, -1.0f64..1.0),
    ) {
        let direction = DVec3::new(dir.0, dir.1, dir.2);
        prop_assume!(direction.length() > 1e-3);
        let (_, engine) = engine(SimulationMode::NBody);
        let config = engine.config();

        let position = direction.normalize() * km_to_units(distance_km);
        let body = CelestialBody::new("source", mass, 1.0, position);
        let force = engine.force_from_body(&body, DVec3::ZERO, target_mass);

        let r_m = distance_km * 1000.0;
        let expected = G * mass * target_mass / (r_m * r_m) * config.physics_scale;
        let error = ((force.length() - expected) / expected).abs();
        prop_assert!(error < 0.01, "got {} expected {}", force.length(), expected);
        // Attractive: points from target toward source
        prop_assert!(force.dot(position) > 0.0);
    }

    /// Inside the floor the magnitude stays at its floor value.
    #[test]
    fn prop_distance_floor(fraction in 1.0e-6f64..1.0) {
        let (_, engine) = engine(SimulationMode::NBody);
        let floor = engine.config().min_gravity_distance;

        let at_floor = CelestialBody::new("a", 1.0e20, 1.0, DVec3::new(floor, 0.0, 0.0));
        let inside = CelestialBody::new("b", 1.0e20, 1.0, DVec3::new(floor * fraction, 0.0, 0.0));

        let f_floor = engine.acceleration_from_body(&at_floor, DVec3::ZERO).length();
        let f_inside = engine.acceleration_from_body(&inside, DVec3::ZERO).length();
        prop_assert!(f_inside.is_finite());
        prop_assert!(((f_inside - f_floor) / f_floor).abs() < 1e-9);
    }

    /// With few enough bodies, multi-body and N-body agree.
    #[test]
    fn prop_multi_body_matches_n_body_for_three(
        offsets in prop::collection::vec((-1.0e9f64..1.0e9, -1.0e9f64..1.0e9, -1.0e9f64..1.0e9), 1..=3),
        masses in prop::collection::vec(1.0e20f64..1.0e24, 3),
    ) {
        let (registry, multi) = engine(SimulationMode::MultiBody);
        let bodies: Vec<_> = offsets
            .iter()
            .zip(&masses)
            .enumerate()
            .map(|(i, (o, m))| CelestialBody::shared(format!("b{i}"), *m, 1.0, DVec3::new(o.0, o.1, o.2)))
            .collect();
        for b in &bodies {
            registry.register(b);
        }

        let a = multi.gravity_acceleration_at(DVec3::ZERO);
        multi.set_mode(SimulationMode::NBody);
        let b = multi.gravity_acceleration_at(DVec3::ZERO);

        // Summation order differs, so bound the error by the summed term magnitudes.
        let magnitude: f64 = bodies
            .iter()
            .map(|body| multi.acceleration_from_body(body.as_ref(), DVec3::ZERO).length())
            .sum();
        let error = (a - b).length();
        prop_assert!(error <= 1e-12 * magnitude, "{:?} vs {:?}", a, b);
    }
}
