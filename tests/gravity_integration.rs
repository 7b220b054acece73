//! End-to-end gravity queries over a registered body set.

mod common;

use approx::assert_relative_eq;
use bevy::math::DVec3;
use celestial_precision::body::MassBody;
use celestial_precision::gravity::SimulationMode;
use celestial_precision::types::km_to_units;

#[test]
fn test_three_body_centroid_force() {
    let core = common::quiet_core();
    core.gravity.set_mode(SimulationMode::NBody);

    // Equilateral triangle with 10,000 km sides
    let side = 10_000.0;
    let height = side * 3f64.sqrt() / 2.0;
    let bodies = [
        common::body_km("earth", 5.97e24, 6371.0, 0.0, 0.0),
        common::body_km("moon", 7.34e22, 1737.0, side, 0.0),
        common::body_km("third", 1.0e24, 3000.0, side / 2.0, height),
    ];
    for body in &bodies {
        assert!(core.registry.register(body));
    }

    let centroid = bodies.iter().map(|b| b.position()).sum::<DVec3>() / 3.0;
    let target_mass = core.gravity.config().default_target_mass;

    let force = core.gravity.total_force(None, centroid);

    let expected: DVec3 = bodies
        .iter()
        .map(|b| common::newton_force(b.position(), b.mass(), centroid, target_mass))
        .sum();

    assert_ne!(force, DVec3::ZERO);
    assert_relative_eq!(force.length(), expected.length(), max_relative = 0.01);
    assert!(force.normalize().dot(expected.normalize()) > 0.9999);
}

#[test]
fn test_modes_agree_on_isolated_body() {
    let core = common::quiet_core();
    let earth = common::body_km("earth", 5.97e24, 6371.0, 20_000.0, 0.0);
    core.registry.register(&earth);

    let mut results = Vec::new();
    for mode in [SimulationMode::SingleBody, SimulationMode::MultiBody, SimulationMode::NBody] {
        core.gravity.set_mode(mode);
        results.push(core.gravity.total_force(None, DVec3::ZERO));
    }
    for force in &results[1..] {
        assert_relative_eq!(force.x, results[0].x, max_relative = 1e-9);
    }

    core.gravity.set_mode(SimulationMode::Disabled);
    assert_eq!(core.gravity.total_force(None, DVec3::ZERO), DVec3::ZERO);
}

#[test]
fn test_singularity_guard_bounds_force() {
    let core = common::quiet_core();
    core.gravity.set_mode(SimulationMode::NBody);
    let floor = core.gravity.config().min_gravity_distance;

    let rock = common::body_km("rock", 1.0e15, 1.0, 0.0, 0.0);
    core.registry.register(&rock);

    let at_floor = core.gravity.total_force(None, DVec3::new(floor, 0.0, 0.0)).length();
    for fraction in [0.5, 0.1, 1.0e-3] {
        let inside = core.gravity.total_force(None, DVec3::new(floor * fraction, 0.0, 0.0)).length();
        assert!(inside <= at_floor * (1.0 + 1e-12));
    }
    // Exactly coincident has no direction
    assert_eq!(core.gravity.total_force(None, DVec3::ZERO), DVec3::ZERO);
}

#[test]
fn test_forces_follow_recenter() {
    let core = common::quiet_core();
    core.gravity.set_mode(SimulationMode::NBody);
    let earth = common::body_km("earth", 5.97e24, 6371.0, 0.0, 0.0);
    core.registry.register(&earth);

    let probe = DVec3::new(km_to_units(9000.0), 0.0, 0.0);
    let before = core.gravity.total_force(None, probe);

    core.origin.move_by(DVec3::new(km_to_units(40.0), 0.0, 0.0));
    let offset = core.origin.recenter();
    let after = core.gravity.total_force(None, probe + offset);

    assert_relative_eq!(after.x, before.x, max_relative = 1e-9);
}

#[test]
fn test_dropped_bodies_stop_gravitating() {
    let core = common::quiet_core();
    core.gravity.set_mode(SimulationMode::NBody);
    let earth = common::body_km("earth", 5.97e24, 6371.0, 10_000.0, 0.0);
    core.registry.register(&earth);
    assert_ne!(core.gravity.total_force(None, DVec3::ZERO), DVec3::ZERO);

    drop(earth);
    assert_eq!(core.gravity.total_force(None, DVec3::ZERO), DVec3::ZERO);
    assert!(core.gravity.dominant_body(DVec3::ZERO).is_none());
}
