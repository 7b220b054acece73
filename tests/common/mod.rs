//! Common test utilities for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use bevy::math::DVec3;
use celestial_precision::body::CelestialBody;
use celestial_precision::config::{CelestialConfig, SafetyConfig};
use celestial_precision::plugin::CelestialCore;
use celestial_precision::types::{km_to_units, G};

/// Full subsystem set with console mirroring of safety events turned off.
pub fn quiet_core() -> CelestialCore {
    let config = CelestialConfig {
        safety: SafetyConfig {
            log_to_console: false,
            ..Default::default()
        },
        ..Default::default()
    };
    CelestialCore::new(config).expect("valid config")
}

/// Body at a position given in kilometers.
pub fn body_km(name: &str, mass: f64, radius_km: f64, x_km: f64, y_km: f64) -> Arc<CelestialBody> {
    CelestialBody::shared(name, mass, radius_km, DVec3::new(km_to_units(x_km), km_to_units(y_km), 0.0))
}

/// Independent Newtonian force in kg·cm/s² for positions in world units.
pub fn newton_force(source: DVec3, source_mass: f64, target: DVec3, target_mass: f64) -> DVec3 {
    let delta_m = (source - target) * 0.01;
    let r = delta_m.length();
    delta_m / r * (G * source_mass * target_mass / (r * r)) * 100.0
}
