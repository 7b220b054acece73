//! Test utilities for the celestial core.
//!
//! Provides body fixtures, pre-wired subsystem sets, and assertions for the
//! invariants the floating origin must preserve.

use std::sync::Arc;

use bevy::math::DVec3;

use crate::body::CelestialBody;

/// Fixtures for creating test bodies and subsystems.
pub mod fixtures {
    use super::*;
    use crate::config::{GravityConfig, OriginConfig, SafetyConfig};
    use crate::gravity::GravityEngine;
    use crate::origin::OriginTracker;
    use crate::registry::BodyRegistry;
    use crate::safety::SafetyGuard;

    pub const EARTH_MASS: f64 = 5.97e24;
    pub const EARTH_RADIUS_KM: f64 = 6371.0;
    pub const MOON_MASS: f64 = 7.34e22;
    pub const MOON_RADIUS_KM: f64 = 1737.0;

    pub fn earth_at(position: DVec3) -> Arc<CelestialBody> {
        CelestialBody::shared("earth", EARTH_MASS, EARTH_RADIUS_KM, position)
    }

    pub fn moon_at(position: DVec3) -> Arc<CelestialBody> {
        CelestialBody::shared("moon", MOON_MASS, MOON_RADIUS_KM, position)
    }

    /// A safety guard that keeps its events out of the console.
    pub fn quiet_safety() -> Arc<SafetyGuard> {
        Arc::new(
            SafetyGuard::new(SafetyConfig {
                log_to_console: false,
                ..Default::default()
            })
            .expect("default safety config is valid"),
        )
    }

    /// Registry, guard, and gravity engine sharing one body set.
    pub fn gravity_stack(config: GravityConfig) -> (Arc<BodyRegistry>, Arc<SafetyGuard>, GravityEngine) {
        let registry = Arc::new(BodyRegistry::new());
        let safety = quiet_safety();
        let engine = GravityEngine::new(config, registry.clone(), safety.clone())
            .expect("gravity config is valid");
        (registry, safety, engine)
    }

    /// Origin tracker wired to a fresh registry and installed as the guard's recovery handler.
    pub fn origin_stack(config: OriginConfig) -> (Arc<BodyRegistry>, Arc<SafetyGuard>, Arc<OriginTracker>) {
        let registry = Arc::new(BodyRegistry::new());
        let safety = quiet_safety();
        let tracker = Arc::new(
            OriginTracker::new(config, registry.clone())
                .expect("origin config is valid")
                .with_safety(safety.clone()),
        );
        safety.set_recovery_handler(&tracker);
        (registry, safety, tracker)
    }
}

/// Assertions for verifying floating-origin invariants.
pub mod assertions {
    use super::*;
    use crate::registry::BodyRegistry;

    /// Pairwise displacement between every two live bodies.
    pub fn pairwise_offsets(registry: &BodyRegistry) -> Vec<DVec3> {
        let bodies = registry.all_bodies();
        let mut offsets = Vec::new();
        for (i, a) in bodies.iter().enumerate() {
            for b in &bodies[i + 1..] {
                offsets.push(b.position() - a.position());
            }
        }
        offsets
    }

    /// Assert two sets of displacements agree to within `tolerance` world units.
    ///
    /// # Panics
    /// Panics if the sets differ in length or any pair drifts beyond tolerance.
    pub fn assert_offsets_preserved(before: &[DVec3], after: &[DVec3], tolerance: f64) {
        assert_eq!(before.len(), after.len(), "body count changed");
        for (i, (a, b)) in before.iter().zip(after).enumerate() {
            let drift = (*a - *b).length();
            assert!(
                drift <= tolerance,
                "pair {i} drifted by {drift:.6e} units (tolerance {tolerance:.6e})"
            );
        }
    }
}

/// Utilities for creating headless Bevy apps for testing.
pub mod bevy_test {
    use bevy::prelude::*;

    /// Create a minimal Bevy app for testing without rendering.
    pub fn headless_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::MassBody;
    use crate::registry::BodyRegistry;

    #[test]
    fn test_fixtures_are_distinct() {
        let earth = fixtures::earth_at(DVec3::ZERO);
        let moon = fixtures::moon_at(DVec3::X);
        assert_eq!(earth.identifier(), "earth");
        assert_eq!(moon.identifier(), "moon");
        assert!(earth.mass() > moon.mass());
    }

    #[test]
    fn test_pairwise_offsets() {
        let registry = BodyRegistry::new();
        let a = fixtures::earth_at(DVec3::ZERO);
        let b = fixtures::moon_at(DVec3::new(3.0, 4.0, 0.0));
        registry.register(&a);
        registry.register(&b);

        let offsets = assertions::pairwise_offsets(&registry);
        assert_eq!(offsets, vec![DVec3::new(3.0, 4.0, 0.0)]);
        assertions::assert_offsets_preserved(&offsets, &offsets, 0.0);
    }
}
