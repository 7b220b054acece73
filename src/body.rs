//! Mass-bearing bodies as seen by the celestial core.
//!
//! The core never owns a body. Hosts implement [`MassBody`] on whatever
//! object owns the transform and hand out `Arc<dyn MassBody>`; the registry
//! keeps weak references and treats a dropped or destroyed body as dead.

use std::sync::Arc;

use bevy::math::DVec3;
use parking_lot::Mutex;

/// Interface every gravitating or scaled entity exposes to the core.
pub trait MassBody: Send + Sync {
    /// Unique name used as the registry key.
    fn identifier(&self) -> &str;

    /// Current world position (world units).
    fn position(&self) -> DVec3;

    /// Move the body by `offset`. Called during universe translation.
    fn apply_position_offset(&self, offset: DVec3);

    /// Mass in kilograms.
    fn mass(&self) -> f64;

    /// Radius in kilometers.
    fn radius(&self) -> f64;

    /// False once the owner has torn the body down.
    fn is_valid(&self) -> bool {
        true
    }

    fn gravity_enabled(&self) -> bool {
        true
    }

    fn gravity_multiplier(&self) -> f64 {
        1.0
    }

    /// Visual scale currently applied.
    fn scale(&self) -> f64 {
        1.0
    }

    fn set_scale(&self, _scale: f64) {}

    /// Scale the body is easing toward.
    fn target_scale(&self) -> f64 {
        self.scale()
    }

    fn set_target_scale(&self, _scale: f64) {}

    /// Mass that actually gravitates: zero when gravity is off or mass is not positive.
    fn effective_mass(&self) -> f64 {
        let mass = self.mass() * self.gravity_multiplier();
        if self.gravity_enabled() && mass > 0.0 && mass.is_finite() {
            mass
        } else {
            0.0
        }
    }
}

/// Shared handle to a body.
pub type BodyRef = Arc<dyn MassBody>;

#[derive(Debug, Clone)]
struct BodyState {
    position: DVec3,
    scale: f64,
    target_scale: f64,
    gravity_enabled: bool,
    gravity_multiplier: f64,
    alive: bool,
}

/// Ready-made [`MassBody`] for hosts without their own actor type.
#[derive(Debug)]
pub struct CelestialBody {
    name: String,
    mass: f64,
    radius_km: f64,
    state: Mutex<BodyState>,
}

impl CelestialBody {
    /// Create a body. Negative mass or radius is clamped to zero.
    pub fn new(name: impl Into<String>, mass: f64, radius_km: f64, position: DVec3) -> Self {
        Self {
            name: name.into(),
            mass: mass.max(0.0),
            radius_km: radius_km.max(0.0),
            state: Mutex::new(BodyState {
                position,
                scale: 1.0,
                target_scale: 1.0,
                gravity_enabled: true,
                gravity_multiplier: 1.0,
                alive: true,
            }),
        }
    }

    /// Convenience constructor returning a shared handle.
    pub fn shared(name: impl Into<String>, mass: f64, radius_km: f64, position: DVec3) -> Arc<Self> {
        Arc::new(Self::new(name, mass, radius_km, position))
    }

    pub fn set_position(&self, position: DVec3) {
        self.state.lock().position = position;
    }

    pub fn set_gravity_enabled(&self, enabled: bool) {
        self.state.lock().gravity_enabled = enabled;
    }

    pub fn set_gravity_multiplier(&self, multiplier: f64) {
        self.state.lock().gravity_multiplier = multiplier.max(0.0);
    }

    /// Mark the body as torn down. It stays registered until unregistered.
    pub fn destroy(&self) {
        self.state.lock().alive = false;
    }
}

impl MassBody for CelestialBody {
    fn identifier(&self) -> &str {
        &self.name
    }

    fn position(&self) -> DVec3 {
        self.state.lock().position
    }

    fn apply_position_offset(&self, offset: DVec3) {
        self.state.lock().position += offset;
    }

    fn mass(&self) -> f64 {
        self.mass
    }

    fn radius(&self) -> f64 {
        self.radius_km
    }

    fn is_valid(&self) -> bool {
        self.state.lock().alive
    }

    fn gravity_enabled(&self) -> bool {
        self.state.lock().gravity_enabled
    }

    fn gravity_multiplier(&self) -> f64 {
        self.state.lock().gravity_multiplier
    }

    fn scale(&self) -> f64 {
        self.state.lock().scale
    }

    fn set_scale(&self, scale: f64) {
        self.state.lock().scale = scale;
    }

    fn target_scale(&self) -> f64 {
        self.state.lock().target_scale
    }

    fn set_target_scale(&self, scale: f64) {
        self.state.lock().target_scale = scale;
    }
}
