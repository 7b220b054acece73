//! Bevy integration: shared subsystem handles and the systems that drive them.

use std::sync::Arc;

use bevy::math::DVec3;
use bevy::prelude::*;

use crate::config::{CelestialConfig, ConfigError};
use crate::gravity::GravityEngine;
use crate::origin::OriginTracker;
use crate::registry::BodyRegistry;
use crate::safety::SafetyGuard;
use crate::scale::ScaleEngine;

/// Handles to every celestial subsystem, shared between Bevy systems and any
/// other thread that needs them.
#[derive(Resource, Clone)]
pub struct CelestialCore {
    pub registry: Arc<BodyRegistry>,
    pub safety: Arc<SafetyGuard>,
    pub scale: Arc<ScaleEngine>,
    pub gravity: Arc<GravityEngine>,
    pub origin: Arc<OriginTracker>,
}

impl CelestialCore {
    /// Build and wire all subsystems from one configuration.
    ///
    /// The origin tracker is installed as the safety guard's recovery handler.
    pub fn new(config: CelestialConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let registry = Arc::new(BodyRegistry::new());
        let safety = Arc::new(SafetyGuard::new(config.safety)?);
        let scale = Arc::new(
            ScaleEngine::new(config.scale)?
                .with_registry(registry.clone())
                .with_safety(safety.clone()),
        );
        let gravity = Arc::new(GravityEngine::new(
            config.gravity,
            registry.clone(),
            safety.clone(),
        )?);
        let origin = Arc::new(
            OriginTracker::new(config.origin, registry.clone())?.with_safety(safety.clone()),
        );
        safety.set_recovery_handler(&origin);

        Ok(Self {
            registry,
            safety,
            scale,
            gravity,
            origin,
        })
    }

    /// Tear everything down. Bodies are released, not destroyed.
    pub fn shutdown(&self) {
        self.origin.shutdown();
        self.gravity.shutdown();
        self.scale.shutdown();
        self.safety.shutdown();
        self.registry.clear();
    }
}

/// Viewer position for automatic body scale refresh.
///
/// Scales are only refreshed while this resource exists.
#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct ScaleViewer {
    pub position: DVec3,
    /// Ease toward the target scale instead of snapping to it.
    pub smooth: bool,
}

/// Ordering for the celestial systems within `Update`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum CelestialSet {
    /// Precision checks and recentering.
    Origin,
    /// Visual scale refresh; runs after recentering so distances are current.
    Scale,
}

/// Plugin that creates the celestial subsystems and drives them each frame.
#[derive(Default)]
pub struct CelestialPlugin {
    pub config: CelestialConfig,
}

impl CelestialPlugin {
    pub fn new(config: CelestialConfig) -> Self {
        Self { config }
    }
}

impl Plugin for CelestialPlugin {
    fn build(&self, app: &mut App) {
        let core = match CelestialCore::new(self.config.clone()) {
            Ok(core) => core,
            Err(err) => {
                error!("celestial core not started: {}", err);
                return;
            }
        };
        info!(
            "celestial core ready: {} scaling, {} gravity",
            self.config.scale.method, self.config.gravity.mode
        );

        app.insert_resource(self.config.clone())
            .insert_resource(core)
            .configure_sets(Update, (CelestialSet::Origin, CelestialSet::Scale).chain())
            .add_systems(First, begin_gravity_frame)
            .add_systems(Update, tick_origin.in_set(CelestialSet::Origin))
            .add_systems(
                Update,
                refresh_body_scales
                    .in_set(CelestialSet::Scale)
                    .run_if(resource_exists::<ScaleViewer>),
            );
    }
}

fn begin_gravity_frame(core: Res<CelestialCore>) {
    core.gravity.begin_frame();
}

fn tick_origin(core: Res<CelestialCore>, time: Res<Time>) {
    core.origin.tick(time.delta_secs_f64());
}

fn refresh_body_scales(core: Res<CelestialCore>, viewer: Res<ScaleViewer>, time: Res<Time>) {
    if viewer.smooth {
        let dt = time.delta_secs_f64();
        for body in core.registry.all_bodies() {
            core.scale.update_body_scale(body.as_ref(), viewer.position, dt);
        }
    } else {
        core.scale.update_registered_scales(viewer.position);
    }
}
