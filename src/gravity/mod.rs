//! Gravitational force aggregation over the registered bodies.
//!
//! The engine snapshots the registry, releases it, and then computes under its
//! own lock, which also guards the statistics counters. Totals are passed
//! through the [`SafetyGuard`] after that lock is released, so no two
//! subsystem locks are ever held together.
//!
//! Simulation modes trade fidelity for cost:
//! - `SingleBody`: only the dominant body (largest `mass / distance²`)
//! - `MultiBody`: the strongest few bodies by the same metric
//! - `NBody`: every body within the influence cutoff
//! - `Disabled`: no gravity at all

mod forces;
mod influence;

#[cfg(test)]
mod proptest_gravity;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bevy::math::DVec3;
use bevy::prelude::*;
use parking_lot::Mutex;

pub use forces::{
    acceleration_between, force_between, influence_strength, sum_accelerations, ForceParams, Source,
};
pub use influence::{sphere_of_influence_km, sphere_of_influence_units, Influence};

use crate::body::{BodyRef, MassBody};
use crate::config::{ConfigError, GravityConfig};
use crate::registry::BodyRegistry;
use crate::safety::SafetyGuard;

/// Which bodies contribute to a total force.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SimulationMode {
    SingleBody,
    #[default]
    MultiBody,
    NBody,
    Disabled,
}

impl fmt::Display for SimulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SimulationMode::SingleBody => "Single body",
            SimulationMode::MultiBody => "Multi body",
            SimulationMode::NBody => "N-body",
            SimulationMode::Disabled => "Disabled",
        })
    }
}

/// Counters for the debug overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GravityStats {
    pub mode: SimulationMode,
    /// Pairwise evaluations since the last `begin_frame`.
    pub calculations_this_frame: u64,
    pub total_calculations: u64,
    pub total_queries: u64,
    pub total_time: Duration,
}

impl GravityStats {
    /// Mean wall time per total-force query.
    pub fn average_time(&self) -> Duration {
        if self.total_queries == 0 {
            Duration::ZERO
        } else {
            self.total_time.div_f64(self.total_queries as f64)
        }
    }
}

struct GravityState {
    config: GravityConfig,
    stats: GravityStats,
}

impl GravityState {
    fn params(&self) -> ForceParams {
        ForceParams::from(&self.config)
    }

    /// Sum of accelerations at `position` from the bodies the mode selects.
    fn aggregate_acceleration(&mut self, bodies: &[BodyRef], position: DVec3) -> DVec3 {
        let params = self.params();
        let min_distance = self.config.min_gravity_distance;

        let (acc, evaluated) = match self.config.mode {
            SimulationMode::Disabled => (DVec3::ZERO, 0),
            SimulationMode::SingleBody => match influence::dominant(bodies, position, min_distance) {
                Some(top) => (
                    acceleration_between(top.body.position(), top.body.effective_mass(), position, &params),
                    1,
                ),
                None => (DVec3::ZERO, 0),
            },
            SimulationMode::MultiBody => {
                let mut ranked = influence::rank_by_influence(bodies, position, min_distance);
                ranked.truncate(self.config.multi_body_count);
                let acc = ranked.iter().fold(DVec3::ZERO, |acc, i| {
                    acc + acceleration_between(i.body.position(), i.body.effective_mass(), position, &params)
                });
                (acc, ranked.len())
            }
            SimulationMode::NBody => {
                let cutoff_sq = self.config.max_influence_distance.powi(2);
                let sources: Vec<Source> = bodies
                    .iter()
                    .filter_map(|b| {
                        let pos = b.position();
                        let mass = b.effective_mass();
                        (mass > 0.0 && pos.distance_squared(position) <= cutoff_sq).then_some((pos, mass))
                    })
                    .collect();
                (sum_accelerations(&sources, position, &params), sources.len())
            }
        };

        self.stats.calculations_this_frame += evaluated as u64;
        self.stats.total_calculations += evaluated as u64;
        acc
    }
}

/// Computes gravitational forces from the bodies in a [`BodyRegistry`].
pub struct GravityEngine {
    state: Mutex<GravityState>,
    registry: Arc<BodyRegistry>,
    safety: Arc<SafetyGuard>,
}

impl GravityEngine {
    pub fn new(
        config: GravityConfig,
        registry: Arc<BodyRegistry>,
        safety: Arc<SafetyGuard>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(GravityState {
                stats: GravityStats {
                    mode: config.mode,
                    ..Default::default()
                },
                config,
            }),
            registry,
            safety,
        })
    }

    /// Install a new configuration and reset statistics.
    pub fn initialize(&self, config: GravityConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let mut state = self.state.lock();
        state.stats = GravityStats {
            mode: config.mode,
            ..Default::default()
        };
        state.config = config;
        Ok(())
    }

    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        let mode = state.config.mode;
        state.stats = GravityStats {
            mode,
            ..Default::default()
        };
    }

    pub fn config(&self) -> GravityConfig {
        self.state.lock().config.clone()
    }

    pub fn registry(&self) -> &Arc<BodyRegistry> {
        &self.registry
    }

    pub fn mode(&self) -> SimulationMode {
        self.state.lock().config.mode
    }

    pub fn set_mode(&self, mode: SimulationMode) {
        let mut state = self.state.lock();
        if state.config.mode != mode {
            info!("gravity mode {} -> {}", state.config.mode, mode);
            state.config.mode = mode;
            state.stats.mode = mode;
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock().config.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().config.enabled
    }

    // === Pairwise ===

    /// Force exerted by `body` on `target_mass` at `target_position`.
    pub fn force_from_body(&self, body: &dyn MassBody, target_position: DVec3, target_mass: f64) -> DVec3 {
        let mut state = self.state.lock();
        state.stats.calculations_this_frame += 1;
        state.stats.total_calculations += 1;
        force_between(
            body.position(),
            body.effective_mass(),
            target_position,
            target_mass,
            &state.params(),
        )
    }

    /// Mass-independent acceleration caused by `body` at `target_position`.
    pub fn acceleration_from_body(&self, body: &dyn MassBody, target_position: DVec3) -> DVec3 {
        let mut state = self.state.lock();
        state.stats.calculations_this_frame += 1;
        state.stats.total_calculations += 1;
        acceleration_between(body.position(), body.effective_mass(), target_position, &state.params())
    }

    // === Aggregates ===

    /// Total force on `target` at `target_position`, validated by the safety guard.
    ///
    /// Targets without a positive mass use the configured default mass. A
    /// destroyed target, disabled gravity or `Disabled` mode yield zero. The
    /// target itself never contributes to its own force.
    pub fn total_force(&self, target: Option<&dyn MassBody>, target_position: DVec3) -> DVec3 {
        if let Some(t) = target
            && !t.is_valid()
        {
            warn!("total_force: target '{}' is no longer valid", t.identifier());
            return DVec3::ZERO;
        }

        let (enabled, mode, default_mass, max_g) = {
            let state = self.state.lock();
            (
                state.config.enabled,
                state.config.mode,
                state.config.default_target_mass,
                state.config.max_g_force,
            )
        };
        if !enabled || mode == SimulationMode::Disabled {
            return DVec3::ZERO;
        }

        let target_mass = target
            .map(|t| t.mass())
            .filter(|m| *m > 0.0 && m.is_finite())
            .unwrap_or(default_mass);
        let subject = target.map_or("GravityEngine", |t| t.identifier());

        let bodies = self.sources_excluding(target);

        let force = {
            let mut state = self.state.lock();
            let start = Instant::now();
            let acc = state.aggregate_acceleration(&bodies, target_position);
            state.stats.total_queries += 1;
            state.stats.total_time += start.elapsed();
            acc * target_mass
        };

        self.safety
            .validate_force_with_limit(force, target_mass, Some(max_g), subject)
    }

    /// Acceleration at `position` under the current mode, clamped to the g-force ceiling.
    pub fn gravity_acceleration_at(&self, position: DVec3) -> DVec3 {
        let (enabled, max_g) = {
            let state = self.state.lock();
            (state.config.enabled, state.config.max_g_force)
        };
        if !enabled {
            return DVec3::ZERO;
        }
        let bodies = self.registry.all_bodies();
        let acc = {
            let mut state = self.state.lock();
            let start = Instant::now();
            let acc = state.aggregate_acceleration(&bodies, position);
            state.stats.total_queries += 1;
            state.stats.total_time += start.elapsed();
            acc
        };
        // Unit mass turns the force ceiling into an acceleration ceiling.
        self.safety
            .validate_force_with_limit(acc, 1.0, Some(max_g), "GravityEngine")
    }

    // === Influence queries ===

    /// Body with the largest `mass / distance²` at `position`.
    pub fn dominant_body(&self, position: DVec3) -> Option<BodyRef> {
        let bodies = self.registry.all_bodies();
        let min_distance = self.state.lock().config.min_gravity_distance;
        influence::dominant(&bodies, position, min_distance).map(|i| i.body)
    }

    /// Up to `max_count` bodies with positive influence at `position`, strongest first.
    pub fn influencing_bodies(&self, position: DVec3, max_count: usize) -> Vec<Influence> {
        let bodies = self.registry.all_bodies();
        let min_distance = self.state.lock().config.min_gravity_distance;
        let mut ranked = influence::rank_by_influence(&bodies, position, min_distance);
        ranked.truncate(max_count);
        ranked
    }

    /// Sphere-of-influence radius of `body` in kilometers.
    pub fn sphere_of_influence(&self, body: &dyn MassBody) -> f64 {
        sphere_of_influence_km(body.mass(), body.radius())
    }

    /// True if `position` lies inside `body`'s sphere of influence.
    pub fn is_within_sphere_of_influence(&self, body: &dyn MassBody, position: DVec3) -> bool {
        body.position().distance(position) <= sphere_of_influence_units(body)
    }

    pub fn influence_strength(&self, body: &dyn MassBody, position: DVec3) -> f64 {
        let min_distance = self.state.lock().config.min_gravity_distance;
        influence_strength(body.position(), body.effective_mass(), position, min_distance)
    }

    // === Statistics ===

    /// Reset the per-frame counter. Call once at the start of each frame.
    pub fn begin_frame(&self) {
        self.state.lock().stats.calculations_this_frame = 0;
    }

    pub fn stats(&self) -> GravityStats {
        self.state.lock().stats
    }

    fn sources_excluding(&self, target: Option<&dyn MassBody>) -> Vec<BodyRef> {
        let mut bodies = self.registry.all_bodies();
        if let Some(t) = target {
            bodies.retain(|b| b.identifier() != t.identifier());
        }
        bodies
    }
}
