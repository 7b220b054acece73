use std::sync::Arc;

use bevy::math::{DVec3, I64Vec3, Vec3};
use bevy::prelude::*;
use parking_lot::Mutex;

use super::sector::VirtualPosition;
use crate::config::{ConfigError, OriginConfig};
use crate::registry::BodyRegistry;
use crate::safety::{RecoveryHandler, SafetyGuard};

/// Snapshot of the tracker for telemetry.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OriginStats {
    pub recenter_count: u64,
    pub sector: I64Vec3,
    pub distance_from_origin: f64,
    pub precision_error: f64,
    pub world_position: DVec3,
    pub last_recenter_position: DVec3,
    /// Sum of every offset applied to the universe so far.
    pub total_shift: DVec3,
}

#[derive(Debug)]
struct TrackerState {
    config: OriginConfig,
    /// Tracked entity relative to the current floating origin.
    local: VirtualPosition,
    /// Where the current floating origin sits in absolute coordinates.
    origin: VirtualPosition,
    recenter_count: u64,
    last_recenter_position: DVec3,
    total_shift: DVec3,
    accumulator: f64,
}

impl TrackerState {
    fn local_position(&self) -> DVec3 {
        self.local.to_world_position(self.config.sector_size)
    }

    fn world_position(&self) -> DVec3 {
        self.origin
            .offset_by(&self.local, self.config.sector_size)
            .to_world_position(self.config.sector_size)
    }

    fn should_recenter(&self) -> bool {
        self.local_position().length() > self.config.precision_threshold
    }

    fn precision_error(&self) -> f64 {
        self.local_position().length() / self.config.safe_distance
    }

    /// Fold the tracked entity's local position into the origin. Returns the
    /// offset every other body must be shifted by.
    fn rebase(&mut self) -> DVec3 {
        let size = self.config.sector_size;
        let offset = -self.local_position();
        self.origin = self.origin.offset_by(&self.local, size);
        self.local = VirtualPosition::ZERO;
        self.recenter_count += 1;
        self.last_recenter_position = self.origin.to_world_position(size);
        self.total_shift += offset;
        offset
    }
}

/// Keeps one tracked entity (usually the player) close to the floating origin.
///
/// The entity's position relative to the origin is held as a
/// [`VirtualPosition`]. When it drifts past the precision threshold, a
/// recenter folds it into the origin and shifts every registered body by the
/// opposite amount, so absolute positions are unchanged.
///
/// In multi-observer setups only the authority calls [`recenter`](Self::recenter);
/// other observers receive the offset through the registry's broadcast hook.
pub struct OriginTracker {
    state: Mutex<TrackerState>,
    registry: Arc<BodyRegistry>,
    safety: Option<Arc<SafetyGuard>>,
}

impl OriginTracker {
    pub fn new(config: OriginConfig, registry: Arc<BodyRegistry>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(TrackerState {
                config,
                local: VirtualPosition::ZERO,
                origin: VirtualPosition::ZERO,
                recenter_count: 0,
                last_recenter_position: DVec3::ZERO,
                total_shift: DVec3::ZERO,
                accumulator: 0.0,
            }),
            registry,
            safety: None,
        })
    }

    /// Report precision problems found during ticks to `safety`.
    pub fn with_safety(mut self, safety: Arc<SafetyGuard>) -> Self {
        self.safety = Some(safety);
        self
    }

    /// Install a new configuration and reset the tracked position and counters.
    pub fn initialize(&self, config: OriginConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let mut state = self.state.lock();
        state.config = config;
        state.local = VirtualPosition::ZERO;
        state.origin = VirtualPosition::ZERO;
        state.recenter_count = 0;
        state.last_recenter_position = DVec3::ZERO;
        state.total_shift = DVec3::ZERO;
        state.accumulator = 0.0;
        Ok(())
    }

    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.accumulator = 0.0;
        state.config.auto_recenter = false;
    }

    pub fn config(&self) -> OriginConfig {
        self.state.lock().config.clone()
    }

    pub fn set_auto_recenter(&self, enabled: bool) {
        self.state.lock().config.auto_recenter = enabled;
    }

    // === Movement ===

    /// Move the tracked entity by `delta` world units.
    pub fn move_by(&self, delta: DVec3) {
        if !delta.is_finite() {
            warn!("OriginTracker: ignoring non-finite move {:?}", delta);
            return;
        }
        let mut state = self.state.lock();
        let size = state.config.sector_size;
        state.local.move_by(delta, size);
    }

    /// Place the tracked entity at `position` relative to the current origin.
    pub fn set_local_position(&self, position: DVec3) {
        if !position.is_finite() {
            warn!("OriginTracker: ignoring non-finite position {:?}", position);
            return;
        }
        let mut state = self.state.lock();
        let size = state.config.sector_size;
        state.local = VirtualPosition::from_world(position, size);
    }

    // === Recentering ===

    pub fn should_recenter(&self) -> bool {
        self.state.lock().should_recenter()
    }

    /// Shift the universe so the tracked entity sits at the origin.
    ///
    /// Every registered body moves by the returned offset, which is the
    /// negation of the tracked entity's position relative to the old origin.
    pub fn recenter(&self) -> DVec3 {
        let (offset, count) = {
            let mut state = self.state.lock();
            let offset = state.rebase();
            (offset, state.recenter_count)
        };

        let sequence = self.registry.translate_all(offset);
        info!(
            "recentered universe by ({:.0}, {:.0}, {:.0}) units, recenter #{} (sequence {})",
            offset.x, offset.y, offset.z, count, sequence
        );
        offset
    }

    /// Advance the check timer. Every `check_interval_secs` the tracker checks
    /// precision and, with auto-recenter on, recenters when past the threshold.
    ///
    /// Returns true if a recenter happened.
    pub fn tick(&self, delta_secs: f64) -> bool {
        if !(delta_secs.is_finite() && delta_secs > 0.0) {
            return false;
        }

        let (check, auto, local) = {
            let mut state = self.state.lock();
            state.accumulator += delta_secs;
            let interval = state.config.check_interval_secs;
            if state.accumulator < interval {
                return false;
            }
            // Long frames trigger one check, not a backlog.
            state.accumulator %= interval;
            (
                state.should_recenter(),
                state.config.auto_recenter,
                state.local_position(),
            )
        };

        if let Some(safety) = &self.safety {
            safety.check_position(local, "OriginTracker");
        }

        if check && auto {
            self.recenter();
            true
        } else {
            false
        }
    }

    // === Queries ===

    /// Distance of the tracked entity from the current floating origin.
    pub fn distance_from_origin(&self) -> f64 {
        self.state.lock().local_position().length()
    }

    /// Local distance as a fraction of the safe distance. Above 1.0, f32
    /// positions can no longer resolve one unit of movement.
    pub fn precision_error(&self) -> f64 {
        self.state.lock().precision_error()
    }

    /// Tracked entity relative to the current floating origin.
    pub fn virtual_position(&self) -> VirtualPosition {
        self.state.lock().local
    }

    /// Absolute position of the current floating origin.
    pub fn origin(&self) -> VirtualPosition {
        self.state.lock().origin
    }

    /// Absolute position of the tracked entity. Unchanged by recentering.
    pub fn world_position(&self) -> DVec3 {
        self.state.lock().world_position()
    }

    /// Position for rendering: local to the current origin, in f32.
    pub fn render_position(&self) -> Vec3 {
        self.state.lock().local_position().as_vec3()
    }

    pub fn recenter_count(&self) -> u64 {
        self.state.lock().recenter_count
    }

    /// Absolute position of the tracked entity at the last recenter.
    pub fn last_recenter_position(&self) -> DVec3 {
        self.state.lock().last_recenter_position
    }

    pub fn stats(&self) -> OriginStats {
        let state = self.state.lock();
        OriginStats {
            recenter_count: state.recenter_count,
            sector: state.local.sector,
            distance_from_origin: state.local_position().length(),
            precision_error: state.precision_error(),
            world_position: state.world_position(),
            last_recenter_position: state.last_recenter_position,
            total_shift: state.total_shift,
        }
    }
}

impl RecoveryHandler for OriginTracker {
    fn request_emergency_recenter(&self) -> bool {
        self.recenter();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{CelestialBody, MassBody};
    use crate::config::OriginConfig;
    use crate::test_utils::fixtures;
    use crate::types::{km_to_units, SECTOR_SIZE};
    use approx::assert_relative_eq;

    fn tracker() -> (Arc<BodyRegistry>, Arc<SafetyGuard>, Arc<OriginTracker>) {
        fixtures::origin_stack(OriginConfig::default())
    }

    #[test]
    fn test_threshold_gating() {
        let (_, _, tracker) = tracker();
        let threshold = tracker.config().precision_threshold;

        tracker.move_by(DVec3::new(threshold * 0.9, 0.0, 0.0));
        assert!(!tracker.should_recenter());
        tracker.move_by(DVec3::new(threshold * 0.2, 0.0, 0.0));
        assert!(tracker.should_recenter());
    }

    #[test]
    fn test_recenter_shifts_bodies_and_keeps_world_position() {
        let (registry, _, tracker) = tracker();
        let body = CelestialBody::shared("station", 1.0e6, 0.1, DVec3::new(km_to_units(50.0), 0.0, 0.0));
        registry.register(&body);

        let travel = DVec3::new(km_to_units(30.0), km_to_units(-5.0), 0.0);
        tracker.move_by(travel);
        let world_before = tracker.world_position();

        let offset = tracker.recenter();
        assert_eq!(offset, -travel);
        assert_eq!(body.position(), DVec3::new(km_to_units(50.0), 0.0, 0.0) - travel);
        assert_eq!(tracker.virtual_position(), VirtualPosition::ZERO);
        assert_relative_eq!(tracker.world_position().x, world_before.x);
        assert_relative_eq!(tracker.world_position().y, world_before.y);
        assert_eq!(tracker.recenter_count(), 1);
        assert_eq!(tracker.last_recenter_position(), world_before);
        assert_eq!(tracker.distance_from_origin(), 0.0);
    }

    #[test]
    fn test_recenter_across_sectors() {
        let (registry, _, tracker) = tracker();
        let body = CelestialBody::shared("beacon", 1.0, 0.0, DVec3::ZERO);
        registry.register(&body);

        let travel = DVec3::new(2.5 * SECTOR_SIZE, 0.0, 0.0);
        tracker.move_by(travel);
        assert_eq!(tracker.virtual_position().sector, I64Vec3::new(2, 0, 0));

        tracker.recenter();
        assert_relative_eq!(body.position().x, -travel.x);
        assert_relative_eq!(tracker.world_position().x, travel.x);
        assert_eq!(tracker.origin().sector, I64Vec3::new(2, 0, 0));
    }

    #[test]
    fn test_tick_interval_and_auto_recenter() {
        let (_, _, tracker) = tracker();
        let threshold = tracker.config().precision_threshold;
        tracker.move_by(DVec3::new(threshold * 2.0, 0.0, 0.0));

        // Checks only once per interval
        assert!(!tracker.tick(0.4));
        assert!(!tracker.tick(0.4));
        assert!(tracker.tick(0.4));
        assert_eq!(tracker.recenter_count(), 1);
        assert!(!tracker.should_recenter());

        tracker.move_by(DVec3::new(threshold * 2.0, 0.0, 0.0));
        tracker.set_auto_recenter(false);
        assert!(!tracker.tick(5.0));
        assert_eq!(tracker.recenter_count(), 1);
        assert!(tracker.should_recenter());
    }

    #[test]
    fn test_tick_reports_precision_to_safety() {
        let (_, safety, tracker) = tracker();
        tracker.set_auto_recenter(false);
        let safe = tracker.config().safe_distance;
        tracker.set_local_position(DVec3::new(safe * 2.0, 0.0, 0.0));

        tracker.tick(1.0);
        assert!(tracker.precision_error() > 1.0);
        assert_eq!(safety.stats().precision_warnings, 1);
    }

    #[test]
    fn test_emergency_recenter_through_safety() {
        let (registry, safety, tracker) = tracker();
        let moon = fixtures::moon_at(DVec3::new(1.0e9, 0.0, 0.0));
        registry.register(&moon);
        tracker.move_by(DVec3::new(1.0e9, 0.0, 0.0));

        assert!(safety.request_emergency_recenter("test"));
        assert_eq!(tracker.recenter_count(), 1);
        assert_eq!(moon.position(), DVec3::ZERO);
    }

    #[test]
    fn test_render_position_is_local() {
        let (_, _, tracker) = tracker();
        tracker.move_by(DVec3::new(1.0e12, 0.0, 0.0));
        tracker.recenter();
        tracker.move_by(DVec3::new(250.0, -10.0, 3.0));
        assert_eq!(tracker.render_position(), Vec3::new(250.0, -10.0, 3.0));
        assert_relative_eq!(tracker.world_position().x, 1.0e12 + 250.0);
    }

    #[test]
    fn test_non_finite_move_ignored() {
        let (_, _, tracker) = tracker();
        tracker.move_by(DVec3::new(f64::NAN, 0.0, 0.0));
        assert_eq!(tracker.virtual_position(), VirtualPosition::ZERO);
    }
}
