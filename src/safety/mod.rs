//! Output validation and safety event tracking.
//!
//! Every scale factor and force that leaves the core passes through here.
//! Nothing in this module panics or returns an error: bad values are replaced
//! with neutral ones and recorded in a bounded event log.

mod events;

use std::sync::{Arc, Weak};

use bevy::math::DVec3;
use bevy::prelude::*;
use chrono::Utc;
use parking_lot::Mutex;

pub use events::{EventLog, SafetyEvent, Severity, SeverityCounts};

use crate::config::{ConfigError, SafetyConfig};
use crate::types::{clamp_length, is_finite_vec, STANDARD_GRAVITY};

/// Positions this many times past the precision threshold are reported as critical.
const CRITICAL_PRECISION_FACTOR: f64 = 10.0;

/// Recovery actions the guard can request from external collaborators.
pub trait RecoveryHandler: Send + Sync {
    /// Recenter the universe immediately. Returns true if a recenter happened.
    fn request_emergency_recenter(&self) -> bool;

    /// Put the named entity back into a known-good physics state.
    fn reset_to_safe_state(&self, _subject: &str) -> bool {
        false
    }

    /// Switch the named entity to a simpler, non-precision mode.
    fn fallback_to_non_precision_mode(&self, _subject: &str) -> bool {
        false
    }
}

/// Acceleration ceiling for a target: `max_g_force` standard gravities times its mass.
///
/// Targets without a positive mass are treated as unit mass.
#[inline]
pub fn force_ceiling(target_mass: f64, max_g_force: f64) -> f64 {
    let mass = if target_mass > 0.0 && target_mass.is_finite() {
        target_mass
    } else {
        1.0
    };
    max_g_force * STANDARD_GRAVITY * mass
}

/// Clamp a force to the g-force ceiling, keeping its direction.
///
/// Non-finite input yields zero.
pub fn clamp_force(force: DVec3, target_mass: f64, max_g_force: f64) -> DVec3 {
    if !is_finite_vec(force) {
        return DVec3::ZERO;
    }
    clamp_length(force, force_ceiling(target_mass, max_g_force))
}

#[derive(Debug)]
struct SafetyState {
    config: SafetyConfig,
    log: EventLog,
    precision_warnings: u64,
    clamped_forces: u64,
    clamped_scales: u64,
}

/// Snapshot of the guard's counters for telemetry.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SafetyStats {
    pub counts: SeverityCounts,
    pub logged_events: usize,
    pub precision_warnings: u64,
    pub clamped_forces: u64,
    pub clamped_scales: u64,
}

/// Cross-cutting validator with a bounded event log.
pub struct SafetyGuard {
    state: Mutex<SafetyState>,
    recovery: Mutex<Option<Weak<dyn RecoveryHandler>>>,
}

impl SafetyGuard {
    pub fn new(config: SafetyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(SafetyState {
                log: EventLog::new(config.max_event_log_size),
                config,
                precision_warnings: 0,
                clamped_forces: 0,
                clamped_scales: 0,
            }),
            recovery: Mutex::new(None),
        })
    }

    /// Replace the configuration and reset counters and the event log.
    pub fn initialize(&self, config: SafetyConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let mut state = self.state.lock();
        state.log = EventLog::new(config.max_event_log_size);
        state.config = config;
        state.precision_warnings = 0;
        state.clamped_forces = 0;
        state.clamped_scales = 0;
        Ok(())
    }

    pub fn shutdown(&self) {
        self.state.lock().log.clear();
        *self.recovery.lock() = None;
    }

    pub fn config(&self) -> SafetyConfig {
        self.state.lock().config.clone()
    }

    /// Install the collaborator that performs recovery actions.
    ///
    /// Only a weak reference is kept so the handler may itself hold the guard.
    pub fn set_recovery_handler<H: RecoveryHandler + 'static>(&self, handler: &Arc<H>) {
        let weak: Weak<H> = Arc::downgrade(handler);
        let weak: Weak<dyn RecoveryHandler> = weak;
        *self.recovery.lock() = Some(weak);
    }

    // === Scale validation ===

    pub fn is_valid_scale(&self, factor: f64) -> bool {
        let state = self.state.lock();
        factor.is_finite() && factor >= state.config.min_scale && factor <= state.config.max_scale
    }

    /// Clamp to the configured scale bounds. NaN and infinities map to the neutral 1.0.
    pub fn clamp_scale(&self, factor: f64) -> f64 {
        let state = self.state.lock();
        clamp_scale_to(factor, state.config.min_scale, state.config.max_scale)
    }

    /// Clamp a scale and record an event if it was unusable or out of range.
    ///
    /// Non-finite factors become the neutral 1.0 with an Error event.
    pub fn validate_scale(&self, factor: f64, subject: &str) -> f64 {
        let (clamped, min, max) = {
            let state = self.state.lock();
            (
                clamp_scale_to(factor, state.config.min_scale, state.config.max_scale),
                state.config.min_scale,
                state.config.max_scale,
            )
        };

        if !factor.is_finite() {
            self.log_event(
                format!("scale factor {factor} is not finite, using neutral scale"),
                Severity::Error,
                subject,
            );
        } else if clamped != factor {
            self.state.lock().clamped_scales += 1;
            debug!("{}: scale {} clamped to [{}, {}]", subject, factor, min, max);
        }
        clamped
    }

    // === Force validation ===

    /// Clamp a force using the configured g-force ceiling.
    pub fn clamp_force(&self, force: DVec3, target_mass: f64) -> DVec3 {
        let max_g = self.state.lock().config.max_g_force;
        clamp_force(force, target_mass, max_g)
    }

    /// Zero out non-finite forces and clamp oversized ones, recording both.
    pub fn validate_force(&self, force: DVec3, target_mass: f64, subject: &str) -> DVec3 {
        self.validate_force_with_limit(force, target_mass, None, subject)
    }

    /// Like [`validate_force`](Self::validate_force) with an explicit g-force limit.
    pub fn validate_force_with_limit(
        &self,
        force: DVec3,
        target_mass: f64,
        max_g_force: Option<f64>,
        subject: &str,
    ) -> DVec3 {
        if !is_finite_vec(force) {
            self.log_event(
                format!("non-finite force {force:?} replaced with zero"),
                Severity::Error,
                subject,
            );
            return DVec3::ZERO;
        }

        let max_g = max_g_force.unwrap_or_else(|| self.state.lock().config.max_g_force);
        let ceiling = force_ceiling(target_mass, max_g);
        if force.length_squared() > ceiling * ceiling {
            self.state.lock().clamped_forces += 1;
            self.log_event(
                format!(
                    "force {:.3e} exceeds {:.1} g ceiling {:.3e}, clamped",
                    force.length(),
                    max_g,
                    ceiling
                ),
                Severity::Warning,
                subject,
            );
            return clamp_length(force, ceiling);
        }
        force
    }

    // === Precision monitoring ===

    /// True once a position is far enough out that a one-unit move may not register in f32.
    pub fn detect_precision_error(&self, position: DVec3) -> bool {
        let threshold = self.state.lock().config.precision_threshold;
        !is_finite_vec(position) || position.length() > threshold
    }

    /// Check a position and record a Warning or Critical event when precision is degraded.
    ///
    /// Returns the severity recorded, if any.
    pub fn check_position(&self, position: DVec3, subject: &str) -> Option<Severity> {
        if !is_finite_vec(position) {
            self.log_event("position is not finite", Severity::Critical, subject);
            return Some(Severity::Critical);
        }

        let threshold = self.state.lock().config.precision_threshold;
        let distance = position.length();
        if distance <= threshold {
            return None;
        }

        let severity = if distance > threshold * CRITICAL_PRECISION_FACTOR {
            Severity::Critical
        } else {
            Severity::Warning
        };
        self.state.lock().precision_warnings += 1;
        self.log_event(
            format!("precision degraded at {distance:.3e} units (threshold {threshold:.3e})"),
            severity,
            subject,
        );
        Some(severity)
    }

    // === Event log ===

    /// Append an event to the log. Never fails.
    pub fn log_event(&self, message: impl Into<String>, severity: Severity, subject: &str) {
        let event = SafetyEvent {
            severity,
            message: message.into(),
            subject: subject.to_string(),
            timestamp: Utc::now(),
        };

        let mirror = {
            let mut state = self.state.lock();
            let mirror = state.config.log_to_console;
            state.log.push(event.clone());
            mirror
        };

        if mirror {
            match severity {
                Severity::Info => info!("safety: {}", event),
                Severity::Warning => warn!("safety: {}", event),
                Severity::Error | Severity::Critical | Severity::Fatal => {
                    error!("safety: {}", event)
                }
            }
        }
    }

    pub fn recent_events(&self, n: usize) -> Vec<SafetyEvent> {
        self.state.lock().log.recent(n)
    }

    pub fn event_counts(&self) -> SeverityCounts {
        self.state.lock().log.counts()
    }

    pub fn clear_events(&self) {
        self.state.lock().log.clear();
    }

    pub fn stats(&self) -> SafetyStats {
        let state = self.state.lock();
        SafetyStats {
            counts: state.log.counts(),
            logged_events: state.log.len(),
            precision_warnings: state.precision_warnings,
            clamped_forces: state.clamped_forces,
            clamped_scales: state.clamped_scales,
        }
    }

    // === Recovery ===

    fn recovery_handler(&self) -> Option<Arc<dyn RecoveryHandler>> {
        self.recovery.lock().as_ref().and_then(Weak::upgrade)
    }

    /// Ask the recovery handler for an immediate recenter.
    pub fn request_emergency_recenter(&self, subject: &str) -> bool {
        let Some(handler) = self.recovery_handler() else {
            self.log_event(
                "emergency recenter requested with no recovery handler",
                Severity::Error,
                subject,
            );
            return false;
        };
        self.log_event("emergency recenter requested", Severity::Warning, subject);
        handler.request_emergency_recenter()
    }

    pub fn reset_to_safe_state(&self, subject: &str) -> bool {
        let Some(handler) = self.recovery_handler() else {
            return false;
        };
        self.log_event("resetting to safe state", Severity::Warning, subject);
        handler.reset_to_safe_state(subject)
    }

    pub fn fallback_to_non_precision_mode(&self, subject: &str) -> bool {
        let Some(handler) = self.recovery_handler() else {
            return false;
        };
        self.log_event("falling back to non-precision mode", Severity::Warning, subject);
        handler.fallback_to_non_precision_mode(subject)
    }
}

impl Default for SafetyGuard {
    fn default() -> Self {
        Self {
            state: Mutex::new(SafetyState {
                log: EventLog::new(SafetyConfig::default().max_event_log_size),
                config: SafetyConfig::default(),
                precision_warnings: 0,
                clamped_forces: 0,
                clamped_scales: 0,
            }),
            recovery: Mutex::new(None),
        }
    }
}

#[inline]
fn clamp_scale_to(factor: f64, min: f64, max: f64) -> f64 {
    if !factor.is_finite() {
        return 1.0_f64.clamp(min, max);
    }
    factor.clamp(min, max)
}
