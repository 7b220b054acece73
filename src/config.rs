//! Tunable settings for each subsystem.
//!
//! Each struct has sensible defaults and a `validate()` that rejects values the
//! engines cannot work with. Construction of an engine from a config is the
//! only fallible path in the crate; runtime operations degrade instead of
//! erroring.

use bevy::prelude::*;

use crate::gravity::SimulationMode;
use crate::scale::ScalingMethod;
use crate::types::{
    km_to_units, DEFAULT_TARGET_MASS, G, METERS_PER_UNIT, SECTOR_SIZE, UNITS_PER_METER,
};

/// Distance (world units) past which an f32 can no longer resolve a 1-unit step.
pub const F32_EXACT_LIMIT: f64 = 16_777_216.0;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive and finite (got {value})")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be non-negative and finite (got {value})")]
    Negative { field: &'static str, value: f64 },

    #[error("invalid bounds for {field}: min {min} is greater than max {max}")]
    InvertedBounds {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{0} must be greater than zero")]
    ZeroSize(&'static str),
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn ordered(field: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvertedBounds { field, min, max })
    }
}

/// Settings for distance-driven visual scaling.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct ScaleConfig {
    /// Scaling law applied to the normalized distance.
    pub method: ScalingMethod,
    /// Distance at which a body renders at scale 1.0 (world units).
    pub reference_distance: f64,
    /// Exponent for the inverse-power law.
    pub exponent: f64,
    /// Logarithm base for the logarithmic law.
    pub log_base: f64,
    /// Lower clamp for any computed factor.
    pub min_scale: f64,
    /// Upper clamp for any computed factor.
    pub max_scale: f64,
    /// Width of one cache bucket (world units).
    pub quantization_factor: f64,
    /// Maximum number of cached buckets before eviction.
    pub max_cache_size: usize,
    /// Relative distance change below which callers skip recomputation.
    pub update_threshold: f64,
    /// Interpolation speed used by scale smoothing (per second).
    pub smoothing_speed: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            method: ScalingMethod::InverseSquare,
            reference_distance: km_to_units(1000.0),
            exponent: 2.0,
            log_base: 10.0,
            min_scale: 0.001,
            max_scale: 100.0,
            quantization_factor: 1000.0, // 10 m buckets
            max_cache_size: 1000,
            update_threshold: 0.05,
            smoothing_speed: 2.0,
        }
    }
}

impl ScaleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("reference_distance", self.reference_distance)?;
        positive("exponent", self.exponent)?;
        positive("min_scale", self.min_scale)?;
        positive("max_scale", self.max_scale)?;
        ordered("scale", self.min_scale, self.max_scale)?;
        positive("quantization_factor", self.quantization_factor)?;
        non_negative("update_threshold", self.update_threshold)?;
        non_negative("smoothing_speed", self.smoothing_speed)?;
        if !(self.log_base > 0.0 && self.log_base.is_finite() && self.log_base != 1.0) {
            return Err(ConfigError::NonPositive {
                field: "log_base",
                value: self.log_base,
            });
        }
        if self.max_cache_size == 0 {
            return Err(ConfigError::ZeroSize("max_cache_size"));
        }
        Ok(())
    }
}

/// Settings for gravitational force aggregation.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct GravityConfig {
    /// Which bodies contribute to a total force.
    pub mode: SimulationMode,
    /// Global switch; when false every query returns zero.
    pub enabled: bool,
    /// Gravitational constant (SI).
    pub gravitational_constant: f64,
    /// Distances below this are floored to it (world units).
    pub min_gravity_distance: f64,
    /// N-body mode skips bodies farther than this (world units).
    pub max_influence_distance: f64,
    /// Multiplier applied to SI forces before they leave the engine.
    pub physics_scale: f64,
    /// Meters per world unit, used to bring distances into SI.
    pub units_to_meters: f64,
    /// Mass assumed for targets that do not report one (kg).
    pub default_target_mass: f64,
    /// Ceiling on acceleration, in multiples of standard gravity.
    pub max_g_force: f64,
    /// Bodies summed in multi-body mode.
    pub multi_body_count: usize,
}

impl Default for GravityConfig {
    fn default() -> Self {
        Self {
            mode: SimulationMode::MultiBody,
            enabled: true,
            gravitational_constant: G,
            min_gravity_distance: km_to_units(1.0),
            max_influence_distance: km_to_units(1.0e8),
            physics_scale: UNITS_PER_METER,
            units_to_meters: METERS_PER_UNIT,
            default_target_mass: DEFAULT_TARGET_MASS,
            max_g_force: 50.0,
            multi_body_count: 3,
        }
    }
}

impl GravityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("gravitational_constant", self.gravitational_constant)?;
        positive("min_gravity_distance", self.min_gravity_distance)?;
        positive("max_influence_distance", self.max_influence_distance)?;
        ordered(
            "gravity distance",
            self.min_gravity_distance,
            self.max_influence_distance,
        )?;
        positive("physics_scale", self.physics_scale)?;
        positive("units_to_meters", self.units_to_meters)?;
        positive("default_target_mass", self.default_target_mass)?;
        positive("max_g_force", self.max_g_force)?;
        if self.multi_body_count == 0 {
            return Err(ConfigError::ZeroSize("multi_body_count"));
        }
        Ok(())
    }
}

/// Settings for sector tracking and universe recentering.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct OriginConfig {
    /// Edge length of one sector (world units).
    pub sector_size: f64,
    /// Local offset length that triggers a recenter (world units).
    pub precision_threshold: f64,
    /// Distance considered fully precise; `precision_error` is relative to it.
    pub safe_distance: f64,
    /// Recenter automatically from `tick`.
    pub auto_recenter: bool,
    /// Seconds between automatic threshold checks.
    pub check_interval_secs: f64,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            sector_size: SECTOR_SIZE,
            precision_threshold: km_to_units(10.0),
            safe_distance: F32_EXACT_LIMIT,
            auto_recenter: true,
            check_interval_secs: 1.0,
        }
    }
}

impl OriginConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("sector_size", self.sector_size)?;
        positive("precision_threshold", self.precision_threshold)?;
        positive("safe_distance", self.safe_distance)?;
        positive("check_interval_secs", self.check_interval_secs)?;
        Ok(())
    }
}

/// Settings for output validation and the safety event log.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct SafetyConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Default acceleration ceiling in multiples of standard gravity.
    pub max_g_force: f64,
    /// Position magnitude beyond which precision is considered degraded.
    pub precision_threshold: f64,
    /// Capacity of the circular event log.
    pub max_event_log_size: usize,
    /// Mirror recorded events to the log output.
    pub log_to_console: bool,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.001,
            max_scale: 100.0,
            max_g_force: 50.0,
            precision_threshold: F32_EXACT_LIMIT,
            max_event_log_size: 256,
            log_to_console: true,
        }
    }
}

impl SafetyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("min_scale", self.min_scale)?;
        positive("max_scale", self.max_scale)?;
        ordered("scale", self.min_scale, self.max_scale)?;
        positive("max_g_force", self.max_g_force)?;
        positive("precision_threshold", self.precision_threshold)?;
        if self.max_event_log_size == 0 {
            return Err(ConfigError::ZeroSize("max_event_log_size"));
        }
        Ok(())
    }
}

/// Aggregate configuration for the whole celestial core.
#[derive(Resource, Clone, Debug, Default, PartialEq)]
pub struct CelestialConfig {
    pub scale: ScaleConfig,
    pub gravity: GravityConfig,
    pub origin: OriginConfig,
    pub safety: SafetyConfig,
}

impl CelestialConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scale.validate()?;
        self.gravity.validate()?;
        self.origin.validate()?;
        self.safety.validate()?;
        Ok(())
    }
}
