//! Units, physical constants and small shared helpers.
//!
//! World positions are expressed in engine units (centimeters) and stored as
//! `f64` (`DVec3`). Gravity math runs in SI and is converted back at the edge.

use bevy::math::DVec3;

/// Physical constants (SI units)

/// Gravitational constant (m³·kg⁻¹·s⁻²)
pub const G: f64 = 6.67430e-11;

/// Standard gravity in world units (cm/s²)
pub const STANDARD_GRAVITY: f64 = 980.665;

/// World units per meter (1 unit = 1 cm)
pub const UNITS_PER_METER: f64 = 100.0;

/// World units per kilometer
pub const UNITS_PER_KM: f64 = 100_000.0;

/// Meters per world unit
pub const METERS_PER_UNIT: f64 = 1.0 / UNITS_PER_METER;

/// Edge length of one coordinate sector (100 km)
pub const SECTOR_SIZE: f64 = 10_000_000.0;

/// Mass used for a force target that does not report one (kg)
pub const DEFAULT_TARGET_MASS: f64 = 1000.0;

/// Reference mass for the sphere-of-influence approximation (kg)
pub const SOI_REFERENCE_MASS: f64 = 1.0e24;

/// Tolerance under which two scale factors are treated as equal.
pub const SCALE_EPSILON: f64 = 1.0e-4;

/// Convert kilometers to world units.
#[inline]
pub fn km_to_units(km: f64) -> f64 {
    km * UNITS_PER_KM
}

/// Convert world units to kilometers.
#[inline]
pub fn units_to_km(units: f64) -> f64 {
    units / UNITS_PER_KM
}

/// True when every component of the vector is finite.
#[inline]
pub fn is_finite_vec(v: DVec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

/// Clamp the length of `v` to `max_length`, keeping its direction.
///
/// A zero vector passes through untouched.
#[inline]
pub fn clamp_length(v: DVec3, max_length: f64) -> DVec3 {
    let len_sq = v.length_squared();
    if len_sq == 0.0 || len_sq <= max_length * max_length {
        return v;
    }
    v * (max_length / len_sq.sqrt())
}
