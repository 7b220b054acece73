//! Pairwise gravity math on plain positions and masses.
//!
//! Positions are world units; they are converted to meters before the
//! inverse-square law is applied, and results are multiplied by the physics
//! scale on the way out.

use bevy::math::DVec3;
use wide::f64x4;

use crate::config::GravityConfig;

/// The subset of [`GravityConfig`] the force law needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceParams {
    pub gravitational_constant: f64,
    /// Distance floor in world units.
    pub min_distance: f64,
    pub units_to_meters: f64,
    pub physics_scale: f64,
}

impl From<&GravityConfig> for ForceParams {
    fn from(config: &GravityConfig) -> Self {
        Self {
            gravitational_constant: config.gravitational_constant,
            min_distance: config.min_gravity_distance,
            units_to_meters: config.units_to_meters,
            physics_scale: config.physics_scale,
        }
    }
}

/// A gravitating point: position and effective mass.
pub type Source = (DVec3, f64);

/// Acceleration at `target` caused by a mass at `source_pos`.
///
/// The distance is floored at `min_distance`; direction points from target to
/// source. Coincident points yield zero since no direction exists.
#[inline]
pub fn acceleration_between(source_pos: DVec3, source_mass: f64, target: DVec3, params: &ForceParams) -> DVec3 {
    if source_mass <= 0.0 {
        return DVec3::ZERO;
    }
    let delta = source_pos - target;
    let distance = delta.length();
    if distance == 0.0 {
        return DVec3::ZERO;
    }
    let effective_m = distance.max(params.min_distance) * params.units_to_meters;
    let magnitude = params.gravitational_constant * source_mass / (effective_m * effective_m);
    delta / distance * (magnitude * params.physics_scale)
}

/// Force on `target_mass` at `target` caused by a mass at `source_pos`.
#[inline]
pub fn force_between(
    source_pos: DVec3,
    source_mass: f64,
    target: DVec3,
    target_mass: f64,
    params: &ForceParams,
) -> DVec3 {
    acceleration_between(source_pos, source_mass, target, params) * target_mass
}

/// Ranking heuristic `mass / distance²`, with the distance floored.
#[inline]
pub fn influence_strength(source_pos: DVec3, source_mass: f64, target: DVec3, min_distance: f64) -> f64 {
    if source_mass <= 0.0 {
        return 0.0;
    }
    let d = source_pos.distance(target).max(min_distance);
    source_mass / (d * d)
}

/// Sum of accelerations from many sources, four lanes at a time.
pub fn sum_accelerations(sources: &[Source], target: DVec3, params: &ForceParams) -> DVec3 {
    let min_d = f64x4::splat(params.min_distance);
    let to_m = f64x4::splat(params.units_to_meters);
    let gm_scale = params.gravitational_constant * params.physics_scale;

    let mut acc = DVec3::ZERO;
    let mut chunks = sources.chunks_exact(4);

    for chunk in &mut chunks {
        let mut dx = [0.0; 4];
        let mut dy = [0.0; 4];
        let mut dz = [0.0; 4];
        let mut mass = [0.0; 4];
        for (i, &(pos, m)) in chunk.iter().enumerate() {
            let delta = pos - target;
            // Coincident or massless lanes contribute nothing; keep the divisor finite.
            if delta == DVec3::ZERO || m <= 0.0 {
                dx[i] = 1.0;
                continue;
            }
            dx[i] = delta.x;
            dy[i] = delta.y;
            dz[i] = delta.z;
            mass[i] = m;
        }

        let dx = f64x4::new(dx);
        let dy = f64x4::new(dy);
        let dz = f64x4::new(dz);
        let mass = f64x4::new(mass);

        let r = (dx * dx + dy * dy + dz * dz).sqrt();
        let eff = r.max(min_d) * to_m;
        // |a| / r so multiplying by the delta both normalizes and scales.
        let k = mass * f64x4::splat(gm_scale) / (eff * eff * r);

        let ax = (dx * k).to_array();
        let ay = (dy * k).to_array();
        let az = (dz * k).to_array();
        acc += DVec3::new(
            ax.iter().sum::<f64>(),
            ay.iter().sum::<f64>(),
            az.iter().sum::<f64>(),
        );
    }

    for &(pos, m) in chunks.remainder() {
        acc += acceleration_between(pos, m, target, params);
    }

    acc
}
