//! Influence ranking and sphere-of-influence approximation.

use bevy::math::DVec3;

use super::forces::influence_strength;
use crate::body::{BodyRef, MassBody};
use crate::types::{km_to_units, SOI_REFERENCE_MASS};

/// A body together with its influence metric at some position.
#[derive(Clone)]
pub struct Influence {
    pub body: BodyRef,
    /// `mass / distance²`; a ranking metric, not a force.
    pub strength: f64,
    /// Distance from the query position (world units).
    pub distance: f64,
}

impl std::fmt::Debug for Influence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Influence")
            .field("body", &self.body.identifier())
            .field("strength", &self.strength)
            .field("distance", &self.distance)
            .finish()
    }
}

/// Approximate sphere-of-influence radius in kilometers.
///
/// `radius * max(2, cbrt(mass / 1e24))`. This is a gameplay approximation,
/// not the Laplace sphere `a * (m / M)^(2/5)`, which would need orbital data.
#[inline]
pub fn sphere_of_influence_km(mass: f64, radius_km: f64) -> f64 {
    radius_km * (mass.max(0.0) / SOI_REFERENCE_MASS).cbrt().max(2.0)
}

/// Sphere of influence of `body` in world units.
pub fn sphere_of_influence_units(body: &dyn MassBody) -> f64 {
    km_to_units(sphere_of_influence_km(body.mass(), body.radius()))
}

/// Bodies with positive influence at `position`, strongest first.
///
/// Ties keep snapshot order.
pub fn rank_by_influence(bodies: &[BodyRef], position: DVec3, min_distance: f64) -> Vec<Influence> {
    let mut ranked: Vec<Influence> = bodies
        .iter()
        .filter_map(|body| {
            let body_pos = body.position();
            let strength = influence_strength(body_pos, body.effective_mass(), position, min_distance);
            (strength > 0.0).then(|| Influence {
                body: body.clone(),
                strength,
                distance: body_pos.distance(position),
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    ranked
}

/// The body with the greatest influence at `position`, if any gravitates.
pub fn dominant(bodies: &[BodyRef], position: DVec3, min_distance: f64) -> Option<Influence> {
    bodies
        .iter()
        .filter_map(|body| {
            let body_pos = body.position();
            let strength = influence_strength(body_pos, body.effective_mass(), position, min_distance);
            (strength > 0.0).then(|| Influence {
                body: body.clone(),
                strength,
                distance: body_pos.distance(position),
            })
        })
        .max_by(|a, b| a.strength.total_cmp(&b.strength))
}
