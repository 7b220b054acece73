//! Distance-driven visual scaling with a quantized result cache.
//!
//! A body's visual scale is a function of its distance to the viewer,
//! normalized by a reference distance and passed through a selectable law.
//! Results are cached per reference distance and distance bucket; any change to the law or its
//! parameters clears the cache under the same lock, so a lookup never sees a
//! value computed under old parameters.

mod method;

#[cfg(test)]
mod proptest_scale;

use std::collections::HashMap;
use std::sync::Arc;

use bevy::math::DVec3;
use bevy::prelude::*;
use parking_lot::Mutex;

pub use method::{CustomCurve, ScalingMethod};

use method::{raw_scale, LawParams};

use crate::body::MassBody;
use crate::config::{ConfigError, ScaleConfig};
use crate::registry::BodyRegistry;
use crate::safety::SafetyGuard;
use crate::types::SCALE_EPSILON;

/// Neutral factor returned for unusable input.
pub const NEUTRAL_SCALE: f64 = 1.0;

/// Cache and counter snapshot for telemetry.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScaleStats {
    pub cache_size: usize,
    pub cache_hits: u64,
    pub cache_lookups: u64,
    pub evictions: u64,
    pub method: ScalingMethod,
}

impl ScaleStats {
    /// Fraction of lookups served from the cache (0 when nothing was looked up).
    pub fn hit_rate(&self) -> f64 {
        if self.cache_lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.cache_lookups as f64
        }
    }
}

/// Reference distance bits and distance bucket.
type CacheKey = (u64, i64);

struct ScaleState {
    config: ScaleConfig,
    custom_curve: Option<CustomCurve>,
    cache: HashMap<CacheKey, f64>,
    cache_hits: u64,
    cache_lookups: u64,
    evictions: u64,
}

impl ScaleState {
    fn reset_cache(&mut self) {
        self.cache.clear();
        self.cache_hits = 0;
        self.cache_lookups = 0;
    }

    fn key(&self, distance: f64, reference_distance: f64) -> CacheKey {
        let bucket = (distance / self.config.quantization_factor).floor() as i64;
        (reference_distance.to_bits(), bucket)
    }

    /// Drop a quarter of the entries (at least one) once over capacity.
    fn evict_if_needed(&mut self) {
        if self.cache.len() <= self.config.max_cache_size {
            return;
        }
        let to_remove = (self.cache.len() / 4).max(1);
        let victims: Vec<CacheKey> = self.cache.keys().take(to_remove).copied().collect();
        for key in victims {
            self.cache.remove(&key);
        }
        self.evictions += to_remove as u64;
        trace!("scale cache evicted {} entries", to_remove);
    }

    /// Clamped factor, or the raw value when the law produced NaN or an infinity.
    fn compute(&self, distance: f64, reference_distance: f64) -> f64 {
        let normalized = distance / reference_distance;
        let params = LawParams {
            exponent: self.config.exponent,
            log_base: self.config.log_base,
            max_scale: self.config.max_scale,
        };
        let raw = raw_scale(
            self.config.method,
            normalized,
            params,
            self.custom_curve.as_ref(),
        );
        if !raw.is_finite() {
            return raw;
        }
        raw.clamp(self.config.min_scale, self.config.max_scale)
    }
}

/// Converts distances into bounded, cached scale factors.
pub struct ScaleEngine {
    state: Mutex<ScaleState>,
    registry: Option<Arc<BodyRegistry>>,
    safety: Option<Arc<SafetyGuard>>,
}

impl ScaleEngine {
    pub fn new(config: ScaleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(ScaleState {
                config,
                custom_curve: None,
                cache: HashMap::new(),
                cache_hits: 0,
                cache_lookups: 0,
                evictions: 0,
            }),
            registry: None,
            safety: None,
        })
    }

    /// Attach the registry whose bodies [`update_registered_scales`](Self::update_registered_scales) walks.
    pub fn with_registry(mut self, registry: Arc<BodyRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Route every computed factor through the safety guard.
    pub fn with_safety(mut self, safety: Arc<SafetyGuard>) -> Self {
        self.safety = Some(safety);
        self
    }

    /// Install a new configuration and start from an empty cache.
    pub fn initialize(&self, config: ScaleConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let mut state = self.state.lock();
        state.config = config;
        state.reset_cache();
        state.evictions = 0;
        Ok(())
    }

    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.reset_cache();
        state.custom_curve = None;
    }

    pub fn config(&self) -> ScaleConfig {
        self.state.lock().config.clone()
    }

    // === Scale computation ===

    /// Scale factor for `distance` relative to `reference_distance`.
    ///
    /// Non-positive input is logged and yields the neutral factor. A non-finite
    /// result from the scaling law is never cached; it goes to the safety guard
    /// as-is, or is replaced with the neutral factor when no guard is attached.
    pub fn compute_scale_factor(&self, distance: f64, reference_distance: f64) -> f64 {
        if !(distance > 0.0 && distance.is_finite()) {
            warn!("compute_scale_factor: invalid distance {}, using neutral scale", distance);
            return NEUTRAL_SCALE;
        }
        if !(reference_distance > 0.0 && reference_distance.is_finite()) {
            warn!(
                "compute_scale_factor: invalid reference distance {}, using neutral scale",
                reference_distance
            );
            return NEUTRAL_SCALE;
        }

        let (result, neutral) = {
            let mut state = self.state.lock();
            let neutral = NEUTRAL_SCALE.clamp(state.config.min_scale, state.config.max_scale);
            let key = state.key(distance, reference_distance);
            state.cache_lookups += 1;
            if let Some(&cached) = state.cache.get(&key) {
                state.cache_hits += 1;
                (cached, neutral)
            } else {
                let value = state.compute(distance, reference_distance);
                if value.is_finite() {
                    state.cache.insert(key, value);
                    state.evict_if_needed();
                }
                (value, neutral)
            }
        };

        match &self.safety {
            Some(safety) => safety.validate_scale(result, "ScaleEngine"),
            None if !result.is_finite() => {
                error!("scaling law produced {} at distance {}, using neutral scale", result, distance);
                neutral
            }
            None => result,
        }
    }

    /// Scale factor for `distance` using the configured reference distance.
    pub fn scale_factor(&self, distance: f64) -> f64 {
        let reference = self.state.lock().config.reference_distance;
        self.compute_scale_factor(distance, reference)
    }

    /// Target scale for a body seen from `viewer`.
    pub fn scale_for_body(&self, body: &dyn MassBody, viewer: DVec3) -> f64 {
        self.scale_factor(body.position().distance(viewer))
    }

    /// Recompute a body's target scale and move its current scale toward it.
    ///
    /// Returns the scale applied to the body.
    pub fn update_body_scale(&self, body: &dyn MassBody, viewer: DVec3, delta_secs: f64) -> f64 {
        let target = self.scale_for_body(body, viewer);
        let speed = self.state.lock().config.smoothing_speed;
        let next = smooth_transition(body.scale(), target, delta_secs, speed);
        body.set_target_scale(target);
        body.set_scale(next);
        next
    }

    /// Snap every live registered body straight to its target scale.
    ///
    /// Does nothing when no registry is attached.
    pub fn update_registered_scales(&self, viewer: DVec3) -> usize {
        match &self.registry {
            Some(registry) => registry.update_all_scales(viewer, self),
            None => 0,
        }
    }

    // === Parameter changes (each clears the cache) ===

    pub fn method(&self) -> ScalingMethod {
        self.state.lock().config.method
    }

    pub fn set_method(&self, method: ScalingMethod) {
        let mut state = self.state.lock();
        if state.config.method != method {
            info!("scaling method {} -> {}", state.config.method, method);
            state.config.method = method;
            state.reset_cache();
        }
    }

    pub fn set_reference_distance(&self, reference_distance: f64) {
        if !(reference_distance > 0.0 && reference_distance.is_finite()) {
            warn!("ignoring invalid reference distance {}", reference_distance);
            return;
        }
        let mut state = self.state.lock();
        state.config.reference_distance = reference_distance;
        state.reset_cache();
    }

    pub fn set_scale_limits(&self, min_scale: f64, max_scale: f64) {
        if !(min_scale > 0.0 && min_scale <= max_scale && max_scale.is_finite()) {
            warn!("ignoring invalid scale limits [{}, {}]", min_scale, max_scale);
            return;
        }
        let mut state = self.state.lock();
        state.config.min_scale = min_scale;
        state.config.max_scale = max_scale;
        state.reset_cache();
    }

    pub fn set_exponent(&self, exponent: f64) {
        if !(exponent > 0.0 && exponent.is_finite()) {
            warn!("ignoring invalid scaling exponent {}", exponent);
            return;
        }
        let mut state = self.state.lock();
        state.config.exponent = exponent;
        state.reset_cache();
    }

    /// Install the curve used by [`ScalingMethod::Custom`].
    pub fn set_custom_curve(&self, curve: CustomCurve) {
        let mut state = self.state.lock();
        state.custom_curve = Some(curve);
        state.reset_cache();
    }

    // === Cache ===

    /// Empty the cache and reset hit/lookup counters.
    pub fn clear(&self) {
        self.state.lock().reset_cache();
    }

    pub fn stats(&self) -> ScaleStats {
        let state = self.state.lock();
        ScaleStats {
            cache_size: state.cache.len(),
            cache_hits: state.cache_hits,
            cache_lookups: state.cache_lookups,
            evictions: state.evictions,
            method: state.config.method,
        }
    }

    /// Gate against recomputing for imperceptible movement.
    pub fn should_update(&self, old_distance: f64, new_distance: f64) -> bool {
        let threshold = self.state.lock().config.update_threshold;
        should_update(old_distance, new_distance, threshold)
    }
}

impl Default for ScaleEngine {
    fn default() -> Self {
        Self {
            state: Mutex::new(ScaleState {
                config: ScaleConfig::default(),
                custom_curve: None,
                cache: HashMap::new(),
                cache_hits: 0,
                cache_lookups: 0,
                evictions: 0,
            }),
            registry: None,
            safety: None,
        }
    }
}

/// Step `current` toward `target` by `clamp(delta_secs * speed, 0, 1)` of the gap.
///
/// Values already within [`SCALE_EPSILON`] snap to the target.
pub fn smooth_transition(current: f64, target: f64, delta_secs: f64, speed: f64) -> f64 {
    if (current - target).abs() < SCALE_EPSILON {
        return target;
    }
    let alpha = (delta_secs * speed).clamp(0.0, 1.0);
    current + (target - current) * alpha
}

/// True if the relative change from `old_distance` reaches `threshold`.
///
/// Any non-positive distance forces an update.
pub fn should_update(old_distance: f64, new_distance: f64, threshold: f64) -> bool {
    if old_distance <= 0.0 || new_distance <= 0.0 {
        return true;
    }
    (new_distance - old_distance).abs() / old_distance >= threshold
}
