//! Property-based tests for the scaling laws and cache.

use proptest::prelude::*;

use super::{ScaleEngine, ScalingMethod};
use crate::config::ScaleConfig;

fn engine_with(method: ScalingMethod) -> ScaleEngine {
    ScaleEngine::new(ScaleConfig {
        method,
        ..Default::default()
    })
    .expect("valid config")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The inverse-square law matches `clamp((r/d)^2, min, max)`.
    #[test]
    fn prop_inverse_square_matches_closed_form(
        ratio in 1.0e-3f64..1.0e3,
        reference in 1.0e4f64..1.0e9,
    ) {
        let engine = engine_with(ScalingMethod::InverseSquare);
        let config = engine.config();
        let distance = reference * ratio;

        let expected = (reference / distance).powi(2).clamp(config.min_scale, config.max_scale);
        let actual = engine.compute_scale_factor(distance, reference);

        let error = ((actual - expected) / expected).abs();
        prop_assert!(error < 1e-3, "d={} r={} got {} expected {}", distance, reference, actual, expected);
    }

    /// Scale never increases as distance grows.
    #[test]
    fn prop_scale_non_increasing_with_distance(
        method_index in 0usize..3,
        near_ratio in 1.0e-3f64..1.0e3,
        step in 1.01f64..10.0,
    ) {
        let method = [
            ScalingMethod::Linear,
            ScalingMethod::InverseSquare,
            ScalingMethod::Logarithmic,
        ][method_index];
        let engine = engine_with(method);
        let reference = engine.config().reference_distance;

        let near = engine.compute_scale_factor(reference * near_ratio, reference);
        let far = engine.compute_scale_factor(reference * near_ratio * step, reference);
        prop_assert!(far <= near, "{}: far {} > near {}", method, far, near);
    }

    /// Output always lies within the configured bounds.
    #[test]
    fn prop_scale_within_bounds(
        method_index in 0usize..4,
        distance in 1.0f64..1.0e15,
    ) {
        let engine = engine_with(ScalingMethod::ALL[method_index]);
        let config = engine.config();
        let scale = engine.scale_factor(distance);
        prop_assert!(scale >= config.min_scale && scale <= config.max_scale);
    }

    /// Distances in one bucket return bit-identical values.
    #[test]
    fn prop_same_bucket_bit_identical(
        bucket in 1i64..1_000_000,
        a in 0.0f64..1.0,
        b in 0.0f64..1.0,
    ) {
        let engine = engine_with(ScalingMethod::InverseSquare);
        let q = engine.config().quantization_factor;
        let base = bucket as f64 * q;
        let first = engine.scale_factor(base + a * q * 0.999);
        let second = engine.scale_factor(base + b * q * 0.999);
        prop_assert_eq!(first.to_bits(), second.to_bits());
    }

    /// A method change never lets a pre-change value through.
    #[test]
    fn prop_method_change_invalidates(ratio in 1.5f64..50.0) {
        let engine = engine_with(ScalingMethod::InverseSquare);
        let reference = engine.config().reference_distance;
        let distance = reference * ratio;

        let before = engine.compute_scale_factor(distance, reference);
        engine.set_method(ScalingMethod::Linear);
        let after = engine.compute_scale_factor(distance, reference);

        let linear = (1.0 / ratio).clamp(engine.config().min_scale, engine.config().max_scale);
        prop_assert!(((after - linear) / linear).abs() < 1e-9);
        prop_assert!(before < after);
    }
}
