//! Scaling laws mapping a normalized distance to a raw scale factor.

use std::fmt;
use std::sync::Arc;

/// Selectable scaling law.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScalingMethod {
    /// `1 / d`
    Linear,
    /// `(1 / d) ^ exponent`
    #[default]
    InverseSquare,
    /// `1 / log_base(d)` beyond the reference distance, max scale at or inside it.
    Logarithmic,
    /// Host-supplied curve; behaves like `Linear` until one is installed.
    Custom,
}

impl ScalingMethod {
    pub const ALL: [ScalingMethod; 4] = [
        ScalingMethod::Linear,
        ScalingMethod::InverseSquare,
        ScalingMethod::Logarithmic,
        ScalingMethod::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScalingMethod::Linear => "Linear",
            ScalingMethod::InverseSquare => "Inverse square",
            ScalingMethod::Logarithmic => "Logarithmic",
            ScalingMethod::Custom => "Custom",
        }
    }
}

impl fmt::Display for ScalingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Curve installed for [`ScalingMethod::Custom`]; receives the normalized distance.
pub type CustomCurve = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Parameters a scaling law reads besides the distance itself.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LawParams {
    pub exponent: f64,
    pub log_base: f64,
    pub max_scale: f64,
}

/// Unclamped scale for `normalized = distance / reference`.
pub(crate) fn raw_scale(
    method: ScalingMethod,
    normalized: f64,
    params: LawParams,
    custom: Option<&CustomCurve>,
) -> f64 {
    match method {
        ScalingMethod::Linear => 1.0 / normalized,
        ScalingMethod::InverseSquare => (1.0 / normalized).powf(params.exponent),
        ScalingMethod::Logarithmic => {
            // At or inside the reference distance the curve is pinned to the cap.
            if normalized <= 1.0 {
                params.max_scale
            } else {
                1.0 / normalized.log(params.log_base)
            }
        }
        ScalingMethod::Custom => match custom {
            Some(curve) => curve(normalized),
            None => 1.0 / normalized,
        },
    }
}
