//! Interpolation method selection for curve segments.

use serde::{Deserialize, Serialize};
use std::fmt;

use strata_math::interpolation::{
    FlatRate, FlatRateBD, Interpolator, Linear, LogCubic, LogLinear, MonotoneConvex,
};
use strata_math::MathResult;

/// Interpolation method for a curve segment.
///
/// # Choosing a Method
///
/// | Method | On | Positive Forwards | Use Case |
/// |--------|----|-------------------|----------|
/// | Linear | value | No | Spread multipliers |
/// | LogLinear | ln(df) | Yes | Bootstrapped discount curves |
/// | LogCubic | ln(df) | No | Smooth curves |
/// | MonotoneConvex | forwards | **Yes** | **Production default** |
/// | FlatRate | period rate | Yes | Short-end money market segments |
/// | FlatRateBD | period rate | Yes | O/N-compounded short ends |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InterpolationMethod {
    /// Linear on the raw node values.
    Linear,
    /// Linear on log values (piecewise-constant forwards).
    LogLinear,
    /// Natural cubic spline on log values.
    LogCubic,
    /// Hagan-West monotone convex on forwards.
    #[default]
    MonotoneConvex,
    /// Constant simple period rate per interval.
    FlatRate,
    /// Constant per-business-day compounded rate per interval.
    FlatRateBD,
}

impl InterpolationMethod {
    /// Fits an interpolator of this method over the knot set.
    ///
    /// `business_days` is the curve's business-day grid (day-count fractions
    /// from the valuation date); only [`InterpolationMethod::FlatRateBD`]
    /// reads it.
    ///
    /// # Errors
    ///
    /// Propagates knot validation and fitting errors from the math layer.
    pub fn fit(
        self,
        knots: &[(f64, f64)],
        business_days: &[f64],
    ) -> MathResult<Box<dyn Interpolator>> {
        Ok(match self {
            InterpolationMethod::Linear => Box::new(Linear::fit(knots)?),
            InterpolationMethod::LogLinear => Box::new(LogLinear::fit(knots)?),
            InterpolationMethod::LogCubic => Box::new(LogCubic::fit(knots)?),
            InterpolationMethod::MonotoneConvex => Box::new(MonotoneConvex::fit(knots)?),
            InterpolationMethod::FlatRate => Box::new(FlatRate::fit(knots)?),
            InterpolationMethod::FlatRateBD => Box::new(FlatRateBD::fit(knots, business_days)?),
        })
    }

    /// Returns true if this method needs the curve's business-day grid.
    #[must_use]
    pub fn needs_business_days(self) -> bool {
        matches!(self, InterpolationMethod::FlatRateBD)
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterpolationMethod::Linear => "Linear",
            InterpolationMethod::LogLinear => "LogLinear",
            InterpolationMethod::LogCubic => "LogCubic",
            InterpolationMethod::MonotoneConvex => "MonotoneConvex",
            InterpolationMethod::FlatRate => "FlatRate",
            InterpolationMethod::FlatRateBD => "FlatRateBD",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_dispatch() {
        let knots = vec![(0.0, 1.0), (1.0, 0.97), (2.0, 0.93)];

        for method in [
            InterpolationMethod::Linear,
            InterpolationMethod::LogLinear,
            InterpolationMethod::LogCubic,
            InterpolationMethod::MonotoneConvex,
            InterpolationMethod::FlatRate,
        ] {
            let interp = method.fit(&knots, &[]).unwrap();
            let v = interp.value_at(1.0).unwrap();
            assert!((v - 0.97).abs() < 1e-10, "{method} missed a knot: {v}");
        }
    }

    #[test]
    fn test_flat_rate_bd_uses_grid() {
        let day = 1.0 / 252.0;
        let grid: Vec<f64> = (1..=30).map(|i| i as f64 * day).collect();
        let knots = vec![(0.0, 1.0), (20.0 * day, 0.998)];

        let interp = InterpolationMethod::FlatRateBD.fit(&knots, &grid).unwrap();
        let v = interp.value_at(20.0 * day).unwrap();
        assert!((v - 0.998).abs() < 1e-10);
    }
}
