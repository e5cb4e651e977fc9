//! Root-mean-square volatility interpolation.

use crate::error::{MathError, MathResult};
use crate::interpolation::{locate_interval, validate_knots, Interpolator};

/// Root-mean-square interpolation for volatility curves.
///
/// Knot values are volatilities; the quantity that accumulates linearly in
/// time between knots is the total variance `W(x) = v(x)^2 * x`. Queries
/// return `sqrt(W(x) / x)`, so the interpolated curve is the RMS of the
/// piecewise-constant forward volatility.
///
/// Queries before the first knot hold the first volatility flat; queries past
/// the last knot extrapolate the last interval's forward variance flat.
#[derive(Debug, Clone)]
pub struct RootMeanSquare {
    xs: Vec<f64>,
    vols: Vec<f64>,
    /// Total variance at each knot.
    cum_var: Vec<f64>,
}

impl RootMeanSquare {
    /// Fits the interpolator over `(x, volatility)` knots.
    ///
    /// A single knot is allowed (flat volatility).
    ///
    /// # Errors
    ///
    /// Returns an error if x values are not strictly increasing and positive,
    /// any volatility is negative, or the implied forward variance between
    /// two knots is negative.
    pub fn fit(knots: &[(f64, f64)]) -> MathResult<Self> {
        validate_knots(knots, 1, false)?;

        if knots[0].0 <= 0.0 {
            return Err(MathError::invalid_input(
                "volatility knots must have positive x",
            ));
        }
        for &(_, v) in knots {
            if v < 0.0 {
                return Err(MathError::invalid_input(format!(
                    "volatility must be non-negative, got {v}"
                )));
            }
        }

        let xs: Vec<f64> = knots.iter().map(|&(x, _)| x).collect();
        let vols: Vec<f64> = knots.iter().map(|&(_, v)| v).collect();
        let cum_var: Vec<f64> = xs.iter().zip(&vols).map(|(&x, &v)| v * v * x).collect();

        for i in 1..cum_var.len() {
            if cum_var[i] < cum_var[i - 1] {
                return Err(MathError::invalid_input(format!(
                    "negative forward variance between x = {} and x = {}",
                    xs[i - 1],
                    xs[i]
                )));
            }
        }

        Ok(Self { xs, vols, cum_var })
    }

    /// Total variance `v(x)^2 * x` at the query point.
    ///
    /// # Errors
    ///
    /// Returns an error for negative x.
    pub fn variance_at(&self, x: f64) -> MathResult<f64> {
        if x < 0.0 {
            return Err(MathError::invalid_input(format!(
                "variance query at negative x = {x}"
            )));
        }
        if x <= self.xs[0] {
            // Flat volatility before the first knot
            return Ok(self.vols[0] * self.vols[0] * x);
        }

        let last = self.xs.len() - 1;
        if x >= self.xs[last] {
            let fwd = self.terminal_forward_variance();
            return Ok(self.cum_var[last] + fwd * (x - self.xs[last]));
        }

        let i = locate_interval(&self.xs, x);
        let w = (x - self.xs[i - 1]) / (self.xs[i] - self.xs[i - 1]);
        Ok(self.cum_var[i - 1] + w * (self.cum_var[i] - self.cum_var[i - 1]))
    }

    /// Forward variance rate of the last interval (or the flat level for a
    /// single knot).
    fn terminal_forward_variance(&self) -> f64 {
        let last = self.xs.len() - 1;
        if last == 0 {
            return self.vols[0] * self.vols[0];
        }
        (self.cum_var[last] - self.cum_var[last - 1]) / (self.xs[last] - self.xs[last - 1])
    }
}

impl Interpolator for RootMeanSquare {
    fn value_at(&self, x: f64) -> MathResult<f64> {
        if x <= 0.0 {
            if x < 0.0 {
                return Err(MathError::invalid_input(format!(
                    "volatility query at negative x = {x}"
                )));
            }
            // Limit of sqrt(W(x)/x) as x -> 0
            return Ok(self.vols[0]);
        }

        let var = self.variance_at(x)?;
        Ok((var / x).sqrt())
    }

    fn update(&mut self, knots: &[(f64, f64)]) -> MathResult<()> {
        *self = Self::fit(knots)?;
        Ok(())
    }

    fn min_x(&self) -> f64 {
        self.xs[0]
    }

    fn max_x(&self) -> f64 {
        self.xs[self.xs.len() - 1]
    }

    fn allows_extrapolation(&self) -> bool {
        true
    }
}
