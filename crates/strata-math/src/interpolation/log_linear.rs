//! Log-linear interpolation.

use crate::error::{MathError, MathResult};
use crate::interpolation::{locate_interval, validate_knots, Interpolator};

/// Log-linear interpolation over discount-factor knots.
///
/// Interpolates linearly on `ln(y)`, which for discount factors is
/// equivalent to piecewise-constant forward rates between knots. This is
/// the workhorse method for bootstrapped discount curves.
///
/// # Example
///
/// ```rust
/// use strata_math::interpolation::{Interpolator, LogLinear};
///
/// let knots = vec![(0.0, 1.0), (1.0, 0.95), (2.0, 0.90)];
/// let interp = LogLinear::fit(&knots).unwrap();
///
/// let df = interp.value_at(1.5).unwrap();
/// assert!(df < 0.95 && df > 0.90);
/// ```
#[derive(Debug, Clone)]
pub struct LogLinear {
    xs: Vec<f64>,
    log_ys: Vec<f64>,
}

impl LogLinear {
    /// Fits the interpolator over the knot set.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than 2 knots, x values are not
    /// strictly increasing, or any y value is non-positive.
    pub fn fit(knots: &[(f64, f64)]) -> MathResult<Self> {
        validate_knots(knots, 2, true)?;

        Ok(Self {
            xs: knots.iter().map(|&(x, _)| x).collect(),
            log_ys: knots.iter().map(|&(_, y)| y.ln()).collect(),
        })
    }
}

impl Interpolator for LogLinear {
    fn value_at(&self, x: f64) -> MathResult<f64> {
        let last = self.xs.len() - 1;
        if x < self.xs[0] || x > self.xs[last] {
            return Err(MathError::ExtrapolationNotAllowed {
                x,
                min: self.xs[0],
                max: self.xs[last],
            });
        }
        if x == self.xs[0] {
            return Ok(self.log_ys[0].exp());
        }

        let i = locate_interval(&self.xs, x);
        let w = (x - self.xs[i - 1]) / (self.xs[i] - self.xs[i - 1]);
        let log_y = self.log_ys[i - 1] + w * (self.log_ys[i] - self.log_ys[i - 1]);

        Ok(log_y.exp())
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
}
