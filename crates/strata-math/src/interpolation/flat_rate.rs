//! Flat period-rate interpolation.
//!
//! Both methods here express the discount factor between two knots through a
//! single constant period rate. [`FlatRate`] accrues it simply over the whole
//! interval (closed form); [`FlatRateBD`] compounds it once per business day,
//! which has no closed form and is solved by Newton's method.

use crate::error::{MathError, MathResult};
use crate::interpolation::{locate_interval, validate_knots, Interpolator};
use crate::solvers::{newton_raphson, SolverConfig};

/// Flat simple period rate per knot interval.
///
/// For each interval the rate `r` solves
/// `y_i = y_{i-1} / (1 + r * (x_i - x_{i-1}))` in closed form, and queries
/// accrue it linearly from the interval start.
#[derive(Debug, Clone)]
pub struct FlatRate {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Solved period rate per interval; `rates[i - 1]` covers `(x_{i-1}, x_i]`.
    rates: Vec<f64>,
}

impl FlatRate {
    /// Fits the interpolator over the knot set.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than 2 knots, x values are not
    /// strictly increasing, or any y value is non-positive.
    pub fn fit(knots: &[(f64, f64)]) -> MathResult<Self> {
        validate_knots(knots, 2, true)?;

        let xs: Vec<f64> = knots.iter().map(|&(x, _)| x).collect();
        let ys: Vec<f64> = knots.iter().map(|&(_, y)| y).collect();

        let rates = (1..xs.len())
            .map(|i| (ys[i - 1] / ys[i] - 1.0) / (xs[i] - xs[i - 1]))
            .collect();

        Ok(Self { xs, ys, rates })
    }

    /// Returns the solved period rate for the interval ending at knot `i`.
    #[must_use]
    pub fn period_rate(&self, i: usize) -> f64 {
        self.rates[i - 1]
    }
}

impl Interpolator for FlatRate {
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
            return Ok(self.ys[0]);
        }

        let i = locate_interval(&self.xs, x);
        let accrual = 1.0 + self.rates[i - 1] * (x - self.xs[i - 1]);

        Ok(self.ys[i - 1] / accrual)
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

/// Flat per-business-day compounded rate per knot interval.
///
/// Each interval `(x_{i-1}, x_i]` is decomposed into its business-day
/// sub-periods (against the grid supplied by the owning curve) and the single
/// rate `r` solves
///
/// ```text
/// prod_j (1 + r * dcf_j) = y_{i-1} / y_i
/// ```
///
/// by Newton's method seeded at the continuously-compounded equivalent rate.
/// Solved rates are cached per knot pair; [`Interpolator::update`] re-solves
/// only the intervals whose endpoint values changed, which is what keeps the
/// per-node bootstrap refit cheap.
#[derive(Debug, Clone)]
pub struct FlatRateBD {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Business-day positions as day-count fractions from the valuation date.
    grid: Vec<f64>,
    /// Solved period rate per interval; `rates[i - 1]` covers `(x_{i-1}, x_i]`.
    rates: Vec<f64>,
}

impl FlatRateBD {
    /// Fits the interpolator over the knot set against a business-day grid.
    ///
    /// # Errors
    ///
    /// Returns an error if the knots are invalid or a period rate fails to
    /// converge.
    pub fn fit(knots: &[(f64, f64)], grid: &[f64]) -> MathResult<Self> {
        validate_knots(knots, 2, true)?;

        let xs: Vec<f64> = knots.iter().map(|&(x, _)| x).collect();
        let ys: Vec<f64> = knots.iter().map(|&(_, y)| y).collect();

        let mut rates = Vec::with_capacity(xs.len() - 1);
        for i in 1..xs.len() {
            rates.push(Self::solve_period_rate(
                xs[i - 1],
                xs[i],
                ys[i - 1] / ys[i],
                grid,
            )?);
        }

        Ok(Self {
            xs,
            ys,
            grid: grid.to_vec(),
            rates,
        })
    }

    /// Returns the solved period rate for the interval ending at knot `i`.
    #[must_use]
    pub fn period_rate(&self, i: usize) -> f64 {
        self.rates[i - 1]
    }

    /// Sub-period day-count fractions for `(from, to]` against the grid.
    fn sub_periods(from: f64, to: f64, grid: &[f64]) -> Vec<f64> {
        let mut boundaries = vec![from];
        for &g in grid {
            if g > from + 1e-12 && g < to - 1e-12 {
                boundaries.push(g);
            }
        }
        boundaries.push(to);

        boundaries.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Solves `prod (1 + r * d_j) = target` for the constant rate `r`.
    fn solve_period_rate(from: f64, to: f64, target: f64, grid: &[f64]) -> MathResult<f64> {
        let periods = Self::sub_periods(from, to, grid);
        let total: f64 = periods.iter().sum();

        if total <= 0.0 {
            return Err(MathError::invalid_input(format!(
                "empty accrual period between {from} and {to}"
            )));
        }

        let f = |r: f64| {
            periods.iter().map(|&d| 1.0 + r * d).product::<f64>() - target
        };
        let df = |r: f64| {
            let product: f64 = periods.iter().map(|&d| 1.0 + r * d).product();
            let sum: f64 = periods.iter().map(|&d| d / (1.0 + r * d)).sum();
            product * sum
        };

        // Continuously-compounded equivalent as the seed
        let seed = target.ln() / total;
        let result = newton_raphson(f, df, seed, &SolverConfig::new(1e-14, 50))?;

        Ok(result.root)
    }

    /// Compounds the interval rate from the interval start up to `x`.
    fn accrue(&self, i: usize, x: f64) -> f64 {
        let rate = self.rates[i - 1];
        let mut boundaries = vec![self.xs[i - 1]];
        for &g in &self.grid {
            if g > self.xs[i - 1] + 1e-12 && g < x - 1e-12 {
                boundaries.push(g);
            }
        }
        boundaries.push(x);

        boundaries
            .windows(2)
            .map(|w| 1.0 + rate * (w[1] - w[0]))
            .product()
    }
}

impl Interpolator for FlatRateBD {
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
            return Ok(self.ys[0]);
        }

        let i = locate_interval(&self.xs, x);
        Ok(self.ys[i - 1] / self.accrue(i, x))
    }

    fn update(&mut self, knots: &[(f64, f64)]) -> MathResult<()> {
        let same_grid = knots.len() == self.xs.len()
            && knots
                .iter()
                .zip(&self.xs)
                .all(|(&(x, _), &old_x)| x == old_x);

        if !same_grid {
            *self = Self::fit(knots, &self.grid)?;
            return Ok(());
        }

        // Re-solve only the intervals whose endpoint values changed; the rest
        // keep their cached rates
        let new_ys: Vec<f64> = knots.iter().map(|&(_, y)| y).collect();
        validate_knots(knots, 2, true)?;

        for i in 1..self.xs.len() {
            if new_ys[i - 1] != self.ys[i - 1] || new_ys[i] != self.ys[i] {
                self.rates[i - 1] = Self::solve_period_rate(
                    self.xs[i - 1],
                    self.xs[i],
                    new_ys[i - 1] / new_ys[i],
                    &self.grid,
                )?;
            }
        }
        self.ys = new_ys;

        Ok(())
    }

    fn min_x(&self) -> f64 {
        self.xs[0]
    }

    fn max_x(&self) -> f64 {
        self.xs[self.xs.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_rate_closed_form() {
        let knots = vec![(0.0, 1.0), (0.5, 0.99)];
        let interp = FlatRate::fit(&knots).unwrap();

        // r = (1/0.99 - 1) / 0.5
        let expected = (1.0 / 0.99 - 1.0) / 0.5;
        assert_relative_eq!(interp.period_rate(1), expected, epsilon = 1e-14);

        // Knot reproduction
        assert_relative_eq!(interp.value_at(0.5).unwrap(), 0.99, epsilon = 1e-14);

        // Halfway accrues half the period
        let mid = 1.0 / (1.0 + expected * 0.25);
        assert_relative_eq!(interp.value_at(0.25).unwrap(), mid, epsilon = 1e-14);
    }

    #[test]
    fn test_flat_rate_no_extrapolation() {
        let knots = vec![(0.0, 1.0), (1.0, 0.97)];
        let interp = FlatRate::fit(&knots).unwrap();
        assert!(interp.value_at(1.5).is_err());
    }

    /// Ten business days at 1/252 each; the solved rate must compound back to
    /// the target discount factor.
    #[test]
    fn test_flat_rate_bd_ten_day_period() {
        let day = 1.0 / 252.0;
        let grid: Vec<f64> = (1..=10).map(|i| i as f64 * day).collect();
        let knots = vec![(0.0, 1.0), (10.0 * day, 0.999)];

        let interp = FlatRateBD::fit(&knots, &grid).unwrap();
        let r = interp.period_rate(1);

        let compounded: f64 = (0..10).map(|_| 1.0 + r * day).product();
        assert_relative_eq!(compounded, 1.0 / 0.999, epsilon = 1e-10);

        // Knot reproduction through the accrual walk
        assert_relative_eq!(
            interp.value_at(10.0 * day).unwrap(),
            0.999,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_flat_rate_bd_mid_period_query() {
        let day = 1.0 / 252.0;
        let grid: Vec<f64> = (1..=10).map(|i| i as f64 * day).collect();
        let knots = vec![(0.0, 1.0), (10.0 * day, 0.999)];

        let interp = FlatRateBD::fit(&knots, &grid).unwrap();
        let r = interp.period_rate(1);

        // After 5 business days, exactly half the compounding has accrued
        let df = interp.value_at(5.0 * day).unwrap();
        let expected = 1.0 / (0..5).map(|_| 1.0 + r * day).product::<f64>();
        assert_relative_eq!(df, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_rate_bd_uneven_grid() {
        // A weekend gap: 3-calendar-day fraction between Friday and Monday
        let grid = vec![1.0 / 365.0, 2.0 / 365.0, 5.0 / 365.0, 6.0 / 365.0];
        let knots = vec![(0.0, 1.0), (6.0 / 365.0, 0.9995)];

        let interp = FlatRateBD::fit(&knots, &grid).unwrap();
        let r = interp.period_rate(1);

        let fractions = [1.0 / 365.0, 1.0 / 365.0, 3.0 / 365.0, 1.0 / 365.0];
        let compounded: f64 = fractions.iter().map(|&d| 1.0 + r * d).product();
        assert_relative_eq!(compounded, 1.0 / 0.9995, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_rate_bd_update_reuses_cache() {
        let day = 1.0 / 252.0;
        let grid: Vec<f64> = (1..=20).map(|i| i as f64 * day).collect();
        let knots = vec![(0.0, 1.0), (10.0 * day, 0.999), (20.0 * day, 0.9975)];

        let mut interp = FlatRateBD::fit(&knots, &grid).unwrap();
        let first_rate = interp.period_rate(1);

        // Change only the last knot: the first interval's rate is untouched
        let new_knots = vec![(0.0, 1.0), (10.0 * day, 0.999), (20.0 * day, 0.998)];
        interp.update(&new_knots).unwrap();

        assert_eq!(interp.period_rate(1), first_rate);
        assert_relative_eq!(
            interp.value_at(20.0 * day).unwrap(),
            0.998,
            epsilon = 1e-10
        );
    }
}
