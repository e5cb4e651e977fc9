//! Short-rate volatility curve for futures convexity.

use strata_core::daycounts::DayCountConvention;
use strata_core::Date;
use strata_math::interpolation::{Interpolator, RootMeanSquare};

use crate::curve::Node;
use crate::error::{CurveError, CurveResult};

/// A short-rate volatility curve.
///
/// Nodes are `(date, volatility)` pairs interpolated root-mean-square, so the
/// total variance `v(t)^2 * t` accumulates linearly between nodes. The
/// convexity calibration loop mutates nodes (replace or append) and the
/// futures pricers read the accumulated variance through
/// [`VolCurve::convexity_adjustment`].
#[derive(Debug, Clone)]
pub struct VolCurve {
    valuation_date: Date,
    day_count: DayCountConvention,
    nodes: Vec<Node>,
    interp: RootMeanSquare,
}

impl VolCurve {
    /// Builds a volatility curve from `(date, vol)` nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the nodes are empty, unordered, not strictly after
    /// the valuation date, or imply a negative forward variance.
    pub fn new(
        valuation_date: Date,
        nodes: Vec<Node>,
        day_count: DayCountConvention,
    ) -> CurveResult<Self> {
        if nodes.is_empty() {
            return Err(CurveError::invalid_curve(
                "volatility curve needs at least one node",
            ));
        }
        for (i, node) in nodes.iter().enumerate() {
            if node.date <= valuation_date {
                return Err(CurveError::invalid_curve(format!(
                    "volatility node {} is not after the valuation date",
                    node.date
                )));
            }
            if i > 0 && node.date <= nodes[i - 1].date {
                return Err(CurveError::invalid_curve(
                    "volatility node dates must be strictly increasing",
                ));
            }
        }

        let interp = Self::fit(valuation_date, &nodes, day_count)?;

        Ok(Self {
            valuation_date,
            day_count,
            nodes,
            interp,
        })
    }

    fn fit(
        valuation_date: Date,
        nodes: &[Node],
        day_count: DayCountConvention,
    ) -> CurveResult<RootMeanSquare> {
        let knots: Vec<(f64, f64)> = nodes
            .iter()
            .map(|n| {
                (
                    day_count.year_fraction_f64(valuation_date, n.date),
                    n.value,
                )
            })
            .collect();
        Ok(RootMeanSquare::fit(&knots)?)
    }

    /// Interpolated volatility at the given date.
    ///
    /// # Errors
    ///
    /// Returns an error for dates before the valuation date.
    pub fn vol(&self, date: Date) -> CurveResult<f64> {
        Ok(self.interp.value_at(self.dcf(date))?)
    }

    /// Total variance `v(t)^2 * t` accumulated to the given date.
    ///
    /// # Errors
    ///
    /// Returns an error for dates before the valuation date.
    pub fn variance(&self, date: Date) -> CurveResult<f64> {
        Ok(self.interp.variance_at(self.dcf(date))?)
    }

    /// Futures convexity adjustment for a contract expiring at `expiry` whose
    /// underlying period ends at `period_end`:
    /// `0.5 * W(expiry) * dcf(period_end)`.
    ///
    /// # Errors
    ///
    /// Returns an error for dates before the valuation date.
    pub fn convexity_adjustment(&self, expiry: Date, period_end: Date) -> CurveResult<f64> {
        let w = self.variance(expiry)?;
        Ok(0.5 * w * self.dcf(period_end))
    }

    /// Sets the volatility at `date`, replacing an existing node or inserting
    /// a new one in date order, and re-fits.
    ///
    /// Unlike discount-curve mutation, insertion is allowed here: the
    /// convexity loop grows the volatility curve one driving swap at a time.
    ///
    /// # Errors
    ///
    /// Returns an error if the date is not after the valuation date or the
    /// resulting curve implies negative forward variance.
    pub fn set_node(&mut self, date: Date, vol: f64) -> CurveResult<()> {
        if date <= self.valuation_date {
            return Err(CurveError::invalid_curve(format!(
                "volatility node {date} is not after the valuation date"
            )));
        }

        let mut nodes = self.nodes.clone();
        match nodes.iter().position(|n| n.date == date) {
            Some(i) => nodes[i].value = vol,
            None => {
                let i = nodes.partition_point(|n| n.date < date);
                nodes.insert(i, Node::new(date, vol));
            }
        }

        // Fit first so a rejected value leaves the curve untouched
        let interp = Self::fit(self.valuation_date, &nodes, self.day_count)?;
        self.nodes = nodes;
        self.interp = interp;
        Ok(())
    }

    /// The curve nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The valuation date.
    #[must_use]
    pub fn valuation_date(&self) -> Date {
        self.valuation_date
    }

    /// The last node date.
    #[must_use]
    pub fn last_node_date(&self) -> Date {
        self.nodes[self.nodes.len() - 1].date
    }

    /// Day-count fraction from the valuation date.
    #[must_use]
    pub fn dcf(&self, date: Date) -> f64 {
        self.day_count.year_fraction_f64(self.valuation_date, date)
    }
}
