//! Discount curve data model.
//!
//! A [`Curve`] owns an ordered set of date / discount-factor nodes partitioned
//! into interpolation segments. The bootstrap mutates node values in place and
//! queries discount factors between mutations, so node mutation triggers a
//! targeted re-fit of only the segments whose knot span contains the changed
//! date.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use strata_core::calendars::Calendar;
use strata_core::daycounts::DayCountConvention;
use strata_core::Date;
use strata_math::interpolation::Interpolator;

use crate::error::{CurveError, CurveResult};
use crate::interpolation::InterpolationMethod;

const TIME_EPS: f64 = 1e-9;

/// A curve node: a date and its discount factor (or pre-transformed value
/// while a solver is running).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// The node date.
    pub date: Date,
    /// The node value.
    pub value: f64,
}

impl Node {
    /// Creates a new node.
    #[must_use]
    pub fn new(date: Date, value: f64) -> Self {
        Self { date, value }
    }
}

/// Specification of one interpolation segment.
///
/// Segments are consulted in order; the first whose cutoff is on or after the
/// query date handles it. A `None` cutoff is the open-ended sentinel and is
/// only valid on the last segment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SegmentSpec {
    /// Last date handled by this segment; `None` for the open-ended tail.
    pub cutoff: Option<Date>,
    /// Interpolation method for this segment.
    pub method: InterpolationMethod,
}

impl SegmentSpec {
    /// Creates a segment covering dates up to and including `cutoff`.
    #[must_use]
    pub fn until(cutoff: Date, method: InterpolationMethod) -> Self {
        Self {
            cutoff: Some(cutoff),
            method,
        }
    }

    /// Creates the open-ended tail segment.
    #[must_use]
    pub fn open(method: InterpolationMethod) -> Self {
        Self {
            cutoff: None,
            method,
        }
    }
}

/// A fitted segment: the spec plus the interpolator over its knot span.
#[derive(Debug)]
struct FittedSegment {
    spec: SegmentSpec,
    /// Cutoff as a day-count fraction; infinity for the open tail.
    cutoff_time: f64,
    /// First knot index covered (inclusive).
    knot_lo: usize,
    /// Last knot index covered (inclusive).
    knot_hi: usize,
    interp: Box<dyn Interpolator>,
}

/// An ordered set of date / discount-factor nodes with segment-wise
/// interpolation.
///
/// The synthetic knot `(valuation_date, 1.0)` is always prepended to every
/// segment fit, and `df(valuation_date)` is exactly 1. Node dates are strictly
/// increasing and strictly after the valuation date.
///
/// # Example
///
/// ```rust
/// use strata_core::daycounts::DayCountConvention;
/// use strata_core::Date;
/// use strata_curves::{Curve, InterpolationMethod, Node, SegmentSpec};
///
/// let valuation = Date::from_ymd(2025, 1, 15).unwrap();
/// let nodes = vec![
///     Node::new(Date::from_ymd(2026, 1, 15).unwrap(), 0.97),
///     Node::new(Date::from_ymd(2027, 1, 15).unwrap(), 0.93),
/// ];
/// let curve = Curve::new(
///     valuation,
///     nodes,
///     vec![SegmentSpec::open(InterpolationMethod::LogLinear)],
///     DayCountConvention::Act365Fixed,
///     None,
/// )
/// .unwrap();
///
/// assert_eq!(curve.df(valuation).unwrap(), 1.0);
/// ```
pub struct Curve {
    valuation_date: Date,
    day_count: DayCountConvention,
    calendar: Option<Arc<dyn Calendar>>,
    nodes: Vec<Node>,
    /// Day-count fraction of each node from the valuation date.
    node_times: Vec<f64>,
    /// Business-day grid as day-count fractions; built once per curve
    /// lifetime, only when a segment compounds per business day.
    business_days: Vec<f64>,
    segments: Vec<FittedSegment>,
}

impl Curve {
    /// Builds a curve from nodes and segment specifications.
    ///
    /// # Errors
    ///
    /// Returns `CurveError::InvalidCurve` if the nodes are unordered or not
    /// strictly after the valuation date, if the segment cutoffs do not
    /// partition the node span, or if a segment needs a calendar the curve
    /// does not have.
    pub fn new(
        valuation_date: Date,
        nodes: Vec<Node>,
        segments: Vec<SegmentSpec>,
        day_count: DayCountConvention,
        calendar: Option<Arc<dyn Calendar>>,
    ) -> CurveResult<Self> {
        if nodes.is_empty() {
            return Err(CurveError::invalid_curve("curve needs at least one node"));
        }
        if segments.is_empty() {
            return Err(CurveError::invalid_curve(
                "curve needs at least one interpolation segment",
            ));
        }

        for (i, node) in nodes.iter().enumerate() {
            if node.date <= valuation_date {
                return Err(CurveError::invalid_curve(format!(
                    "node {} is not after the valuation date {}",
                    node.date, valuation_date
                )));
            }
            if i > 0 && node.date <= nodes[i - 1].date {
                return Err(CurveError::invalid_curve(format!(
                    "node dates must be strictly increasing at {}",
                    node.date
                )));
            }
        }

        let needs_bd = segments.iter().any(|s| s.method.needs_business_days());
        if needs_bd && calendar.is_none() {
            return Err(CurveError::invalid_curve(
                "business-day compounded segment requires a calendar",
            ));
        }

        let node_times: Vec<f64> = nodes
            .iter()
            .map(|n| day_count.year_fraction_f64(valuation_date, n.date))
            .collect();

        let business_days = if needs_bd {
            let cal = calendar.as_ref().expect("checked above");
            let last = nodes[nodes.len() - 1].date;
            cal.business_day_series(valuation_date, last)
                .into_iter()
                .map(|d| day_count.year_fraction_f64(valuation_date, d))
                .collect()
        } else {
            Vec::new()
        };

        let mut curve = Self {
            valuation_date,
            day_count,
            calendar,
            nodes,
            node_times,
            business_days,
            segments: Vec::new(),
        };
        curve.fit_segments(&segments)?;

        Ok(curve)
    }

    /// Lays out the segment knot spans and fits every interpolator.
    fn fit_segments(&mut self, specs: &[SegmentSpec]) -> CurveResult<()> {
        let knots = self.knots();
        let last_knot = knots.len() - 1;
        let mut fitted = Vec::with_capacity(specs.len());
        let mut prev_time = 0.0_f64;

        for (k, spec) in specs.iter().enumerate() {
            let is_last = k == specs.len() - 1;

            let cutoff_time = match spec.cutoff {
                None => {
                    if !is_last {
                        return Err(CurveError::invalid_curve(
                            "open-ended segment must be the last segment",
                        ));
                    }
                    f64::INFINITY
                }
                Some(cutoff) => {
                    let t = self
                        .day_count
                        .year_fraction_f64(self.valuation_date, cutoff);
                    if t <= prev_time + TIME_EPS {
                        return Err(CurveError::invalid_curve(format!(
                            "segment cutoffs must be strictly increasing at {cutoff}"
                        )));
                    }
                    t
                }
            };

            // Boundary knots are shared between adjacent segments so the
            // partition has no gaps
            let knot_lo = knots
                .iter()
                .rposition(|&(x, _)| x <= prev_time + TIME_EPS)
                .unwrap_or(0);
            let knot_hi = if cutoff_time.is_infinite() {
                last_knot
            } else {
                knots
                    .iter()
                    .position(|&(x, _)| x >= cutoff_time - TIME_EPS)
                    .ok_or_else(|| {
                        CurveError::invalid_curve(format!(
                            "segment cutoff at t = {cutoff_time:.4} lies beyond the last node"
                        ))
                    })?
            };

            if knot_hi <= knot_lo {
                return Err(CurveError::invalid_curve(format!(
                    "segment {k} spans fewer than two knots"
                )));
            }

            let interp = spec
                .method
                .fit(&knots[knot_lo..=knot_hi], &self.business_days)?;

            fitted.push(FittedSegment {
                spec: *spec,
                cutoff_time,
                knot_lo,
                knot_hi,
                interp,
            });
            prev_time = cutoff_time;
        }

        if fitted[fitted.len() - 1].knot_hi != last_knot {
            return Err(CurveError::invalid_curve(
                "segments do not cover the full node span",
            ));
        }

        self.segments = fitted;
        Ok(())
    }

    /// The full knot set: the synthetic unit knot plus every node.
    fn knots(&self) -> Vec<(f64, f64)> {
        let mut knots = Vec::with_capacity(self.nodes.len() + 1);
        knots.push((0.0, 1.0));
        knots.extend(
            self.node_times
                .iter()
                .zip(&self.nodes)
                .map(|(&t, n)| (t, n.value)),
        );
        knots
    }

    /// Returns the discount factor at the given date.
    ///
    /// Exactly 1 at the valuation date; an error before it. Queries beyond
    /// the last node are served only by interpolators that extrapolate
    /// (monotone convex, flat-forward).
    ///
    /// # Errors
    ///
    /// `CurveError::QueryBeforeValuation` before the valuation date;
    /// extrapolation errors from the owning segment's interpolator.
    pub fn df(&self, date: Date) -> CurveResult<f64> {
        if date == self.valuation_date {
            return Ok(1.0);
        }
        if date < self.valuation_date {
            return Err(CurveError::QueryBeforeValuation {
                date,
                valuation_date: self.valuation_date,
            });
        }

        let x = self.dcf_from_valuation(date);
        let segment = self
            .segments
            .iter()
            .find(|s| x <= s.cutoff_time + TIME_EPS)
            .unwrap_or_else(|| &self.segments[self.segments.len() - 1]);

        Ok(segment.interp.value_at(x)?)
    }

    /// Simple forward rate between two dates:
    /// `(df(d1) / df(d2) - 1) / dcf(d1, d2)`.
    ///
    /// # Errors
    ///
    /// Returns an error if `d2 <= d1` or either discount factor query fails.
    pub fn forward_rate(&self, d1: Date, d2: Date) -> CurveResult<f64> {
        if d2 <= d1 {
            return Err(CurveError::invalid_curve(format!(
                "forward_rate requires d2 > d1, got {d1} and {d2}"
            )));
        }

        let df1 = self.df(d1)?;
        let df2 = self.df(d2)?;
        let tau = self.day_count.year_fraction_f64(d1, d2);

        Ok((df1 / df2 - 1.0) / tau)
    }

    /// Continuously-compounded zero rate at the given date.
    ///
    /// # Errors
    ///
    /// Returns an error at or before the valuation date.
    pub fn zero_rate(&self, date: Date) -> CurveResult<f64> {
        if date <= self.valuation_date {
            return Err(CurveError::QueryBeforeValuation {
                date,
                valuation_date: self.valuation_date,
            });
        }

        let t = self.dcf_from_valuation(date);
        let df = self.df(date)?;

        Ok(-df.ln() / t)
    }

    /// Replaces the value of the node at `date` and re-fits only the segments
    /// whose knot span contains it.
    ///
    /// # Errors
    ///
    /// Returns `CurveError::NodeNotFound` if no node matches the date; this
    /// method never inserts.
    pub fn update_node(&mut self, date: Date, value: f64) -> CurveResult<()> {
        let idx = self
            .nodes
            .iter()
            .position(|n| n.date == date)
            .ok_or(CurveError::NodeNotFound { date })?;

        self.nodes[idx].value = value;

        let knot_idx = idx + 1;
        let knots = self.knots();
        for segment in &mut self.segments {
            if segment.knot_lo <= knot_idx && knot_idx <= segment.knot_hi {
                segment
                    .interp
                    .update(&knots[segment.knot_lo..=segment.knot_hi])?;
            }
        }

        Ok(())
    }

    /// Bulk-updates every node from a log-parametrized vector:
    /// `value_i = exp(log_values[i])`.
    ///
    /// Used by the least-squares fitters, which work in log space to keep
    /// the values positive.
    ///
    /// # Errors
    ///
    /// Returns `CurveError::NodeCountMismatch` if the vector length differs
    /// from the node count.
    pub fn update_nodes(&mut self, log_values: &[f64]) -> CurveResult<()> {
        if log_values.len() != self.nodes.len() {
            return Err(CurveError::NodeCountMismatch {
                expected: self.nodes.len(),
                actual: log_values.len(),
            });
        }

        for (node, &lv) in self.nodes.iter_mut().zip(log_values) {
            node.value = lv.exp();
        }

        let knots = self.knots();
        for segment in &mut self.segments {
            segment
                .interp
                .update(&knots[segment.knot_lo..=segment.knot_hi])?;
        }

        Ok(())
    }

    /// Day-count fraction from the valuation date to `date`.
    #[must_use]
    pub fn dcf_from_valuation(&self, date: Date) -> f64 {
        self.day_count.year_fraction_f64(self.valuation_date, date)
    }

    /// The curve's valuation date.
    #[must_use]
    pub fn valuation_date(&self) -> Date {
        self.valuation_date
    }

    /// The curve's day count convention.
    #[must_use]
    pub fn day_count(&self) -> DayCountConvention {
        self.day_count
    }

    /// The curve's calendar, if any.
    #[must_use]
    pub fn calendar(&self) -> Option<&Arc<dyn Calendar>> {
        self.calendar.as_ref()
    }

    /// The curve nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The node dates.
    #[must_use]
    pub fn node_dates(&self) -> Vec<Date> {
        self.nodes.iter().map(|n| n.date).collect()
    }

    /// Day-count fractions of the nodes from the valuation date.
    #[must_use]
    pub fn node_times(&self) -> &[f64] {
        &self.node_times
    }

    /// The last node date.
    #[must_use]
    pub fn last_node_date(&self) -> Date {
        self.nodes[self.nodes.len() - 1].date
    }

    fn segment_specs(&self) -> Vec<SegmentSpec> {
        self.segments.iter().map(|s| s.spec).collect()
    }

    /// An independent copy of this curve in its current state.
    ///
    /// Downstream consumers (spread fitting, pricing) take a snapshot as
    /// their immutable base so later re-calibration of this curve cannot
    /// reach them.
    ///
    /// # Errors
    ///
    /// Propagates re-fitting failures.
    pub fn snapshot(&self) -> CurveResult<Curve> {
        Curve::new(
            self.valuation_date,
            self.nodes.clone(),
            self.segment_specs(),
            self.day_count,
            self.calendar.clone(),
        )
    }
}

impl fmt::Debug for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Curve")
            .field("valuation_date", &self.valuation_date)
            .field("day_count", &self.day_count)
            .field("nodes", &self.nodes)
            .field("segments", &self.segment_specs())
            .finish()
    }
}
