//! Single-curve bootstrap model.
//!
//! A [`RateCurveModel`] owns the curve it calibrates, the wrapped instruments,
//! and the node grouping. The group model drives it node by node: each call to
//! [`RateCurveModel::solve_node`] root-finds the node's discount factor so the
//! last non-excluded instrument at that node prices to zero, with earlier
//! nodes held fixed.

use std::cell::RefCell;
use std::sync::Arc;

use log::{debug, warn};

use strata_core::calendars::Calendar;
use strata_core::daycounts::DayCountConvention;
use strata_core::Date;
use strata_math::solvers::{brent, newton_raphson, SolverConfig};

use crate::calibration::convexity::ConvexityConfig;
use crate::calibration::instrument::{group_by_node, CurveInstrument};
use crate::curve::{Curve, Node, SegmentSpec};
use crate::error::{CurveError, CurveResult};
use crate::instruments::{InstrumentKind, PvContext};
use crate::volatility::VolCurve;

/// Per-node root-finding configuration.
#[derive(Debug, Clone, Copy)]
pub struct BootstrapConfig {
    /// Lower discount-factor bound of the solve bracket.
    pub df_lower: f64,
    /// Upper discount-factor bound of the solve bracket.
    pub df_upper: f64,
    /// Root-finding tolerance on the instrument PV.
    pub tolerance: f64,
    /// Residual below which an unbracketed bound value is accepted with a
    /// warning instead of failing.
    pub bound_tolerance: f64,
    /// Maximum root-finder iterations per node.
    pub max_iterations: u32,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            df_lower: 1e-4,
            df_upper: 1e2,
            tolerance: 1e-10,
            bound_tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

/// A single curve definition under calibration.
///
/// Owns the target [`Curve`], the ordered node dates (the distinct node dates
/// with at least one non-excluded instrument), and the node-to-instrument
/// mapping. Sibling curves (collateral discounting, FX/spread reference) are
/// referenced by name and resolved by the owning group at solve time, so the
/// model itself holds no shared mutable state.
#[derive(Debug)]
pub struct RateCurveModel {
    name: String,
    instruments: Vec<CurveInstrument>,
    segments: Vec<SegmentSpec>,
    day_count: DayCountConvention,
    discount_with: Option<String>,
    reference_to: Option<String>,
    vol: Option<VolCurve>,
    config: BootstrapConfig,
    convexity: ConvexityConfig,
    node_instruments: Vec<(Date, Vec<usize>)>,
    curve: Option<Curve>,
}

impl RateCurveModel {
    /// Creates a model from instruments and segment specifications.
    ///
    /// # Errors
    ///
    /// Returns an error if no instrument participates in the fit.
    pub fn new(
        name: impl Into<String>,
        instruments: Vec<CurveInstrument>,
        segments: Vec<SegmentSpec>,
        day_count: DayCountConvention,
    ) -> CurveResult<Self> {
        let node_instruments = group_by_node(&instruments);
        if node_instruments.is_empty() {
            return Err(CurveError::invalid_curve(
                "model has no non-excluded calibration instrument",
            ));
        }

        Ok(Self {
            name: name.into(),
            instruments,
            segments,
            day_count,
            discount_with: None,
            reference_to: None,
            vol: None,
            config: BootstrapConfig::default(),
            convexity: ConvexityConfig::default(),
            node_instruments,
            curve: None,
        })
    }

    /// Discounts this model's instruments on the named sibling curve.
    #[must_use]
    pub fn with_discount_curve(mut self, name: impl Into<String>) -> Self {
        self.discount_with = Some(name.into());
        self
    }

    /// Prices spread/FX instruments against the named sibling curve.
    #[must_use]
    pub fn with_reference_curve(mut self, name: impl Into<String>) -> Self {
        self.reference_to = Some(name.into());
        self
    }

    /// Attaches a short-rate volatility curve for futures convexity.
    #[must_use]
    pub fn with_vol_curve(mut self, vol: VolCurve) -> Self {
        self.vol = Some(vol);
        self
    }

    /// Overrides the solver configuration.
    #[must_use]
    pub fn with_config(mut self, config: BootstrapConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the convexity calibration configuration.
    #[must_use]
    pub fn with_convexity_config(mut self, config: ConvexityConfig) -> Self {
        self.convexity = config;
        self
    }

    /// The model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered calibration node dates.
    #[must_use]
    pub fn node_dates(&self) -> Vec<Date> {
        self.node_instruments.iter().map(|(d, _)| *d).collect()
    }

    /// True if this model calibrates a node at the date.
    #[must_use]
    pub fn has_node(&self, date: Date) -> bool {
        self.node_instruments.iter().any(|(d, _)| *d == date)
    }

    /// The wrapped instruments.
    #[must_use]
    pub fn instruments(&self) -> &[CurveInstrument] {
        &self.instruments
    }

    /// Name of the sibling curve used for discounting, if any.
    #[must_use]
    pub fn discount_curve_name(&self) -> Option<&str> {
        self.discount_with.as_deref()
    }

    /// Name of the sibling reference curve, if any.
    #[must_use]
    pub fn reference_curve_name(&self) -> Option<&str> {
        self.reference_to.as_deref()
    }

    /// The volatility curve, if any.
    #[must_use]
    pub fn vol_curve(&self) -> Option<&VolCurve> {
        self.vol.as_ref()
    }

    /// Mutable access to the volatility curve for the convexity loop.
    pub(crate) fn vol_curve_mut(&mut self) -> Option<&mut VolCurve> {
        self.vol.as_mut()
    }

    /// Convexity calibration configuration.
    #[must_use]
    pub fn convexity_config(&self) -> ConvexityConfig {
        self.convexity
    }

    /// The built curve.
    ///
    /// # Errors
    ///
    /// `CurveError::CurveNotBuilt` before [`RateCurveModel::reset`] runs.
    pub fn curve(&self) -> CurveResult<&Curve> {
        self.curve.as_ref().ok_or_else(|| CurveError::CurveNotBuilt {
            name: self.name.clone(),
        })
    }

    /// Indices of convexity-excluded swaps, ascending by end date.
    pub(crate) fn convexity_swap_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .instruments
            .iter()
            .enumerate()
            .filter(|(_, inst)| inst.is_excluded() && inst.kind() == InstrumentKind::Swap)
            .map(|(i, _)| i)
            .collect();
        indices.sort_by_key(|&i| self.instruments[i].instrument().end_date());
        indices
    }

    /// Rebuilds the curve skeleton: one node per calibration date, seeded at
    /// a flat 2% continuous discounting guess.
    ///
    /// Per-curve caches (node day-count fractions, the business-day grid) are
    /// rebuilt here, so a changed valuation date or calendar never leaks
    /// stale cached values.
    ///
    /// # Errors
    ///
    /// Propagates curve construction failures.
    pub fn reset(
        &mut self,
        valuation_date: Date,
        calendar: Option<Arc<dyn Calendar>>,
    ) -> CurveResult<()> {
        let nodes: Vec<Node> = self
            .node_instruments
            .iter()
            .map(|(d, _)| {
                let t = self.day_count.year_fraction_f64(valuation_date, *d);
                Node::new(*d, (-0.02 * t).exp())
            })
            .collect();

        self.curve = Some(Curve::new(
            valuation_date,
            nodes,
            self.segments.clone(),
            self.day_count,
            calendar,
        )?);

        Ok(())
    }

    /// Current node values, for group convergence snapshots.
    ///
    /// # Errors
    ///
    /// `CurveError::CurveNotBuilt` before the skeleton exists.
    pub fn node_values(&self) -> CurveResult<Vec<f64>> {
        Ok(self.curve()?.nodes().iter().map(|n| n.value).collect())
    }

    /// Solves the discount factor at one node so the last non-excluded
    /// instrument there prices to zero.
    ///
    /// Uses Newton's method when that instrument supplies an analytic node
    /// derivative and Brent's method otherwise, over the configured bracket.
    /// If the bracket does not straddle a root but the residual at a bound is
    /// within the bound tolerance, the bound value is accepted with a
    /// warning; otherwise the solve is a hard failure.
    ///
    /// # Errors
    ///
    /// `CurveError::NoInstrumentForNode` for an unknown or excluded-only
    /// node; `CurveError::Calibration` when no root is bracketed;
    /// propagated pricing failures.
    pub fn solve_node(
        &mut self,
        date: Date,
        discount: Option<&Curve>,
        reference: Option<&Curve>,
    ) -> CurveResult<()> {
        let members = self
            .node_instruments
            .iter()
            .find(|(d, _)| *d == date)
            .map(|(_, m)| m.clone())
            .ok_or(CurveError::NoInstrumentForNode { date })?;

        let solver_idx = members
            .iter()
            .copied()
            .rev()
            .find(|&i| !self.instruments[i].is_excluded())
            .ok_or(CurveError::NoInstrumentForNode { date })?;

        let config = self.config;
        let instrument = &self.instruments[solver_idx];
        let vol = self.vol.as_ref();
        let curve = self
            .curve
            .take()
            .ok_or_else(|| CurveError::CurveNotBuilt {
                name: self.name.clone(),
            })?;

        let guess = curve
            .nodes()
            .iter()
            .find(|n| n.date == date)
            .map_or(1.0, |n| n.value);

        let cell = RefCell::new(curve);
        let pending_err: RefCell<Option<CurveError>> = RefCell::new(None);

        let solved = (|| -> CurveResult<f64> {
            let mut eval = |value: f64| -> f64 {
                let mut curve = cell.borrow_mut();
                if let Err(e) = curve.update_node(date, value) {
                    *pending_err.borrow_mut() = Some(e);
                    return f64::NAN;
                }
                let ctx = PvContext {
                    curve: &*curve,
                    discount,
                    reference,
                    vol,
                };
                match instrument.pv(&ctx) {
                    Ok(pv) => pv,
                    Err(e) => {
                        *pending_err.borrow_mut() = Some(e);
                        f64::NAN
                    }
                }
            };

            let f_lo = eval(config.df_lower);
            let f_hi = eval(config.df_upper);
            if let Some(e) = pending_err.borrow_mut().take() {
                return Err(e);
            }

            if f_lo * f_hi > 0.0 {
                // No sign change: accept a bound whose residual is already
                // inside tolerance, otherwise this is a data error
                if f_hi.abs() <= config.bound_tolerance {
                    warn!(
                        "node {date}: accepting upper bound {} with residual {f_hi:.3e} (no bracketed root)",
                        config.df_upper
                    );
                    return Ok(config.df_upper);
                }
                if f_lo.abs() <= config.bound_tolerance {
                    warn!(
                        "node {date}: accepting lower bound {} with residual {f_lo:.3e} (no bracketed root)",
                        config.df_lower
                    );
                    return Ok(config.df_lower);
                }
                return Err(CurveError::calibration(format!(
                    "no root bracketed for node {date}: f({}) = {f_lo:.3e}, f({}) = {f_hi:.3e}",
                    config.df_lower, config.df_upper
                )));
            }

            let solver_cfg = SolverConfig::new(config.tolerance, config.max_iterations);

            // Probe for an analytic derivative at the current guess
            let analytic = {
                let mut curve = cell.borrow_mut();
                if curve.update_node(date, guess).is_err() {
                    false
                } else {
                    let ctx = PvContext {
                        curve: &*curve,
                        discount,
                        reference,
                        vol,
                    };
                    instrument.pv_node_derivative(&ctx).is_some()
                }
            };

            let result = if analytic {
                let deriv = |value: f64| -> f64 {
                    let mut curve = cell.borrow_mut();
                    if curve.update_node(date, value).is_err() {
                        return f64::NAN;
                    }
                    let ctx = PvContext {
                        curve: &*curve,
                        discount,
                        reference,
                        vol,
                    };
                    instrument.pv_node_derivative(&ctx).unwrap_or(f64::NAN)
                };

                let newton = newton_raphson(&mut eval, deriv, guess, &solver_cfg);
                let newton_ok = matches!(
                    &newton,
                    Ok(r) if r.root >= config.df_lower && r.root <= config.df_upper
                ) && pending_err.borrow().is_none();

                if newton_ok {
                    newton
                } else {
                    // Newton wandered or failed; discard whatever its
                    // exploration tripped over, Brent is guaranteed inside
                    // the validated bracket
                    pending_err.borrow_mut().take();
                    brent(&mut eval, config.df_lower, config.df_upper, &solver_cfg)
                }
            } else {
                brent(&mut eval, config.df_lower, config.df_upper, &solver_cfg)
            };

            if let Some(e) = pending_err.borrow_mut().take() {
                return Err(e);
            }
            let r = result?;
            debug!(
                "node {date} solved to {:.8} in {} iterations (residual {:.2e})",
                r.root, r.iterations, r.residual
            );
            Ok(r.root)
        })();

        let mut curve = cell.into_inner();
        match solved {
            Ok(root) => {
                let committed = curve.update_node(date, root);
                self.curve = Some(curve);
                committed
            }
            Err(e) => {
                self.curve = Some(curve);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::{Deposit, Priceable};
    use crate::interpolation::InterpolationMethod;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    fn deposit_model(rates: &[(Date, f64)]) -> RateCurveModel {
        let valuation = date(2025, 1, 15);
        let instruments = rates
            .iter()
            .map(|&(end, rate)| {
                CurveInstrument::new(Arc::new(Deposit::new(
                    valuation,
                    end,
                    rate,
                    DayCountConvention::Act365Fixed,
                )))
            })
            .collect();

        RateCurveModel::new(
            "test",
            instruments,
            vec![SegmentSpec::open(InterpolationMethod::LogLinear)],
            DayCountConvention::Act365Fixed,
        )
        .unwrap()
    }

    #[test]
    fn test_solve_single_deposit_node() {
        let valuation = date(2025, 1, 15);
        let end = date(2026, 1, 15);
        let mut model = deposit_model(&[(end, 0.04)]);

        model.reset(valuation, None).unwrap();
        model.solve_node(end, None, None).unwrap();

        let curve = model.curve().unwrap();
        let tau = DayCountConvention::Act365Fixed.year_fraction_f64(valuation, end);
        assert_relative_eq!(
            curve.df(end).unwrap(),
            1.0 / (1.0 + 0.04 * tau),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_solved_instrument_reprices_to_zero() {
        let valuation = date(2025, 1, 15);
        let ends = [date(2025, 7, 15), date(2026, 1, 15), date(2027, 1, 15)];
        let mut model = deposit_model(&[(ends[0], 0.035), (ends[1], 0.04), (ends[2], 0.042)]);

        model.reset(valuation, None).unwrap();
        for end in ends {
            model.solve_node(end, None, None).unwrap();
        }

        let curve = model.curve().unwrap();
        for (end, rate) in [(ends[0], 0.035), (ends[1], 0.04), (ends[2], 0.042)] {
            let deposit = Deposit::new(valuation, end, rate, DayCountConvention::Act365Fixed);
            let pv = deposit.pv(&PvContext::of(curve)).unwrap();
            assert!(pv.abs() < 1e-9, "deposit {end} reprices to {pv}");
        }
    }

    #[test]
    fn test_unknown_node_fails() {
        let valuation = date(2025, 1, 15);
        let mut model = deposit_model(&[(date(2026, 1, 15), 0.04)]);
        model.reset(valuation, None).unwrap();

        let result = model.solve_node(date(2026, 6, 15), None, None);
        assert!(matches!(
            result,
            Err(CurveError::NoInstrumentForNode { .. })
        ));
    }

    #[test]
    fn test_excluded_instrument_never_solves_the_node() {
        let valuation = date(2025, 1, 15);
        let end = date(2026, 1, 15);
        let solving = CurveInstrument::new(Arc::new(Deposit::new(
            valuation,
            end,
            0.04,
            DayCountConvention::Act365Fixed,
        )));
        let excluded = CurveInstrument::new(Arc::new(Deposit::new(
            valuation,
            end,
            0.05,
            DayCountConvention::Act365Fixed,
        )))
        .exclude_from_fit();

        // The excluded quote shares the node; the solver must pick the last
        // NON-excluded instrument
        let mut model = RateCurveModel::new(
            "test",
            vec![solving, excluded],
            vec![SegmentSpec::open(InterpolationMethod::LogLinear)],
            DayCountConvention::Act365Fixed,
        )
        .unwrap();

        model.reset(valuation, None).unwrap();
        model.solve_node(end, None, None).unwrap();

        let curve = model.curve().unwrap();
        let tau = DayCountConvention::Act365Fixed.year_fraction_f64(valuation, end);
        // Solved against the 4% deposit, not the excluded 5% one
        assert_relative_eq!(
            curve.df(end).unwrap(),
            1.0 / (1.0 + 0.04 * tau),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_newton_path_via_analytic_derivative() {
        // Deposits expose an analytic node derivative, so this exercises the
        // Newton branch end to end
        let valuation = date(2025, 1, 15);
        let end = date(2026, 1, 15);
        let mut model = deposit_model(&[(end, 0.04)]);

        model.reset(valuation, None).unwrap();

        let curve = model.curve().unwrap();
        let instrument = &model.instruments()[0];
        assert!(instrument
            .pv_node_derivative(&PvContext::of(curve))
            .is_some());

        model.solve_node(end, None, None).unwrap();
        let deposit = Deposit::new(valuation, end, 0.04, DayCountConvention::Act365Fixed);
        let pv = deposit.pv(&PvContext::of(model.curve().unwrap())).unwrap();
        assert!(pv.abs() < 1e-10);
    }

    #[test]
    fn test_curve_not_built_before_reset() {
        let model = deposit_model(&[(date(2026, 1, 15), 0.04)]);
        assert!(matches!(
            model.curve(),
            Err(CurveError::CurveNotBuilt { .. })
        ));
    }
}
