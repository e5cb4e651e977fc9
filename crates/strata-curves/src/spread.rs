//! Non-parametric bond spread curves.
//!
//! A [`SpreadCurve`] expresses a bond curve as an immutable base curve times
//! an independently calibrated multiplier curve. [`BondCurveModelNP`] fits
//! the multiplier nodes to a weighted bond universe by nonlinear least
//! squares over log-parametrized node values, with the analytic gradient the
//! quasi-Newton minimizer needs to stay cheap at
//! O(nodes x bonds x cashflows) per cost evaluation.

use std::sync::Arc;

use log::warn;

use strata_core::Date;
use strata_math::optimization::{bfgs, OptimizationConfig};

use crate::curve::{Curve, Node, SegmentSpec};
use crate::error::{CurveError, CurveResult};
use crate::instruments::Bond;
use crate::interpolation::InterpolationMethod;

/// A curve whose discount factor is a base curve's discount factor times a
/// spread multiplier.
///
/// The multiplier curve holds linearly interpolated nodes seeded at 1 (zero
/// spread) and is flat beyond its last node. The base curve is an immutable
/// dependency: fitting a spread never mutates it.
#[derive(Debug)]
pub struct SpreadCurve {
    base: Arc<Curve>,
    spread: Curve,
}

impl SpreadCurve {
    /// Creates a zero-spread curve over the base with multiplier nodes at the
    /// given dates.
    ///
    /// # Errors
    ///
    /// Propagates curve construction failures (unordered dates, dates not
    /// after the base valuation date).
    pub fn new(base: Arc<Curve>, node_dates: Vec<Date>) -> CurveResult<Self> {
        let nodes = node_dates.into_iter().map(|d| Node::new(d, 1.0)).collect();
        let spread = Curve::new(
            base.valuation_date(),
            nodes,
            vec![SegmentSpec::open(InterpolationMethod::Linear)],
            base.day_count(),
            None,
        )?;

        Ok(Self { base, spread })
    }

    /// The spread multiplier at a date (flat beyond the last node).
    ///
    /// # Errors
    ///
    /// Propagates base/spread curve query failures.
    pub fn multiplier(&self, date: Date) -> CurveResult<f64> {
        let clamped = date.min(self.spread.last_node_date());
        self.spread.df(clamped)
    }

    /// Discount factor: `base.df(date) * multiplier(date)`.
    ///
    /// # Errors
    ///
    /// Propagates base/spread curve query failures.
    pub fn df(&self, date: Date) -> CurveResult<f64> {
        Ok(self.base.df(date)? * self.multiplier(date)?)
    }

    /// Bulk-updates the multiplier nodes from log values.
    ///
    /// # Errors
    ///
    /// Propagates the node-count check from the underlying curve.
    pub fn update_log_multipliers(&mut self, log_values: &[f64]) -> CurveResult<()> {
        self.spread.update_nodes(log_values)
    }

    /// The base curve.
    #[must_use]
    pub fn base(&self) -> &Curve {
        &self.base
    }

    /// The multiplier curve.
    #[must_use]
    pub fn spread_curve(&self) -> &Curve {
        &self.spread
    }
}

/// One cashflow's contribution to the fit, resolved against the spread nodes.
///
/// `ratio` splits the cashflow between its two bracketing nodes; a cashflow
/// before the first node leans on the fixed unit anchor at the valuation
/// date, and one past the last node sits fully on it.
#[derive(Debug, Clone, Copy)]
struct CashflowTerm {
    /// Cashflow amount discounted on the base curve.
    base_pv: f64,
    /// Lower bracketing node (parameter index); `None` is the unit anchor.
    lo: Option<usize>,
    /// Upper bracketing node (parameter index).
    hi: usize,
    /// Interpolation weight of the upper node.
    ratio: f64,
}

impl CashflowTerm {
    fn multiplier(&self, params: &[f64]) -> f64 {
        let m_lo = self.lo.map_or(1.0, |i| params[i].exp());
        let m_hi = params[self.hi].exp();
        (1.0 - self.ratio) * m_lo + self.ratio * m_hi
    }
}

/// Non-parametric bond spread curve model.
///
/// Owns a base curve reference and a weighted bond universe, and fits a
/// [`SpreadCurve`] so the weighted squared price errors are minimized. Node
/// dates default to the distinct bond maturities.
pub struct BondCurveModelNP {
    base: Arc<Curve>,
    bonds: Vec<(Bond, f64)>,
    node_dates: Vec<Date>,
    config: OptimizationConfig,
    spread: Option<SpreadCurve>,
}

impl BondCurveModelNP {
    /// Creates a model from a base curve and weighted bonds.
    ///
    /// Zero or negative weights are degenerate input, not an error: they are
    /// reported and treated as exclusions. Node dates default to the distinct
    /// bond maturities when not supplied.
    ///
    /// # Errors
    ///
    /// Returns an error if no bond carries positive weight.
    pub fn new(
        base: Arc<Curve>,
        weighted_bonds: Vec<(Bond, f64)>,
        node_dates: Option<Vec<Date>>,
    ) -> CurveResult<Self> {
        let mut bonds = Vec::with_capacity(weighted_bonds.len());
        for (bond, weight) in weighted_bonds {
            if weight <= 0.0 {
                warn!(
                    "bond maturing {} has non-positive weight {weight}; excluded from the fit",
                    bond.maturity()
                );
                bonds.push((bond, 0.0));
            } else {
                bonds.push((bond, weight));
            }
        }

        if bonds.iter().all(|(_, w)| *w == 0.0) {
            return Err(CurveError::invalid_curve(
                "bond universe has no positive-weight bond",
            ));
        }

        let node_dates = match node_dates {
            Some(dates) => dates,
            None => {
                let mut dates: Vec<Date> = bonds
                    .iter()
                    .filter(|(_, w)| *w > 0.0)
                    .map(|(b, _)| b.maturity())
                    .collect();
                dates.sort_unstable();
                dates.dedup();
                dates
            }
        };

        Ok(Self {
            base,
            bonds,
            node_dates,
            config: OptimizationConfig::default(),
            spread: None,
        })
    }

    /// Overrides the minimizer configuration.
    #[must_use]
    pub fn with_config(mut self, config: OptimizationConfig) -> Self {
        self.config = config;
        self
    }

    /// The fitted spread curve, once built.
    #[must_use]
    pub fn spread(&self) -> Option<&SpreadCurve> {
        self.spread.as_ref()
    }

    /// Fits the spread curve to the bond universe.
    ///
    /// Minimizes `sum_i w_i * (model_price_i - market_price_i)^2` over the
    /// log multiplier node values, seeded at zero (flat unit spread), using
    /// the analytic gradient: each cashflow contributes
    /// `2 * weight * price_error * cashflow_pv` split across its two
    /// bracketing nodes by the linear interpolation ratio.
    ///
    /// # Errors
    ///
    /// Propagates curve construction and query failures.
    pub fn build(&mut self) -> CurveResult<&SpreadCurve> {
        let mut spread = SpreadCurve::new(Arc::clone(&self.base), self.node_dates.clone())?;
        let node_times = spread.spread_curve().node_times().to_vec();
        let n = node_times.len();

        // Resolve every cashflow against the node grid once; the optimizer
        // then never touches a curve
        let mut terms: Vec<(f64, f64, Vec<CashflowTerm>)> = Vec::new();
        for (bond, weight) in &self.bonds {
            if *weight == 0.0 {
                continue;
            }
            let mut cashflow_terms = Vec::with_capacity(bond.cashflows().len());
            for cf in bond.cashflows() {
                let t = spread.spread_curve().dcf_from_valuation(cf.date);
                if t <= 0.0 {
                    continue;
                }
                let base_pv = cf.amount * self.base.df(cf.date)?;
                cashflow_terms.push(resolve_term(base_pv, t, &node_times));
            }
            terms.push((*weight, bond.market_price(), cashflow_terms));
        }

        let cost = |params: &[f64]| -> f64 {
            terms
                .iter()
                .map(|(weight, market, cfs)| {
                    let model: f64 = cfs.iter().map(|cf| cf.base_pv * cf.multiplier(params)).sum();
                    weight * (model - market) * (model - market)
                })
                .sum()
        };

        let gradient = |params: &[f64]| -> Vec<f64> {
            let mut grad = vec![0.0; n];
            for (weight, market, cfs) in &terms {
                let model: f64 = cfs.iter().map(|cf| cf.base_pv * cf.multiplier(params)).sum();
                let error = model - market;
                for cf in cfs {
                    let common = 2.0 * weight * error * cf.base_pv;
                    if let Some(lo) = cf.lo {
                        grad[lo] += common * (1.0 - cf.ratio) * params[lo].exp();
                    }
                    grad[cf.hi] += common * cf.ratio * params[cf.hi].exp();
                }
            }
            grad
        };

        let seed = vec![0.0; n];
        let result = bfgs(cost, gradient, &seed, &self.config)?;
        if !result.converged {
            warn!(
                "spread fit stopped after {} iterations with objective {:.3e}",
                result.iterations, result.objective_value
            );
        }

        spread.update_log_multipliers(&result.parameters)?;
        self.spread = Some(spread);

        Ok(self.spread.as_ref().expect("just set"))
    }
}

/// Locates a cashflow time against the node grid.
fn resolve_term(base_pv: f64, t: f64, node_times: &[f64]) -> CashflowTerm {
    let last = node_times.len() - 1;

    if t >= node_times[last] {
        return CashflowTerm {
            base_pv,
            lo: None,
            hi: last,
            ratio: 1.0,
        };
    }
    if t <= node_times[0] {
        // Between the unit anchor at the valuation date and the first node
        return CashflowTerm {
            base_pv,
            lo: None,
            hi: 0,
            ratio: t / node_times[0],
        };
    }

    let i = node_times.partition_point(|&x| x < t);
    CashflowTerm {
        base_pv,
        lo: Some(i - 1),
        hi: i,
        ratio: (t - node_times[i - 1]) / (node_times[i] - node_times[i - 1]),
    }
}
