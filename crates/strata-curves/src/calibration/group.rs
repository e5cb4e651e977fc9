//! Multi-curve group fixed-point iteration.
//!
//! Curves in a group may discount on each other, which makes the dependency
//! graph cyclic in general. Instead of a topological solve, the group runs
//! Gauss-Seidel passes: every model re-solves all of its nodes against the
//! siblings' current curves, and the iteration stops when a full pass no
//! longer moves any discount factor beyond tolerance.

use std::sync::Arc;

use log::debug;

use strata_core::calendars::Calendar;
use strata_core::Date;

use crate::calibration::bootstrap::RateCurveModel;
use crate::calibration::convexity::calibrate_group_convexity;
use crate::curve::Curve;
use crate::error::{CurveError, CurveResult};
use crate::instruments::PvContext;

/// Default cap on group fixed-point passes.
pub const CURVE_SOLVER_MAX_ITERATIONS: u32 = 10;

/// Group iteration configuration.
///
/// The iteration cap is configurable rather than a hard constant: the
/// Gauss-Seidel pass has no general convergence proof, so pathological
/// instrument sets may legitimately need a different bound.
#[derive(Debug, Clone, Copy)]
pub struct GroupConfig {
    /// Convergence tolerance on the summed absolute discount-factor change.
    pub tolerance: f64,
    /// Maximum number of full passes.
    pub max_iterations: u32,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: CURVE_SOLVER_MAX_ITERATIONS,
        }
    }
}

/// An ordered set of curve models sharing one valuation date and calendar.
///
/// The group owns its models; sibling references (collateral discounting,
/// FX/spread reference) are resolved here by name and handed to the solving
/// model as read-only borrows, so no global curve registry exists.
pub struct RateCurveGroupModel {
    valuation_date: Date,
    calendar: Option<Arc<dyn Calendar>>,
    models: Vec<RateCurveModel>,
    config: GroupConfig,
}

impl RateCurveGroupModel {
    /// Creates a group from its models.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate model names or a sibling reference that
    /// names no other model in the group.
    pub fn new(
        valuation_date: Date,
        models: Vec<RateCurveModel>,
        calendar: Option<Arc<dyn Calendar>>,
    ) -> CurveResult<Self> {
        for (i, model) in models.iter().enumerate() {
            if models[..i].iter().any(|m| m.name() == model.name()) {
                return Err(CurveError::invalid_curve(format!(
                    "duplicate model name '{}'",
                    model.name()
                )));
            }
        }

        for model in &models {
            for referenced in [model.discount_curve_name(), model.reference_curve_name()]
                .into_iter()
                .flatten()
            {
                let found = models
                    .iter()
                    .any(|m| m.name() == referenced && m.name() != model.name());
                if !found {
                    return Err(CurveError::CurveNotFound {
                        name: referenced.to_string(),
                    });
                }
            }
        }

        Ok(Self {
            valuation_date,
            calendar,
            models,
            config: GroupConfig::default(),
        })
    }

    /// Overrides the iteration configuration.
    #[must_use]
    pub fn with_config(mut self, config: GroupConfig) -> Self {
        self.config = config;
        self
    }

    /// The group's valuation date.
    #[must_use]
    pub fn valuation_date(&self) -> Date {
        self.valuation_date
    }

    /// The models, in solve order.
    #[must_use]
    pub fn models(&self) -> &[RateCurveModel] {
        &self.models
    }

    /// The built curve of the named model.
    ///
    /// # Errors
    ///
    /// `CurveError::CurveNotFound` for an unknown name,
    /// `CurveError::CurveNotBuilt` before building.
    pub fn curve(&self, name: &str) -> CurveResult<&Curve> {
        self.model_by_name(name)?.curve()
    }

    /// Builds every curve in the group.
    ///
    /// Resets all model skeletons, runs the bootstrap fixed point, and when
    /// `calibrate_convexity` is set runs the futures convexity loop on every
    /// model carrying a volatility curve.
    ///
    /// # Errors
    ///
    /// Propagates solve failures; `CurveError::ConvergenceFailed` if the
    /// fixed point does not settle within the configured pass cap.
    pub fn build(&mut self, calibrate_convexity: bool) -> CurveResult<()> {
        self.reset()?;
        self.build_bootstrap()?;

        if calibrate_convexity {
            calibrate_group_convexity(self)?;
        }

        Ok(())
    }

    /// Rebuilds every model's curve skeleton.
    ///
    /// # Errors
    ///
    /// Propagates curve construction failures.
    pub(crate) fn reset(&mut self) -> CurveResult<()> {
        for model in &mut self.models {
            model.reset(self.valuation_date, self.calendar.clone())?;
        }
        Ok(())
    }

    /// Runs Gauss-Seidel passes until the discount factors stop moving.
    ///
    /// Each pass snapshots every model's node values, solves every model at
    /// every node date of the union in ascending order, and sums the absolute
    /// changes. Re-running on an already-converged group is a no-op within
    /// tolerance.
    ///
    /// # Errors
    ///
    /// `CurveError::ConvergenceFailed` after the pass cap.
    pub fn build_bootstrap(&mut self) -> CurveResult<()> {
        let dates = self.union_node_dates();
        let mut last_diff = f64::INFINITY;

        for pass in 0..self.config.max_iterations {
            let snapshot: Vec<Vec<f64>> = self
                .models
                .iter()
                .map(RateCurveModel::node_values)
                .collect::<CurveResult<_>>()?;

            for &date in &dates {
                for idx in 0..self.models.len() {
                    if self.models[idx].has_node(date) {
                        self.solve_at(idx, date)?;
                    }
                }
            }

            let mut diff = 0.0;
            for (model, snap) in self.models.iter().zip(&snapshot) {
                for (new, old) in model.node_values()?.iter().zip(snap) {
                    diff += (new - old).abs();
                }
            }

            debug!("group pass {}: df change {:.3e}", pass + 1, diff);
            if diff <= self.config.tolerance {
                return Ok(());
            }
            last_diff = diff;
        }

        Err(CurveError::ConvergenceFailed {
            iterations: self.config.max_iterations,
            residual: last_diff,
        })
    }

    /// A pricing context for the model at `idx`, with siblings resolved.
    ///
    /// # Errors
    ///
    /// Propagates name resolution and not-built failures.
    pub(crate) fn pv_context_for(&self, idx: usize) -> CurveResult<PvContext<'_>> {
        let model = &self.models[idx];
        let curve = model.curve()?;

        let discount = match model.discount_curve_name() {
            Some(name) => Some(self.curve(name)?),
            None => None,
        };
        let reference = match model.reference_curve_name() {
            Some(name) => Some(self.curve(name)?),
            None => None,
        };

        Ok(PvContext {
            curve,
            discount,
            reference,
            vol: model.vol_curve(),
        })
    }

    pub(crate) fn model_mut(&mut self, idx: usize) -> &mut RateCurveModel {
        &mut self.models[idx]
    }

    /// Solves one model's node with its siblings resolved read-only.
    fn solve_at(&mut self, idx: usize, date: Date) -> CurveResult<()> {
        let discount_name = self.models[idx].discount_curve_name().map(String::from);
        let reference_name = self.models[idx].reference_curve_name().map(String::from);

        let (left, rest) = self.models.split_at_mut(idx);
        let (model, right) = rest.split_first_mut().expect("idx in range");

        let discount = match &discount_name {
            Some(name) => Some(sibling_curve(left, right, name)?),
            None => None,
        };
        let reference = match &reference_name {
            Some(name) => Some(sibling_curve(left, right, name)?),
            None => None,
        };

        model.solve_node(date, discount, reference)
    }

    /// Ascending union of all models' node dates.
    fn union_node_dates(&self) -> Vec<Date> {
        let mut dates: Vec<Date> = self
            .models
            .iter()
            .flat_map(|m| m.node_dates())
            .collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    fn model_by_name(&self, name: &str) -> CurveResult<&RateCurveModel> {
        self.models
            .iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| CurveError::CurveNotFound {
                name: name.to_string(),
            })
    }
}

/// Finds a sibling's built curve across the split model slices.
fn sibling_curve<'a>(
    left: &'a [RateCurveModel],
    right: &'a [RateCurveModel],
    name: &str,
) -> CurveResult<&'a Curve> {
    left.iter()
        .chain(right.iter())
        .find(|m| m.name() == name)
        .ok_or_else(|| CurveError::CurveNotFound {
            name: name.to_string(),
        })?
        .curve()
}
