//! Futures convexity calibration.
//!
//! Futures and swaps jointly calibrating one curve disagree unless the
//! futures rates are convexity-adjusted. This loop tunes the model's
//! volatility curve until every convexity-excluded swap's model par rate
//! matches its market rate: each discrepancy is converted to a forward
//! variance through the swap's PV01 and the cubed day-count-fraction
//! difference between the last fixed volatility node and the swap end, the
//! volatility node at the swap end is re-solved in closed form, and the whole
//! group is rebuilt from scratch before the swap is re-checked.

use log::{debug, warn};

use crate::calibration::group::RateCurveGroupModel;
use crate::error::{CurveError, CurveResult};

/// Convexity calibration configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConvexityConfig {
    /// Par-rate tolerance in basis points.
    pub tolerance_bp: f64,
    /// Maximum volatility re-solves per driving swap.
    pub max_iterations: u32,
}

impl Default for ConvexityConfig {
    fn default() -> Self {
        Self {
            tolerance_bp: 0.2,
            max_iterations: 10,
        }
    }
}

/// Runs the convexity loop on every model carrying a volatility curve.
pub(crate) fn calibrate_group_convexity(group: &mut RateCurveGroupModel) -> CurveResult<()> {
    for idx in 0..group.models().len() {
        if group.models()[idx].vol_curve().is_some() {
            calibrate_model(group, idx)?;
        }
    }
    Ok(())
}

/// Walks one model's convexity-excluded swaps in end-date order.
fn calibrate_model(group: &mut RateCurveGroupModel, idx: usize) -> CurveResult<()> {
    let config = group.models()[idx].convexity_config();
    let tolerance = config.tolerance_bp * 1e-4;
    let swap_indices = group.models()[idx].convexity_swap_indices();

    let mut last_fixed = group.models()[idx]
        .vol_curve()
        .expect("caller checked vol curve presence")
        .last_node_date();

    for swap_idx in swap_indices {
        let end = group.models()[idx].instruments()[swap_idx]
            .instrument()
            .end_date();
        if end <= last_fixed {
            continue;
        }

        let mut iterations = 0_u32;
        loop {
            let (par, pv01, market) = {
                let ctx = group.pv_context_for(idx)?;
                let instrument = group.models()[idx].instruments()[swap_idx].instrument();
                (
                    instrument.par_rate(&ctx)?,
                    instrument.pv01(&ctx)?,
                    instrument.market_rate()?,
                )
            };

            let discrepancy = par - market;
            if discrepancy.abs() <= tolerance {
                debug!(
                    "convexity swap ending {end} within tolerance ({:.4}bp) after {iterations} re-solves",
                    discrepancy.abs() * 1e4
                );
                break;
            }
            if iterations >= config.max_iterations {
                return Err(CurveError::ConvergenceFailed {
                    iterations: config.max_iterations,
                    residual: discrepancy.abs(),
                });
            }
            iterations += 1;

            // Closed-form forward-variance solve: the par discrepancy times
            // the annuity equals the convexity PV the futures strip must gain
            // over (t_fixed, t_end], which accumulates with the cube of time
            let new_vol = {
                let vol = group.models()[idx]
                    .vol_curve()
                    .expect("caller checked vol curve presence");
                let t_fixed = vol.dcf(last_fixed);
                let t_end = vol.dcf(end);
                let cubed = t_end.powi(3) - t_fixed.powi(3);
                if cubed <= 0.0 {
                    return Err(CurveError::calibration(format!(
                        "degenerate convexity window between {last_fixed} and {end}"
                    )));
                }

                let forward_variance = 6.0 * discrepancy * pv01 / cubed;
                let target = vol.variance(end)? + forward_variance * (t_end - t_fixed);

                if target < vol.variance(last_fixed)? || target < 0.0 {
                    None
                } else {
                    Some((target / t_end).sqrt())
                }
            };

            match new_vol {
                None => {
                    // Non-physical (negative variance) solve: keep the last
                    // valid volatility and move on
                    warn!(
                        "convexity solve for swap ending {end} needs negative variance; keeping last valid volatility"
                    );
                    break;
                }
                Some(v) => {
                    let updated = group
                        .model_mut(idx)
                        .vol_curve_mut()
                        .expect("caller checked vol curve presence")
                        .set_node(end, v);
                    if let Err(e) = updated {
                        warn!("volatility update rejected for swap ending {end}: {e}");
                        break;
                    }

                    debug!(
                        "convexity re-solve {iterations} for swap ending {end}: vol {v:.6}, discrepancy {:.4}bp",
                        discrepancy * 1e4
                    );

                    // The adjusted futures feed every node, so the whole
                    // group rebuilds from scratch
                    group.reset()?;
                    group.build_bootstrap()?;
                }
            }
        }

        last_fixed = end;
    }

    Ok(())
}
