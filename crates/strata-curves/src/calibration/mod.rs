//! Curve calibration: instrument wrapping, per-node bootstrap, group
//! fixed-point iteration, and futures convexity.
//!
//! The pieces compose bottom-up:
//!
//! 1. [`CurveInstrument`] wraps a priceable instrument with its node date,
//!    notional, and exclude-from-fit flag.
//! 2. [`RateCurveModel`] owns one curve and solves it node by node.
//! 3. [`RateCurveGroupModel`] owns a set of models with cross-curve
//!    dependencies and iterates them to a joint fixed point, optionally
//!    running the convexity loop.

mod bootstrap;
mod convexity;
mod group;
mod instrument;

pub use bootstrap::{BootstrapConfig, RateCurveModel};
pub use convexity::ConvexityConfig;
pub use group::{GroupConfig, RateCurveGroupModel, CURVE_SOLVER_MAX_ITERATIONS};
pub use instrument::{group_by_node, CurveInstrument};
