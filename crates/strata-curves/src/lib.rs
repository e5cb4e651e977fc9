//! # Strata Curves
//!
//! The calibration kernel of the Strata fixed-income stack: discount and
//! forward curves built from market instruments by iterative numerical
//! calibration.
//!
//! - **Curve model**: date / discount-factor nodes partitioned into
//!   interpolation segments, with in-place node mutation
//! - **Bootstrap**: per-node root-finding against calibration instruments
//! - **Multi-curve groups**: Gauss-Seidel fixed-point iteration over curves
//!   with circular discounting dependencies
//! - **Convexity**: volatility-curve calibration reconciling futures with
//!   swaps
//! - **Bond spreads**: non-parametric weighted least-squares spread curves
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use strata_core::daycounts::DayCountConvention;
//! use strata_core::Date;
//! use strata_curves::instruments::Deposit;
//! use strata_curves::{
//!     CurveInstrument, InterpolationMethod, RateCurveGroupModel, RateCurveModel, SegmentSpec,
//! };
//!
//! let valuation = Date::from_ymd(2025, 1, 15).unwrap();
//! let end = Date::from_ymd(2026, 1, 15).unwrap();
//!
//! let deposit = CurveInstrument::new(Arc::new(Deposit::new(
//!     valuation,
//!     end,
//!     0.04,
//!     DayCountConvention::Act365Fixed,
//! )));
//!
//! let model = RateCurveModel::new(
//!     "ois",
//!     vec![deposit],
//!     vec![SegmentSpec::open(InterpolationMethod::LogLinear)],
//!     DayCountConvention::Act365Fixed,
//! )
//! .unwrap();
//!
//! let mut group = RateCurveGroupModel::new(valuation, vec![model], None).unwrap();
//! group.build(false).unwrap();
//!
//! let df = group.curve("ois").unwrap().df(end).unwrap();
//! assert!(df > 0.95 && df < 1.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::missing_panics_doc)]

pub mod calibration;
pub mod curve;
pub mod error;
pub mod instruments;
pub mod interpolation;
pub mod spread;
pub mod volatility;

pub use calibration::{
    BootstrapConfig, ConvexityConfig, CurveInstrument, GroupConfig, RateCurveGroupModel,
    RateCurveModel, CURVE_SOLVER_MAX_ITERATIONS,
};
pub use curve::{Curve, Node, SegmentSpec};
pub use error::{CurveError, CurveResult};
pub use interpolation::InterpolationMethod;
pub use spread::{BondCurveModelNP, SpreadCurve};
pub use volatility::VolCurve;
