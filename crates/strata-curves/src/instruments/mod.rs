//! Calibration instrument capability layer.
//!
//! The market-construction layer owns its instruments; the calibration kernel
//! only needs the capability surface defined here: a present value against a
//! pricing context, an end date, and (for the convexity loop) par-rate and
//! PV01 queries. Dispatch is resolved once through the [`Priceable`] trait
//! object rather than by runtime type checks.
//!
//! Reference implementations for every instrument family the bootstrap
//! handles live in this module:
//!
//! - [`Deposit`]: money market deposit
//! - [`Fra`]: forward rate agreement
//! - [`Future`]: interest rate future with convexity adjustment
//! - [`VanillaSwap`]: fixed-for-floating swap (optionally dual-curve)
//! - [`FxSwap`]: FX swap far-leg parity
//! - [`Bond`]: fixed cashflow schedule against a dirty price

mod bond;
mod deposit;
mod fra;
mod future;
mod fx_swap;
mod swap;

pub use bond::{Bond, Cashflow};
pub use deposit::Deposit;
pub use fra::Fra;
pub use future::Future;
pub use fx_swap::FxSwap;
pub use swap::VanillaSwap;

use std::fmt;

use strata_core::Date;

use crate::curve::Curve;
use crate::error::{CurveError, CurveResult};
use crate::volatility::VolCurve;

/// Instrument family, used for node-date defaulting and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    /// Cash deposit
    Deposit,
    /// Forward rate agreement
    Fra,
    /// Interest rate future
    Future,
    /// Fixed-for-floating interest rate swap
    Swap,
    /// FX swap
    FxSwap,
    /// Fixed coupon bond
    Bond,
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentKind::Deposit => write!(f, "Deposit"),
            InstrumentKind::Fra => write!(f, "FRA"),
            InstrumentKind::Future => write!(f, "Future"),
            InstrumentKind::Swap => write!(f, "Swap"),
            InstrumentKind::FxSwap => write!(f, "FX Swap"),
            InstrumentKind::Bond => write!(f, "Bond"),
        }
    }
}

/// Pricing context handed to instruments during calibration.
///
/// `curve` is the curve being calibrated (the forecast curve). Discounting
/// defaults to it unless a collateral/discount sibling is configured, and
/// `reference` carries the sibling a spread or FX instrument prices against.
#[derive(Clone, Copy)]
pub struct PvContext<'a> {
    /// The curve being calibrated.
    pub curve: &'a Curve,
    /// Optional separate discounting (collateral) curve.
    pub discount: Option<&'a Curve>,
    /// Optional reference curve (FX swap foreign leg, spread base).
    pub reference: Option<&'a Curve>,
    /// Optional short-rate volatility curve for futures convexity.
    pub vol: Option<&'a VolCurve>,
}

impl<'a> PvContext<'a> {
    /// A single-curve context: forecast and discounting on the same curve.
    #[must_use]
    pub fn of(curve: &'a Curve) -> Self {
        Self {
            curve,
            discount: None,
            reference: None,
            vol: None,
        }
    }

    /// The discounting curve (the calibrated curve unless overridden).
    #[must_use]
    pub fn discount_curve(&self) -> &'a Curve {
        self.discount.unwrap_or(self.curve)
    }

    /// The reference curve, or an error if none is configured.
    ///
    /// # Errors
    ///
    /// `CurveError::CurveNotFound` when the instrument needs a reference
    /// curve the model does not provide.
    pub fn reference_curve(&self) -> CurveResult<&'a Curve> {
        self.reference.ok_or_else(|| CurveError::CurveNotFound {
            name: "reference".to_string(),
        })
    }
}

/// Capability interface every calibration instrument exposes to the kernel.
pub trait Priceable: Send + Sync + fmt::Debug {
    /// The instrument family.
    fn kind(&self) -> InstrumentKind;

    /// Natural end date (maturity, far settlement, last cashflow).
    fn end_date(&self) -> Date;

    /// Default calibration node date.
    ///
    /// Futures override this to their expiry; everything else calibrates at
    /// its end date.
    fn node_date(&self) -> Date {
        self.end_date()
    }

    /// Present value under the context; zero when the instrument is
    /// consistent with the curves.
    ///
    /// # Errors
    ///
    /// Propagates curve query failures.
    fn pv(&self, ctx: &PvContext) -> CurveResult<f64>;

    /// Analytic derivative of [`Priceable::pv`] with respect to the solved
    /// node's discount factor, when one is available.
    ///
    /// The bootstrap uses Newton's method for instruments that return `Some`
    /// and Brent's method otherwise.
    fn pv_node_derivative(&self, _ctx: &PvContext) -> Option<f64> {
        None
    }

    /// The quoted market rate, for instruments that carry one.
    ///
    /// # Errors
    ///
    /// `CurveError::Unsupported` for instruments without a quoted rate.
    fn market_rate(&self) -> CurveResult<f64> {
        Err(CurveError::unsupported("market_rate", self.kind().to_string()))
    }

    /// Model-implied par rate under the context.
    ///
    /// # Errors
    ///
    /// `CurveError::Unsupported` for instruments without a par rate.
    fn par_rate(&self, _ctx: &PvContext) -> CurveResult<f64> {
        Err(CurveError::unsupported("par_rate", self.kind().to_string()))
    }

    /// PV sensitivity to a unit move of the quoted rate (the fixed-leg
    /// annuity for swaps).
    ///
    /// # Errors
    ///
    /// `CurveError::Unsupported` for instruments without a rate sensitivity.
    fn pv01(&self, _ctx: &PvContext) -> CurveResult<f64> {
        Err(CurveError::unsupported("pv01", self.kind().to_string()))
    }

    /// Human-readable description for diagnostics.
    fn description(&self) -> String {
        format!("{} {}", self.kind(), self.end_date())
    }
}
