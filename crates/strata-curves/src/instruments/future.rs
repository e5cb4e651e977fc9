//! Interest rate future.

use strata_core::daycounts::DayCountConvention;
use strata_core::Date;

use crate::error::CurveResult;
use crate::instruments::{InstrumentKind, Priceable, PvContext};

/// Interest rate future, quoted as `100 * (1 - rate)`.
///
/// The futures rate exceeds the equivalent forward rate by the convexity of
/// the daily-margined payoff; when the context carries a volatility curve the
/// adjustment `0.5 * W(expiry) * t_end` is subtracted from the futures rate
/// before it is compared with the curve forward.
///
/// Calibrates at its expiry date, not the underlying period end.
#[derive(Debug, Clone)]
pub struct Future {
    expiry: Date,
    period_end: Date,
    price: f64,
    day_count: DayCountConvention,
}

impl Future {
    /// Creates a new future from its quoted price.
    #[must_use]
    pub fn new(expiry: Date, period_end: Date, price: f64, day_count: DayCountConvention) -> Self {
        Self {
            expiry,
            period_end,
            price,
            day_count,
        }
    }

    /// The futures-implied rate, `(100 - price) / 100`.
    #[must_use]
    pub fn futures_rate(&self) -> f64 {
        (100.0 - self.price) / 100.0
    }

    /// The contract expiry.
    #[must_use]
    pub fn expiry(&self) -> Date {
        self.expiry
    }
}

impl Priceable for Future {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Future
    }

    fn end_date(&self) -> Date {
        self.period_end
    }

    fn node_date(&self) -> Date {
        self.expiry
    }

    fn pv(&self, ctx: &PvContext) -> CurveResult<f64> {
        let convexity = match ctx.vol {
            Some(vol) => vol.convexity_adjustment(self.expiry, self.period_end)?,
            None => 0.0,
        };
        let implied_forward = self.futures_rate() - convexity;

        let curve_forward = ctx.curve.forward_rate(self.expiry, self.period_end)?;
        let tau = self.day_count.year_fraction_f64(self.expiry, self.period_end);
        let df = ctx.discount_curve().df(self.period_end)?;

        Ok((implied_forward - curve_forward) * tau * df)
    }

    fn market_rate(&self) -> CurveResult<f64> {
        Ok(self.futures_rate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Curve, Node, SegmentSpec};
    use crate::interpolation::InterpolationMethod;
    use crate::volatility::VolCurve;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    fn flat_curve(valuation: Date, nodes: &[(Date, f64)]) -> Curve {
        Curve::new(
            valuation,
            nodes.iter().map(|&(d, v)| Node::new(d, v)).collect(),
            vec![SegmentSpec::open(InterpolationMethod::LogLinear)],
            DayCountConvention::Act365Fixed,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_futures_rate_from_price() {
        let fut = Future::new(
            date(2025, 3, 19),
            date(2025, 6, 19),
            97.5,
            DayCountConvention::Act360,
        );
        assert_relative_eq!(fut.futures_rate(), 0.025, epsilon = 1e-12);
    }

    #[test]
    fn test_node_date_is_expiry() {
        let fut = Future::new(
            date(2025, 3, 19),
            date(2025, 6, 19),
            97.5,
            DayCountConvention::Act360,
        );
        assert_eq!(fut.node_date(), date(2025, 3, 19));
        assert_eq!(fut.end_date(), date(2025, 6, 19));
    }

    #[test]
    fn test_pv_zero_when_forward_matches() {
        let valuation = date(2025, 1, 15);
        let expiry = date(2026, 1, 15);
        let end = date(2027, 1, 15);

        let curve = flat_curve(valuation, &[(expiry, 0.97), (end, 0.93)]);
        let fwd = curve.forward_rate(expiry, end).unwrap();

        let fut = Future::new(
            expiry,
            end,
            100.0 * (1.0 - fwd),
            DayCountConvention::Act365Fixed,
        );

        assert_relative_eq!(fut.pv(&PvContext::of(&curve)).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_convexity_lowers_implied_forward() {
        let valuation = date(2025, 1, 15);
        let expiry = date(2026, 1, 15);
        let end = date(2027, 1, 15);

        let curve = flat_curve(valuation, &[(expiry, 0.97), (end, 0.93)]);
        let fwd = curve.forward_rate(expiry, end).unwrap();
        let fut = Future::new(
            expiry,
            end,
            100.0 * (1.0 - fwd),
            DayCountConvention::Act365Fixed,
        );

        let vol = VolCurve::new(
            valuation,
            vec![Node::new(end, 0.01)],
            DayCountConvention::Act365Fixed,
        )
        .unwrap();

        let mut ctx = PvContext::of(&curve);
        ctx.vol = Some(&vol);

        // With convexity on, the same price implies a lower forward, so the
        // pv turns negative
        assert!(fut.pv(&ctx).unwrap() < 0.0);
    }
}
