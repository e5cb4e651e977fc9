//! Money market deposit.

use strata_core::daycounts::DayCountConvention;
use strata_core::Date;

use crate::error::CurveResult;
use crate::instruments::{InstrumentKind, Priceable, PvContext};

/// Money market deposit.
///
/// Pays one unit at `start` and receives `1 + r * tau` at `end`.
///
/// # Pricing
///
/// `pv = (1 + r * tau) * df(end) - df(start)`, which is zero when
/// `df(end) = df(start) / (1 + r * tau)`.
#[derive(Debug, Clone)]
pub struct Deposit {
    start: Date,
    end: Date,
    rate: f64,
    day_count: DayCountConvention,
}

impl Deposit {
    /// Creates a new deposit.
    #[must_use]
    pub fn new(start: Date, end: Date, rate: f64, day_count: DayCountConvention) -> Self {
        Self {
            start,
            end,
            rate,
            day_count,
        }
    }

    fn year_fraction(&self) -> f64 {
        self.day_count.year_fraction_f64(self.start, self.end)
    }
}

impl Priceable for Deposit {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Deposit
    }

    fn end_date(&self) -> Date {
        self.end
    }

    fn pv(&self, ctx: &PvContext) -> CurveResult<f64> {
        let df_start = ctx.curve.df(self.start)?;
        let df_end = ctx.curve.df(self.end)?;
        let tau = self.year_fraction();

        Ok((1.0 + self.rate * tau) * df_end - df_start)
    }

    fn pv_node_derivative(&self, _ctx: &PvContext) -> Option<f64> {
        // The node being solved is the deposit's own end date, so pv is
        // linear in it with slope 1 + r * tau
        Some(1.0 + self.rate * self.year_fraction())
    }

    fn market_rate(&self) -> CurveResult<f64> {
        Ok(self.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Curve, Node, SegmentSpec};
    use crate::interpolation::InterpolationMethod;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn test_deposit_prices_to_zero_on_consistent_curve() {
        let valuation = date(2025, 1, 15);
        let end = date(2026, 1, 15);
        let tau = DayCountConvention::Act365Fixed.year_fraction_f64(valuation, end);
        let df = 1.0 / (1.0 + 0.04 * tau);

        let curve = Curve::new(
            valuation,
            vec![Node::new(end, df)],
            vec![SegmentSpec::open(InterpolationMethod::LogLinear)],
            DayCountConvention::Act365Fixed,
            None,
        )
        .unwrap();

        let deposit = Deposit::new(valuation, end, 0.04, DayCountConvention::Act365Fixed);
        let pv = deposit.pv(&PvContext::of(&curve)).unwrap();

        assert_relative_eq!(pv, 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_deposit_pv_sign() {
        let valuation = date(2025, 1, 15);
        let end = date(2026, 1, 15);

        // Curve discounts at 5%; a 4% deposit is a losing trade
        let curve = Curve::new(
            valuation,
            vec![Node::new(end, 1.0 / 1.05)],
            vec![SegmentSpec::open(InterpolationMethod::LogLinear)],
            DayCountConvention::Act365Fixed,
            None,
        )
        .unwrap();

        let deposit = Deposit::new(valuation, end, 0.04, DayCountConvention::Act365Fixed);
        assert!(deposit.pv(&PvContext::of(&curve)).unwrap() < 0.0);
    }

    #[test]
    fn test_deposit_has_analytic_derivative() {
        let valuation = date(2025, 1, 15);
        let end = date(2026, 1, 15);
        let curve = Curve::new(
            valuation,
            vec![Node::new(end, 0.96)],
            vec![SegmentSpec::open(InterpolationMethod::LogLinear)],
            DayCountConvention::Act365Fixed,
            None,
        )
        .unwrap();

        let deposit = Deposit::new(valuation, end, 0.04, DayCountConvention::Act365Fixed);
        let derivative = deposit.pv_node_derivative(&PvContext::of(&curve)).unwrap();

        assert!(derivative > 1.0);
    }
}
