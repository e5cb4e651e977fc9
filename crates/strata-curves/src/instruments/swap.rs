//! Fixed-for-floating interest rate swap.

use strata_core::daycounts::DayCountConvention;
use strata_core::schedule::schedule;
use strata_core::types::Frequency;
use strata_core::Date;

use crate::error::CurveResult;
use crate::instruments::{InstrumentKind, Priceable, PvContext};

/// Fixed-for-floating interest rate swap (receive float, pay fixed).
///
/// The floating leg projects forwards off the calibrated curve; both legs
/// discount on the context's discounting curve, which is the calibrated curve
/// itself unless a collateral curve is configured.
#[derive(Debug, Clone)]
pub struct VanillaSwap {
    start: Date,
    end: Date,
    fixed_rate: f64,
    fixed_frequency: Frequency,
    float_frequency: Frequency,
    fixed_day_count: DayCountConvention,
    float_day_count: DayCountConvention,
}

impl VanillaSwap {
    /// Creates a new swap.
    #[must_use]
    pub fn new(
        start: Date,
        end: Date,
        fixed_rate: f64,
        fixed_frequency: Frequency,
        float_frequency: Frequency,
        fixed_day_count: DayCountConvention,
        float_day_count: DayCountConvention,
    ) -> Self {
        Self {
            start,
            end,
            fixed_rate,
            fixed_frequency,
            float_frequency,
            fixed_day_count,
            float_day_count,
        }
    }

    /// Annual-fixed versus annual-float swap, the common test configuration.
    #[must_use]
    pub fn annual(start: Date, end: Date, fixed_rate: f64, day_count: DayCountConvention) -> Self {
        Self::new(
            start,
            end,
            fixed_rate,
            Frequency::Annual,
            Frequency::Annual,
            day_count,
            day_count,
        )
    }

    /// The fixed rate.
    #[must_use]
    pub fn fixed_rate(&self) -> f64 {
        self.fixed_rate
    }

    /// Fixed-leg annuity: `sum(tau_i * df(p_i))`.
    fn annuity(&self, ctx: &PvContext) -> CurveResult<f64> {
        let disc = ctx.discount_curve();
        let dates = schedule(self.start, self.end, self.fixed_frequency)?;

        let mut annuity = 0.0;
        let mut prev = self.start;
        for d in dates {
            let tau = self.fixed_day_count.year_fraction_f64(prev, d);
            annuity += tau * disc.df(d)?;
            prev = d;
        }

        Ok(annuity)
    }

    /// Floating-leg PV: `sum(fwd_i * tau_i * df(p_i))`.
    fn float_pv(&self, ctx: &PvContext) -> CurveResult<f64> {
        let disc = ctx.discount_curve();
        let dates = schedule(self.start, self.end, self.float_frequency)?;

        let mut pv = 0.0;
        let mut prev = self.start;
        for d in dates {
            let fwd = ctx.curve.forward_rate(prev, d)?;
            let tau = self.float_day_count.year_fraction_f64(prev, d);
            pv += fwd * tau * disc.df(d)?;
            prev = d;
        }

        Ok(pv)
    }
}

impl Priceable for VanillaSwap {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Swap
    }

    fn end_date(&self) -> Date {
        self.end
    }

    fn pv(&self, ctx: &PvContext) -> CurveResult<f64> {
        Ok(self.float_pv(ctx)? - self.fixed_rate * self.annuity(ctx)?)
    }

    fn market_rate(&self) -> CurveResult<f64> {
        Ok(self.fixed_rate)
    }

    fn par_rate(&self, ctx: &PvContext) -> CurveResult<f64> {
        Ok(self.float_pv(ctx)? / self.annuity(ctx)?)
    }

    fn pv01(&self, ctx: &PvContext) -> CurveResult<f64> {
        self.annuity(ctx)
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

    /// Flat 4% simply-compounded annual curve.
    fn flat_curve(valuation: Date) -> Curve {
        let nodes = (1..=5)
            .map(|y| {
                let d = valuation.add_years(y).unwrap();
                Node::new(d, 1.0 / (1.04_f64).powi(y))
            })
            .collect();
        Curve::new(
            valuation,
            nodes,
            vec![SegmentSpec::open(InterpolationMethod::LogLinear)],
            DayCountConvention::Thirty360E,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_par_swap_prices_to_zero() {
        let valuation = date(2025, 1, 15);
        let curve = flat_curve(valuation);
        let end = valuation.add_years(5).unwrap();

        let swap = VanillaSwap::annual(valuation, end, 0.04, DayCountConvention::Thirty360E);
        let pv = swap.pv(&PvContext::of(&curve)).unwrap();

        // On a flat simply-compounded curve the par rate is the flat rate
        assert_relative_eq!(pv, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_par_rate_matches_flat_rate() {
        let valuation = date(2025, 1, 15);
        let curve = flat_curve(valuation);
        let end = valuation.add_years(3).unwrap();

        let swap = VanillaSwap::annual(valuation, end, 0.05, DayCountConvention::Thirty360E);
        let par = swap.par_rate(&PvContext::of(&curve)).unwrap();

        assert_relative_eq!(par, 0.04, epsilon = 1e-10);
    }

    #[test]
    fn test_pv01_is_annuity() {
        let valuation = date(2025, 1, 15);
        let curve = flat_curve(valuation);
        let end = valuation.add_years(2).unwrap();

        let swap = VanillaSwap::annual(valuation, end, 0.04, DayCountConvention::Thirty360E);
        let pv01 = swap.pv01(&PvContext::of(&curve)).unwrap();

        let expected = 1.0 / 1.04 + 1.0 / 1.04_f64.powi(2);
        assert_relative_eq!(pv01, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_pv_falls_as_fixed_rate_rises() {
        let valuation = date(2025, 1, 15);
        let curve = flat_curve(valuation);
        let end = valuation.add_years(4).unwrap();

        let low = VanillaSwap::annual(valuation, end, 0.03, DayCountConvention::Thirty360E);
        let high = VanillaSwap::annual(valuation, end, 0.05, DayCountConvention::Thirty360E);

        let ctx = PvContext::of(&curve);
        assert!(low.pv(&ctx).unwrap() > high.pv(&ctx).unwrap());
    }

    #[test]
    fn test_dual_curve_discounting() {
        let valuation = date(2025, 1, 15);
        let forecast = flat_curve(valuation);

        // OIS discounting 50bp below the forecast curve
        let ois_nodes = (1..=5)
            .map(|y| {
                let d = valuation.add_years(y).unwrap();
                Node::new(d, 1.0 / (1.035_f64).powi(y))
            })
            .collect();
        let ois = Curve::new(
            valuation,
            ois_nodes,
            vec![SegmentSpec::open(InterpolationMethod::LogLinear)],
            DayCountConvention::Thirty360E,
            None,
        )
        .unwrap();

        let end = valuation.add_years(5).unwrap();
        let swap = VanillaSwap::annual(valuation, end, 0.04, DayCountConvention::Thirty360E);

        let mut ctx = PvContext::of(&forecast);
        ctx.discount = Some(&ois);

        // Forwards are level on the forecast curve, so par still rounds to
        // the forecast flat rate; discounting shifts both legs together
        let par = swap.par_rate(&ctx).unwrap();
        assert_relative_eq!(par, 0.04, epsilon = 1e-4);
    }
}
