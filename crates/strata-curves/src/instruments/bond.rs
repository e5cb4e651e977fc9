//! Fixed coupon bond.

use strata_core::daycounts::DayCountConvention;
use strata_core::schedule::schedule;
use strata_core::types::Frequency;
use strata_core::Date;

use crate::error::{CurveError, CurveResult};
use crate::instruments::{InstrumentKind, Priceable, PvContext};

/// A dated cash amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cashflow {
    /// Payment date.
    pub date: Date,
    /// Amount per 100 notional.
    pub amount: f64,
}

/// A bond as the spread fitter sees it: a fixed cashflow schedule and a
/// market dirty price, both per 100 notional.
#[derive(Debug, Clone)]
pub struct Bond {
    cashflows: Vec<Cashflow>,
    market_price: f64,
}

impl Bond {
    /// Creates a bond from an explicit cashflow schedule.
    ///
    /// # Errors
    ///
    /// Returns an error if the schedule is empty or not in ascending date
    /// order.
    pub fn new(cashflows: Vec<Cashflow>, market_price: f64) -> CurveResult<Self> {
        if cashflows.is_empty() {
            return Err(CurveError::invalid_curve("bond needs at least one cashflow"));
        }
        for w in cashflows.windows(2) {
            if w[1].date <= w[0].date {
                return Err(CurveError::invalid_curve(
                    "bond cashflows must be in ascending date order",
                ));
            }
        }

        Ok(Self {
            cashflows,
            market_price,
        })
    }

    /// Builds a fixed coupon bond's schedule from its terms.
    ///
    /// # Errors
    ///
    /// Returns an error if the schedule cannot be generated.
    pub fn fixed_coupon(
        settlement: Date,
        maturity: Date,
        coupon: f64,
        frequency: Frequency,
        day_count: DayCountConvention,
        market_price: f64,
    ) -> CurveResult<Self> {
        let dates = schedule(settlement, maturity, frequency)?;

        let mut cashflows = Vec::with_capacity(dates.len());
        let mut prev = settlement;
        for (i, d) in dates.iter().enumerate() {
            let tau = day_count.year_fraction_f64(prev, *d);
            let mut amount = 100.0 * coupon * tau;
            if i == dates.len() - 1 {
                amount += 100.0;
            }
            cashflows.push(Cashflow { date: *d, amount });
            prev = *d;
        }

        Self::new(cashflows, market_price)
    }

    /// The cashflow schedule.
    #[must_use]
    pub fn cashflows(&self) -> &[Cashflow] {
        &self.cashflows
    }

    /// The market dirty price per 100 notional.
    #[must_use]
    pub fn market_price(&self) -> f64 {
        self.market_price
    }

    /// Final maturity: the last cashflow date.
    #[must_use]
    pub fn maturity(&self) -> Date {
        self.cashflows[self.cashflows.len() - 1].date
    }

    /// Model dirty price off a caller-supplied discount function.
    ///
    /// # Errors
    ///
    /// Propagates discount query failures.
    pub fn model_price<F>(&self, mut df: F) -> CurveResult<f64>
    where
        F: FnMut(Date) -> CurveResult<f64>,
    {
        let mut price = 0.0;
        for cf in &self.cashflows {
            price += cf.amount * df(cf.date)?;
        }
        Ok(price)
    }
}

impl Priceable for Bond {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Bond
    }

    fn end_date(&self) -> Date {
        self.maturity()
    }

    fn pv(&self, ctx: &PvContext) -> CurveResult<f64> {
        let model = self.model_price(|d| ctx.curve.df(d))?;
        Ok(model - self.market_price)
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
    fn test_fixed_coupon_schedule() {
        let bond = Bond::fixed_coupon(
            date(2025, 1, 15),
            date(2027, 1, 15),
            0.05,
            Frequency::Annual,
            DayCountConvention::Thirty360E,
            98.0,
        )
        .unwrap();

        let cfs = bond.cashflows();
        assert_eq!(cfs.len(), 2);
        assert_relative_eq!(cfs[0].amount, 5.0, epsilon = 1e-12);
        assert_relative_eq!(cfs[1].amount, 105.0, epsilon = 1e-12);
        assert_eq!(bond.maturity(), date(2027, 1, 15));
    }

    #[test]
    fn test_model_price_discounts_cashflows() {
        let valuation = date(2025, 1, 15);
        let bond = Bond::fixed_coupon(
            valuation,
            date(2027, 1, 15),
            0.05,
            Frequency::Annual,
            DayCountConvention::Thirty360E,
            100.0,
        )
        .unwrap();

        let curve = Curve::new(
            valuation,
            vec![
                Node::new(date(2026, 1, 15), 1.0 / 1.05),
                Node::new(date(2027, 1, 15), 1.0 / 1.05_f64.powi(2)),
            ],
            vec![SegmentSpec::open(InterpolationMethod::LogLinear)],
            DayCountConvention::Act365Fixed,
            None,
        )
        .unwrap();

        // 5% coupon bond on a 5% curve is worth par
        let price = bond.model_price(|d| curve.df(d)).unwrap();
        assert_relative_eq!(price, 100.0, epsilon = 1e-10);

        // And its pv against a par market price is zero
        assert_relative_eq!(
            bond.pv(&PvContext::of(&curve)).unwrap(),
            0.0,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_rejects_unordered_cashflows() {
        let cfs = vec![
            Cashflow {
                date: date(2026, 1, 15),
                amount: 5.0,
            },
            Cashflow {
                date: date(2025, 7, 15),
                amount: 105.0,
            },
        ];
        assert!(Bond::new(cfs, 100.0).is_err());
    }
}
