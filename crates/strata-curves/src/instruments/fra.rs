//! Forward rate agreement.

use strata_core::daycounts::DayCountConvention;
use strata_core::Date;

use crate::error::CurveResult;
use crate::instruments::{InstrumentKind, Priceable, PvContext};

/// Forward rate agreement: fixed rate against the curve forward over
/// `(start, end]`.
#[derive(Debug, Clone)]
pub struct Fra {
    start: Date,
    end: Date,
    rate: f64,
    day_count: DayCountConvention,
}

impl Fra {
    /// Creates a new FRA.
    #[must_use]
    pub fn new(start: Date, end: Date, rate: f64, day_count: DayCountConvention) -> Self {
        Self {
            start,
            end,
            rate,
            day_count,
        }
    }
}

impl Priceable for Fra {
    fn kind(&self) -> InstrumentKind {
        InstrumentKind::Fra
    }

    fn end_date(&self) -> Date {
        self.end
    }

    fn pv(&self, ctx: &PvContext) -> CurveResult<f64> {
        let fwd = ctx.curve.forward_rate(self.start, self.end)?;
        let tau = self.day_count.year_fraction_f64(self.start, self.end);
        let df = ctx.discount_curve().df(self.end)?;

        Ok((fwd - self.rate) * tau * df)
    }

    fn market_rate(&self) -> CurveResult<f64> {
        Ok(self.rate)
    }
}
