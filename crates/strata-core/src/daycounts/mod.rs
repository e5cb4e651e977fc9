//! Day count conventions for fixed income calculations.
//!
//! Day count conventions determine how interest accrues by specifying how to
//! count days between two dates and the year basis.
//!
//! # Supported Conventions
//!
//! - [`Act360`]: Actual/360 - money market convention
//! - [`Act365Fixed`]: Actual/365 Fixed - UK Gilts, AUD/NZD markets
//! - [`Thirty360E`]: 30E/360 - Eurobond convention
//!
//! # Usage
//!
//! ```rust
//! use strata_core::daycounts::{Act360, DayCount};
//! use strata_core::types::Date;
//!
//! let dc = Act360;
//! let start = Date::from_ymd(2025, 1, 1).unwrap();
//! let end = Date::from_ymd(2025, 4, 1).unwrap();
//!
//! assert_eq!(dc.day_count(start, end), 90);
//! assert_eq!(dc.year_fraction_f64(start, end), 0.25);
//! ```

mod act360;
mod act365;
mod thirty360;

pub use act360::Act360;
pub use act365::Act365Fixed;
pub use thirty360::Thirty360E;

use crate::types::Date;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trait for day count conventions.
///
/// Implementations provide the year fraction calculation between two dates
/// according to specific market conventions.
pub trait DayCount: Send + Sync {
    /// Returns the name of the day count convention.
    fn name(&self) -> &'static str;

    /// Calculates the year fraction between two dates.
    fn year_fraction(&self, start: Date, end: Date) -> Decimal;

    /// Returns the number of days between two dates per the convention.
    fn day_count(&self, start: Date, end: Date) -> i64;

    /// Year fraction as `f64`, for the numerical layers.
    fn year_fraction_f64(&self, start: Date, end: Date) -> f64 {
        self.year_fraction(start, end).to_f64().unwrap_or(0.0)
    }
}

/// Day count convention selector.
///
/// Curve definitions carry this enum; it dispatches to the concrete
/// [`DayCount`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DayCountConvention {
    /// Actual/360.
    Act360,
    /// Actual/365 Fixed.
    #[default]
    Act365Fixed,
    /// 30E/360.
    Thirty360E,
}

impl DayCountConvention {
    /// Returns the concrete day count implementation.
    #[must_use]
    pub fn to_day_count(self) -> &'static dyn DayCount {
        match self {
            DayCountConvention::Act360 => &Act360,
            DayCountConvention::Act365Fixed => &Act365Fixed,
            DayCountConvention::Thirty360E => &Thirty360E,
        }
    }

    /// Year fraction between two dates as `f64`.
    #[must_use]
    pub fn year_fraction_f64(self, start: Date, end: Date) -> f64 {
        self.to_day_count().year_fraction_f64(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_convention_dispatch() {
        let start = Date::from_ymd(2025, 1, 1).unwrap();
        let end = Date::from_ymd(2026, 1, 1).unwrap();

        let act365 = DayCountConvention::Act365Fixed.year_fraction_f64(start, end);
        assert_relative_eq!(act365, 1.0, epsilon = 1e-12);

        let act360 = DayCountConvention::Act360.year_fraction_f64(start, end);
        assert_relative_eq!(act360, 365.0 / 360.0, epsilon = 1e-12);
    }
}
