//! 30E/360 day count convention.

use rust_decimal::Decimal;

use super::DayCount;
use crate::types::Date;

/// 30E/360 (Eurobond) day count convention.
///
/// Day-of-month values of 31 are set to 30 on both dates before counting,
/// and every month is treated as 30 days over a 360-day year.
///
/// # Usage
///
/// - Eurobond coupon accrual
/// - EUR fixed swap legs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Thirty360E;

impl DayCount for Thirty360E {
    fn name(&self) -> &'static str {
        "30E/360"
    }

    fn year_fraction(&self, start: Date, end: Date) -> Decimal {
        Decimal::from(self.day_count(start, end)) / Decimal::from(360)
    }

    fn day_count(&self, start: Date, end: Date) -> i64 {
        let d1 = start.day().min(30) as i64;
        let d2 = end.day().min(30) as i64;

        360 * (end.year() - start.year()) as i64
            + 30 * (end.month() as i64 - start.month() as i64)
            + (d2 - d1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_thirty360e_half_year() {
        let dc = Thirty360E;
        let start = Date::from_ymd(2025, 1, 15).unwrap();
        let end = Date::from_ymd(2025, 7, 15).unwrap();

        assert_eq!(dc.day_count(start, end), 180);
        assert_eq!(dc.year_fraction(start, end), dec!(0.5));
    }

    #[test]
    fn test_thirty360e_eom_rule() {
        let dc = Thirty360E;
        let start = Date::from_ymd(2025, 1, 31).unwrap();
        let end = Date::from_ymd(2025, 3, 31).unwrap();

        // Both 31sts treated as 30ths: exactly two 30-day months
        assert_eq!(dc.day_count(start, end), 60);
    }
}
