//! Coupon schedule generation.
//!
//! Generates payment dates for swap legs and bond coupons by stepping whole
//! periods backward from the end date, so the (possibly short) stub falls at
//! the start.

use crate::error::{CoreError, CoreResult};
use crate::types::{Date, Frequency};

/// Generates the ordered payment dates in `(start, end]`.
///
/// Dates are produced by stepping `frequency` periods backward from `end`;
/// the first period is shortened to `start` if the tenor is not a whole
/// number of periods.
///
/// # Errors
///
/// Returns `CoreError::Schedule` if `end` is not strictly after `start`.
pub fn schedule(start: Date, end: Date, frequency: Frequency) -> CoreResult<Vec<Date>> {
    if end <= start {
        return Err(CoreError::schedule(format!(
            "end {end} must be after start {start}"
        )));
    }

    let step = frequency.months_per_period() as i32;
    let mut dates = vec![end];
    let mut periods = 1;

    loop {
        let date = end.add_months(-step * periods)?;
        if date <= start {
            break;
        }
        dates.push(date);
        periods += 1;
    }

    dates.reverse();
    Ok(dates)
}
