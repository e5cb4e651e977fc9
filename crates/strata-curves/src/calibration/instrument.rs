//! Calibration instrument wrapper.

use std::sync::Arc;

use strata_core::Date;

use crate::error::CurveResult;
use crate::instruments::{InstrumentKind, Priceable, PvContext};

/// Wraps a priceable instrument with its calibration attributes.
///
/// The market-construction layer owns the instrument; the wrapper carries the
/// calibration node date (defaulting from the instrument kind), the notional,
/// and the exclude-from-fit flag. Excluded instruments inform the curve shape
/// (futures convexity, par comparisons) but never solve a node.
#[derive(Debug, Clone)]
pub struct CurveInstrument {
    instrument: Arc<dyn Priceable>,
    node_date: Date,
    notional: f64,
    exclude_fit: bool,
}

impl CurveInstrument {
    /// Wraps an instrument with its natural node date and unit notional.
    #[must_use]
    pub fn new(instrument: Arc<dyn Priceable>) -> Self {
        let node_date = instrument.node_date();
        Self {
            instrument,
            node_date,
            notional: 1.0,
            exclude_fit: false,
        }
    }

    /// Overrides the calibration node date.
    #[must_use]
    pub fn with_node_date(mut self, date: Date) -> Self {
        self.node_date = date;
        self
    }

    /// Sets the notional.
    #[must_use]
    pub fn with_notional(mut self, notional: f64) -> Self {
        self.notional = notional;
        self
    }

    /// Marks the instrument as excluded from node solving.
    #[must_use]
    pub fn exclude_from_fit(mut self) -> Self {
        self.exclude_fit = true;
        self
    }

    /// The calibration node date.
    #[must_use]
    pub fn node_date(&self) -> Date {
        self.node_date
    }

    /// The notional.
    #[must_use]
    pub fn notional(&self) -> f64 {
        self.notional
    }

    /// True if this instrument never solves a node.
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        self.exclude_fit
    }

    /// The wrapped instrument.
    #[must_use]
    pub fn instrument(&self) -> &dyn Priceable {
        self.instrument.as_ref()
    }

    /// The instrument kind.
    #[must_use]
    pub fn kind(&self) -> InstrumentKind {
        self.instrument.kind()
    }

    /// Present value scaled by the notional.
    ///
    /// # Errors
    ///
    /// Propagates pricing failures.
    pub fn pv(&self, ctx: &PvContext) -> CurveResult<f64> {
        Ok(self.notional * self.instrument.pv(ctx)?)
    }

    /// Notional-scaled analytic node derivative, when the instrument has one.
    #[must_use]
    pub fn pv_node_derivative(&self, ctx: &PvContext) -> Option<f64> {
        self.instrument
            .pv_node_derivative(ctx)
            .map(|d| self.notional * d)
    }
}

/// Groups instruments by calibration node date.
///
/// Returns the ascending distinct node dates that have at least one
/// non-excluded instrument, each with the indices of every instrument
/// (excluded included) sharing that date. The partition is stable: indices
/// stay in input order within a node.
#[must_use]
pub fn group_by_node(instruments: &[CurveInstrument]) -> Vec<(Date, Vec<usize>)> {
    let mut node_dates: Vec<Date> = instruments
        .iter()
        .filter(|inst| !inst.is_excluded())
        .map(CurveInstrument::node_date)
        .collect();
    node_dates.sort_unstable();
    node_dates.dedup();

    node_dates
        .into_iter()
        .map(|date| {
            let members = instruments
                .iter()
                .enumerate()
                .filter(|(_, inst)| inst.node_date() == date)
                .map(|(i, _)| i)
                .collect();
            (date, members)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::Deposit;
    use strata_core::daycounts::DayCountConvention;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    fn deposit(end: Date) -> Arc<dyn Priceable> {
        Arc::new(Deposit::new(
            date(2025, 1, 15),
            end,
            0.04,
            DayCountConvention::Act365Fixed,
        ))
    }

    #[test]
    fn test_node_defaults_to_end_date() {
        let end = date(2026, 1, 15);
        let wrapped = CurveInstrument::new(deposit(end));
        assert_eq!(wrapped.node_date(), end);
        assert!(!wrapped.is_excluded());
    }

    #[test]
    fn test_node_date_override() {
        let wrapped =
            CurveInstrument::new(deposit(date(2026, 1, 15))).with_node_date(date(2026, 1, 20));
        assert_eq!(wrapped.node_date(), date(2026, 1, 20));
    }

    #[test]
    fn test_group_by_node_sorted_and_stable() {
        let instruments = vec![
            CurveInstrument::new(deposit(date(2027, 1, 15))),
            CurveInstrument::new(deposit(date(2026, 1, 15))),
            CurveInstrument::new(deposit(date(2026, 1, 15))),
        ];

        let groups = group_by_node(&instruments);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, date(2026, 1, 15));
        assert_eq!(groups[0].1, vec![1, 2]);
        assert_eq!(groups[1].0, date(2027, 1, 15));
        assert_eq!(groups[1].1, vec![0]);
    }

    #[test]
    fn test_excluded_only_nodes_are_not_solving_nodes() {
        let instruments = vec![
            CurveInstrument::new(deposit(date(2026, 1, 15))),
            CurveInstrument::new(deposit(date(2028, 1, 15))).exclude_from_fit(),
        ];

        let groups = group_by_node(&instruments);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, date(2026, 1, 15));
    }

    #[test]
    fn test_excluded_instrument_at_solving_node_is_grouped() {
        let instruments = vec![
            CurveInstrument::new(deposit(date(2026, 1, 15))),
            CurveInstrument::new(deposit(date(2026, 1, 15))).exclude_from_fit(),
        ];

        let groups = group_by_node(&instruments);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1, vec![0, 1]);
    }
}
