//! End-to-end bond spread fit: bootstrap a swap curve, snapshot it as the
//! immutable base, and fit a non-parametric spread curve to a bond universe.

use std::sync::Arc;

use approx::assert_relative_eq;

use strata_core::daycounts::DayCountConvention;
use strata_core::types::Frequency;
use strata_core::Date;
use strata_curves::instruments::{Bond, VanillaSwap};
use strata_curves::{
    BondCurveModelNP, CurveInstrument, InterpolationMethod, RateCurveGroupModel, RateCurveModel,
    SegmentSpec,
};

fn date(y: i32, m: u32, d: u32) -> Date {
    Date::from_ymd(y, m, d).unwrap()
}

fn valuation() -> Date {
    date(2025, 1, 15)
}

fn swap(end: Date, rate: f64) -> CurveInstrument {
    CurveInstrument::new(Arc::new(VanillaSwap::annual(
        valuation(),
        end,
        rate,
        DayCountConvention::Act365Fixed,
    )))
}

fn bond(maturity: Date, coupon: f64, price: f64) -> Bond {
    Bond::fixed_coupon(
        valuation(),
        maturity,
        coupon,
        Frequency::Annual,
        DayCountConvention::Thirty360E,
        price,
    )
    .unwrap()
}

#[test]
fn spread_curve_over_bootstrapped_base() {
    // 1. Bootstrap the base curve from swaps
    let model = RateCurveModel::new(
        "govt",
        vec![
            swap(date(2026, 1, 15), 0.030),
            swap(date(2027, 1, 15), 0.032),
            swap(date(2030, 1, 15), 0.035),
        ],
        vec![SegmentSpec::open(InterpolationMethod::LogLinear)],
        DayCountConvention::Act365Fixed,
    )
    .unwrap();

    let mut group = RateCurveGroupModel::new(valuation(), vec![model], None).unwrap();
    group.build(false).unwrap();

    // 2. Snapshot it as the immutable base
    let base = Arc::new(group.curve("govt").unwrap().snapshot().unwrap());

    // 3. Bonds trading below their curve-implied fair price (a credit spread)
    let maturities = [date(2027, 1, 15), date(2029, 1, 15)];
    let bonds: Vec<(Bond, f64)> = maturities
        .iter()
        .map(|&m| {
            let fair = bond(m, 0.04, 0.0).model_price(|d| base.df(d)).unwrap();
            (bond(m, 0.04, fair - 0.5), 1.0)
        })
        .collect();

    let mut spread_model = BondCurveModelNP::new(Arc::clone(&base), bonds.clone(), None).unwrap();
    let fitted = spread_model.build().unwrap();

    // The fitted curve reprices every bond...
    for (b, _) in &bonds {
        let model_price = b.model_price(|d| fitted.df(d)).unwrap();
        assert_relative_eq!(model_price, b.market_price(), epsilon = 1e-6);
    }

    // ...with multipliers below one (cheap bonds mean wider discounting)
    for &m in &maturities {
        let mult = fitted.multiplier(m).unwrap();
        assert!(mult < 1.0, "multiplier at {m} is {mult}");
    }

    // The base curve is untouched by the fit
    let base_df = base.df(date(2027, 1, 15)).unwrap();
    assert_relative_eq!(
        base_df,
        group.curve("govt").unwrap().df(date(2027, 1, 15)).unwrap(),
        epsilon = 1e-12
    );
}

#[test]
fn explicit_tenor_nodes() {
    let model = RateCurveModel::new(
        "govt",
        vec![
            swap(date(2026, 1, 15), 0.030),
            swap(date(2030, 1, 15), 0.034),
        ],
        vec![SegmentSpec::open(InterpolationMethod::LogLinear)],
        DayCountConvention::Act365Fixed,
    )
    .unwrap();

    let mut group = RateCurveGroupModel::new(valuation(), vec![model], None).unwrap();
    group.build(false).unwrap();
    let base = Arc::new(group.curve("govt").unwrap().snapshot().unwrap());

    // One bond, two explicit tenor nodes: underdetermined but well-posed
    // through the least-squares objective
    let fair = bond(date(2029, 1, 15), 0.04, 0.0)
        .model_price(|d| base.df(d))
        .unwrap();
    let universe = vec![(bond(date(2029, 1, 15), 0.04, fair - 0.3), 1.0)];

    let nodes = vec![date(2027, 1, 15), date(2029, 1, 15)];
    let mut spread_model =
        BondCurveModelNP::new(Arc::clone(&base), universe.clone(), Some(nodes)).unwrap();
    let fitted = spread_model.build().unwrap();

    let model_price = universe[0].0.model_price(|d| fitted.df(d)).unwrap();
    assert_relative_eq!(model_price, universe[0].0.market_price(), epsilon = 1e-6);
}
