//! Mark-to-market equity curve: one point per trading day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tc_money::Decimal4;

/// One day's mark-to-market snapshot.
///
/// Invariant: `equity == cash + positions_value` and `drawdown ==
/// max(0, peak_equity_as_of_this_point − equity)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityCurvePoint {
    pub date: NaiveDate,
    pub cash: Decimal4,
    pub positions_value: Decimal4,
    pub equity: Decimal4,
    pub peak_equity: Decimal4,
    pub drawdown: Decimal4,
    /// `None` on the first point; every point after has a prior point to
    /// compute a return against.
    pub daily_return: Option<f64>,
}

impl EquityCurvePoint {
    pub fn new(date: NaiveDate, cash: Decimal4, positions_value: Decimal4, running_peak: Decimal4, prior_equity: Option<Decimal4>) -> (Self, Decimal4) {
        let equity = cash.checked_add(positions_value).expect("equity overflow");
        let peak_equity = if equity.raw() > running_peak.raw() { equity } else { running_peak };
        let drawdown = peak_equity.checked_sub(equity).expect("drawdown overflow");
        let drawdown = if drawdown.is_negative() { Decimal4::ZERO } else { drawdown };
        let daily_return = prior_equity.and_then(|prior| {
            if prior.is_zero() {
                None
            } else {
                Some((equity.raw() - prior.raw()) / prior.raw())
            }
            .map(|r| r.to_string().parse::<f64>().unwrap_or(0.0))
        });
        (
            Self { date, cash, positions_value, equity, peak_equity, drawdown, daily_return },
            peak_equity,
        )
    }
}
