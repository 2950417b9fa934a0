//! Exposure and equity metrics derived from positions and marks.

use std::collections::BTreeMap;

use tc_money::{Decimal4, Rounding};

use crate::types::Position;
use crate::MarkMap;

fn mark_of(marks: &MarkMap, symbol: &str) -> Decimal4 {
    marks.get(symbol).copied().unwrap_or(Decimal4::ZERO)
}

/// Exposure metrics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExposureMetrics {
    pub gross_exposure: Decimal4,
    pub net_exposure: Decimal4,
}

/// Equity metrics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EquityMetrics {
    pub equity: Decimal4,
    pub unrealized_pnl: Decimal4,
    pub realized_pnl: Decimal4,
    pub exposure: ExposureMetrics,
}

/// Compute exposure from positions and marks.
///
/// gross = Σ |qty| * mark, net = Σ qty * mark.
pub fn compute_exposure(positions: &BTreeMap<String, Position>, marks: &MarkMap) -> ExposureMetrics {
    let mut gross = Decimal4::ZERO;
    let mut net = Decimal4::ZERO;

    for (sym, pos) in positions {
        let mark = mark_of(marks, sym);
        let gross_leg = mark
            .checked_mul_qty(pos.quantity.abs(), Rounding::Down)
            .expect("gross exposure overflow");
        let net_leg = mark
            .checked_mul_qty(pos.quantity, Rounding::Down)
            .expect("net exposure overflow");
        gross = gross.checked_add(gross_leg).expect("gross exposure overflow");
        net = net.checked_add(net_leg).expect("net exposure overflow");
    }

    ExposureMetrics {
        gross_exposure: gross,
        net_exposure: net,
    }
}

/// Compute unrealized PnL across positions at the given marks.
pub fn compute_unrealized_pnl(positions: &BTreeMap<String, Position>, marks: &MarkMap) -> Decimal4 {
    let mut pnl = Decimal4::ZERO;
    for (sym, pos) in positions {
        let mark = mark_of(marks, sym);
        let mut marked = pos.clone();
        marked.mark(mark);
        pnl = pnl
            .checked_add(marked.unrealized_pnl())
            .expect("unrealized pnl overflow");
    }
    pnl
}

/// Compute equity = cash + Σ(qty * mark).
pub fn compute_equity(
    cash: Decimal4,
    positions: &BTreeMap<String, Position>,
    marks: &MarkMap,
) -> Decimal4 {
    let mut equity = cash;
    for (sym, pos) in positions {
        let mark = mark_of(marks, sym);
        let leg = mark
            .checked_mul_qty(pos.quantity, Rounding::Down)
            .expect("equity overflow");
        equity = equity.checked_add(leg).expect("equity overflow");
    }
    equity
}

/// Exposure breach error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExposureBreach {
    pub gross_exposure: Decimal4,
    pub max_gross_exposure: Decimal4,
}

/// Enforce a max gross exposure limit.
pub fn enforce_max_gross_exposure(
    positions: &BTreeMap<String, Position>,
    marks: &MarkMap,
    max_gross_exposure: Decimal4,
) -> Result<(), ExposureBreach> {
    let exposure = compute_exposure(positions, marks);
    if exposure.gross_exposure > max_gross_exposure {
        Err(ExposureBreach {
            gross_exposure: exposure.gross_exposure,
            max_gross_exposure,
        })
    } else {
        Ok(())
    }
}
