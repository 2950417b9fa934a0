//! Pure fill-application rules: weighted-average cost on adds, realized
//! P&L on reduces. No IO, no time, no broker wiring.

use std::collections::BTreeMap;

use tc_money::{Decimal4, Rounding};

use crate::types::{CashEntry, Fill, LedgerEntry, Portfolio, Position, Side};

/// Apply a ledger entry to the portfolio (incremental) and append it.
pub fn apply_entry(pf: &mut Portfolio, entry: LedgerEntry) {
    match &entry {
        LedgerEntry::Fill(f) => apply_fill(pf, f),
        LedgerEntry::Cash(c) => apply_cash(pf, c),
    }
    pf.ledger.push(entry);
}

fn apply_cash(pf: &mut Portfolio, c: &CashEntry) {
    pf.cash = pf.cash.checked_add(c.amount).expect("cash overflow");
}

/// Weighted average of `prior_qty @ prior_avg` extended by `add_qty @ add_price`.
fn weighted_avg(prior_qty: i64, prior_avg: Decimal4, add_qty: i64, add_price: Decimal4) -> Decimal4 {
    let prior_notional = prior_avg
        .checked_mul_qty(prior_qty, Rounding::HalfEven)
        .expect("weighted avg overflow");
    let add_notional = add_price
        .checked_mul_qty(add_qty, Rounding::HalfEven)
        .expect("weighted avg overflow");
    let total_notional = prior_notional
        .checked_add(add_notional)
        .expect("weighted avg overflow");
    let new_qty = Decimal4::from_scaled_i128((prior_qty as i128 + add_qty as i128) * 10_000);
    total_notional
        .checked_div(new_qty, Rounding::HalfEven)
        .expect("weighted avg division by zero")
}

/// Apply a fill to a position at weighted-average cost.
///
/// Rules:
/// - Extending the current direction (or opening from flat) folds the new
///   quantity into a weighted-average entry price.
/// - Trading against the current direction realizes P&L on the covered
///   quantity at the position's existing average entry price; any quantity
///   beyond full cover flips the position and opens a fresh average at the
///   fill price.
/// - Cash moves by notional plus fee regardless of direction.
pub fn apply_fill(pf: &mut Portfolio, f: &Fill) {
    debug_assert!(f.qty > 0);
    debug_assert!(!f.price.is_negative());
    debug_assert!(!f.fee.is_negative());

    let notional = f
        .price
        .checked_mul_qty(f.qty, Rounding::Down)
        .expect("notional overflow");

    match f.side {
        Side::Buy => {
            pf.cash = pf
                .cash
                .checked_sub(notional)
                .and_then(|c| c.checked_sub(f.fee))
                .expect("cash underflow");
        }
        Side::Sell => {
            pf.cash = pf
                .cash
                .checked_add(notional)
                .and_then(|c| c.checked_sub(f.fee))
                .expect("cash underflow");
        }
    }
    pf.total_commission_paid = pf
        .total_commission_paid
        .checked_add(f.fee)
        .expect("commission overflow");

    let sym = f.symbol.clone();
    let pos = pf
        .positions
        .entry(sym.clone())
        .or_insert_with(|| Position::new(sym.clone(), f.asset_class));

    let realized = match f.side {
        Side::Buy => apply_buy(pos, f.qty, f.price, f.fee),
        Side::Sell => apply_sell(pos, f.qty, f.price, f.fee),
    };
    pos.realized_pnl = pos
        .realized_pnl
        .checked_add(realized)
        .expect("realized pnl overflow");
    pf.total_realized_pnl = pf
        .total_realized_pnl
        .checked_add(realized)
        .expect("realized pnl overflow");

    if pos.is_flat() {
        pf.positions.remove(&sym);
    }
}

/// Folds a buy into `pos`. Returns realized P&L (nonzero only when the
/// buy covers an existing short), net of the fill's commission.
fn apply_buy(pos: &mut Position, qty: i64, price: Decimal4, fee: Decimal4) -> Decimal4 {
    if pos.quantity >= 0 {
        pos.avg_entry_price = weighted_avg(pos.quantity, pos.avg_entry_price, qty, price);
        pos.quantity += qty;
        return Decimal4::ZERO;
    }

    let short_qty = -pos.quantity;
    let covered = short_qty.min(qty);
    let gross = pos
        .avg_entry_price
        .checked_sub(price)
        .and_then(|diff| diff.checked_mul_qty(covered, Rounding::HalfEven))
        .expect("short cover pnl overflow");
    let realized = gross.checked_sub(fee).expect("short cover pnl overflow");

    let remainder = qty - covered;
    pos.quantity += covered;
    if remainder > 0 {
        // flips to long: the covered short is fully closed, open a fresh
        // average at the fill price for the excess.
        pos.quantity = remainder;
        pos.avg_entry_price = price;
    } else if pos.quantity == 0 {
        pos.avg_entry_price = Decimal4::ZERO;
    }
    realized
}

/// Folds a sell into `pos`. Returns realized P&L (nonzero only when the
/// sell reduces an existing long), net of the fill's commission.
fn apply_sell(pos: &mut Position, qty: i64, price: Decimal4, fee: Decimal4) -> Decimal4 {
    if pos.quantity <= 0 {
        let add_qty = -qty; // extend short: negative quantity units
        pos.avg_entry_price = weighted_avg(-pos.quantity, pos.avg_entry_price, qty, price);
        pos.quantity += add_qty;
        return Decimal4::ZERO;
    }

    let long_qty = pos.quantity;
    let sold = long_qty.min(qty);
    let gross = price
        .checked_sub(pos.avg_entry_price)
        .and_then(|diff| diff.checked_mul_qty(sold, Rounding::HalfEven))
        .expect("long sell pnl overflow");
    let realized = gross.checked_sub(fee).expect("long sell pnl overflow");

    let remainder = qty - sold;
    pos.quantity -= sold;
    if remainder > 0 {
        // flips to short: fresh average at the fill price for the excess.
        pos.quantity = -remainder;
        pos.avg_entry_price = price;
    } else if pos.quantity == 0 {
        pos.avg_entry_price = Decimal4::ZERO;
    }
    realized
}

/// Recompute portfolio state from the ledger (source of truth). Used as
/// the determinism cross-check against incrementally maintained state.
pub fn recompute_from_ledger(
    initial_cash: Decimal4,
    ledger: &[LedgerEntry],
) -> (Decimal4, Decimal4, BTreeMap<String, Position>) {
    let mut pf = Portfolio::new(initial_cash);
    for entry in ledger {
        match entry {
            LedgerEntry::Cash(c) => apply_cash(&mut pf, c),
            LedgerEntry::Fill(f) => apply_fill(&mut pf, f),
        }
    }
    (pf.cash, pf.total_realized_pnl, pf.positions)
}
