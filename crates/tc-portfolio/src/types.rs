use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use tc_money::{Decimal4, Rounding};

/// BUY or SELL for fills.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// Direction a held [`Position`] currently faces. `Flat` is transient —
/// a flat position is removed from the portfolio, never retained.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
    Flat,
}

/// Coarse instrument classification carried on every [`Fill`], so a
/// freshly-opened [`Position`] knows its own asset class without a
/// round trip through a symbol classifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetClass {
    Equity,
    Etf,
    Crypto,
    Future,
    Option,
    Forex,
}

/// A single executed fill (the accounting atom).
///
/// qty is always positive; direction comes from `side`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub symbol: String,
    pub side: Side,
    pub qty: i64,
    pub price: Decimal4,
    pub fee: Decimal4,
    pub asset_class: AssetClass,
}

impl Fill {
    pub fn new<S: Into<String>>(
        symbol: S,
        side: Side,
        qty: i64,
        price: Decimal4,
        fee: Decimal4,
        asset_class: AssetClass,
    ) -> Self {
        debug_assert!(qty > 0, "Fill.qty must be > 0");
        debug_assert!(!price.is_negative(), "Fill.price must be >= 0");
        debug_assert!(!fee.is_negative(), "Fill.fee must be >= 0");
        Self {
            symbol: symbol.into(),
            side,
            qty,
            price,
            fee,
            asset_class,
        }
    }
}

/// A cash-only entry (deposits, withdrawals, dividends, adjustments).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashEntry {
    pub amount: Decimal4,
    pub reason: String,
}

impl CashEntry {
    pub fn new<S: Into<String>>(amount: Decimal4, reason: S) -> Self {
        Self {
            amount,
            reason: reason.into(),
        }
    }
}

/// One entry in the portfolio's append-only ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEntry {
    Fill(Fill),
    Cash(CashEntry),
}

/// An open position, carried at weighted-average cost.
///
/// Invariant: the sign of `quantity` determines `side`; `market_value ==
/// |quantity| * current_price`; `cost_basis == |quantity| * avg_entry_price`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: i64,
    pub avg_entry_price: Decimal4,
    pub current_price: Decimal4,
    pub realized_pnl: Decimal4,
    pub asset_class: AssetClass,
}

impl Position {
    pub fn new<S: Into<String>>(symbol: S, asset_class: AssetClass) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: 0,
            avg_entry_price: Decimal4::ZERO,
            current_price: Decimal4::ZERO,
            realized_pnl: Decimal4::ZERO,
            asset_class,
        }
    }

    pub fn side(&self) -> PositionSide {
        if self.quantity > 0 {
            PositionSide::Long
        } else if self.quantity < 0 {
            PositionSide::Short
        } else {
            PositionSide::Flat
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }

    pub fn market_value(&self) -> Decimal4 {
        self.current_price
            .checked_mul_qty(self.quantity.abs(), Rounding::Down)
            .expect("market value overflow")
    }

    pub fn cost_basis(&self) -> Decimal4 {
        self.avg_entry_price
            .checked_mul_qty(self.quantity.abs(), Rounding::Down)
            .expect("cost basis overflow")
    }

    /// Mark-to-market unrealized P&L at `current_price`.
    pub fn unrealized_pnl(&self) -> Decimal4 {
        if self.quantity == 0 {
            return Decimal4::ZERO;
        }
        let diff = if self.quantity > 0 {
            self.current_price.checked_sub(self.avg_entry_price)
        } else {
            self.avg_entry_price.checked_sub(self.current_price)
        }
        .expect("unrealized pnl diff overflow");
        diff.checked_mul_qty(self.quantity.abs(), Rounding::Down)
            .expect("unrealized pnl overflow")
    }

    pub fn mark(&mut self, price: Decimal4) {
        self.current_price = price;
    }
}

/// The portfolio state derived from a ledger stream.
///
/// `ledger` is the source of truth; `cash`, `positions`, and
/// `total_realized_pnl` are derived and maintained incrementally by
/// [`crate::apply_entry`] / [`crate::apply_fill`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    pub initial_cash: Decimal4,
    pub cash: Decimal4,
    pub total_realized_pnl: Decimal4,
    pub total_commission_paid: Decimal4,
    pub daily_pnl: Decimal4,
    pub peak_equity: Decimal4,
    pub ledger: Vec<LedgerEntry>,
    pub positions: BTreeMap<String, Position>,
    pub pending_orders: BTreeSet<String>,
}

impl Portfolio {
    pub fn new(initial_cash: Decimal4) -> Self {
        Self {
            initial_cash,
            cash: initial_cash,
            total_realized_pnl: Decimal4::ZERO,
            total_commission_paid: Decimal4::ZERO,
            daily_pnl: Decimal4::ZERO,
            peak_equity: initial_cash,
            ledger: Vec::new(),
            positions: BTreeMap::new(),
            pending_orders: BTreeSet::new(),
        }
    }
}
