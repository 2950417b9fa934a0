//! Ledger abstraction — makes weighted-average-cost and realized-PnL rules
//! explicit and isolated.
//!
//! [`accounting`](crate::accounting) contains the raw fill-application
//! mechanics. This module wraps them behind a typed, append-only [`Ledger`]
//! façade that:
//!
//! - Enforces ledger invariants on every append (no zero/negative qty,
//!   price, or fee; symbol must be non-empty).
//! - Exposes only the minimal write surface (`append_fill`, `append_cash`).
//! - Provides read-only snapshot views of cash, positions, and PnL.
//! - Keeps fill mechanics in `accounting.rs` while this module owns the
//!   invariant-checking boundary.
//!
//! # Determinism
//! `Ledger` is deterministic and pure — no IO, no time, no randomness. Two
//! `Ledger` instances fed the same sequence of entries always produce
//! identical state.

use std::collections::BTreeMap;

use tc_money::Decimal4;

use crate::{
    accounting::{apply_fill, recompute_from_ledger},
    types::{AssetClass, CashEntry, Fill, LedgerEntry, Portfolio, Position},
    MarkMap,
};

/// All invariant violations that `Ledger` can surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// `Fill.qty` must be strictly positive.
    NonPositiveQty { qty: i64 },
    /// `Fill.price` must be strictly positive.
    NonPositivePrice { price: Decimal4 },
    /// `Fill.fee` must be non-negative.
    NegativeFee { fee: Decimal4 },
    /// `Fill.symbol` (or cash entry reason) must be non-empty.
    EmptySymbol,
    /// The sequence number supplied is not strictly greater than the last.
    OutOfOrderSeqNo { supplied: u64, last: u64 },
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveQty { qty } => {
                write!(f, "ledger invariant: qty must be > 0, got {qty}")
            }
            Self::NonPositivePrice { price } => {
                write!(f, "ledger invariant: price must be > 0, got {price}")
            }
            Self::NegativeFee { fee } => {
                write!(f, "ledger invariant: fee must be >= 0, got {fee}")
            }
            Self::EmptySymbol => write!(f, "ledger invariant: symbol must not be empty"),
            Self::OutOfOrderSeqNo { supplied, last } => write!(
                f,
                "ledger invariant: seq_no {supplied} is not > last {last}"
            ),
        }
    }
}

impl std::error::Error for LedgerError {}

/// A point-in-time read-only view of the ledger's derived state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub cash: Decimal4,
    pub realized_pnl: Decimal4,
    pub positions: BTreeMap<String, Position>,
    pub entry_count: usize,
    pub last_seq_no: u64,
}

impl LedgerSnapshot {
    pub fn qty_signed(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).map(|p| p.quantity).unwrap_or(0)
    }

    pub fn is_flat(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Append-only ledger façade with invariant enforcement.
///
/// Internally delegates all fill arithmetic to [`accounting`](crate::accounting).
/// The `Ledger` struct only owns the append boundary and the portfolio state.
#[derive(Clone, Debug)]
pub struct Ledger {
    state: Portfolio,
    last_seq_no: u64,
}

impl Ledger {
    /// Create a new ledger with the given initial cash balance.
    ///
    /// Does not reject a negative initial cash balance; that represents an
    /// overdrawn account and is the caller's policy decision.
    pub fn new(initial_cash: Decimal4) -> Self {
        Self {
            state: Portfolio::new(initial_cash),
            last_seq_no: 0,
        }
    }

    /// Append a fill entry, enforcing all invariants.
    ///
    /// The ledger is **not** mutated if validation fails.
    pub fn append_fill(&mut self, fill: Fill) -> Result<(), LedgerError> {
        Self::validate_fill(&fill)?;
        apply_fill(&mut self.state, &fill);
        self.state.ledger.push(LedgerEntry::Fill(fill));
        Ok(())
    }

    /// Append a fill with an explicit monotonic sequence number.
    ///
    /// `seq_no` must be strictly greater than the last recorded sequence
    /// number.
    pub fn append_fill_seq(&mut self, fill: Fill, seq_no: u64) -> Result<(), LedgerError> {
        if seq_no <= self.last_seq_no {
            return Err(LedgerError::OutOfOrderSeqNo {
                supplied: seq_no,
                last: self.last_seq_no,
            });
        }
        Self::validate_fill(&fill)?;
        apply_fill(&mut self.state, &fill);
        self.state.ledger.push(LedgerEntry::Fill(fill));
        self.last_seq_no = seq_no;
        Ok(())
    }

    /// Append a cash adjustment entry (positive = credit, negative = debit).
    ///
    /// Reason must be non-empty; amount may be any signed value.
    pub fn append_cash(
        &mut self,
        amount: Decimal4,
        reason: impl Into<String>,
    ) -> Result<(), LedgerError> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(LedgerError::EmptySymbol);
        }
        let entry = CashEntry::new(amount, reason);
        self.state.cash = self.state.cash.checked_add(amount).expect("cash overflow");
        self.state.ledger.push(LedgerEntry::Cash(entry));
        Ok(())
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            cash: self.state.cash,
            realized_pnl: self.state.total_realized_pnl,
            positions: self.state.positions.clone(),
            entry_count: self.state.ledger.len(),
            last_seq_no: self.last_seq_no,
        }
    }

    pub fn cash(&self) -> Decimal4 {
        self.state.cash
    }

    pub fn realized_pnl(&self) -> Decimal4 {
        self.state.total_realized_pnl
    }

    pub fn entry_count(&self) -> usize {
        self.state.ledger.len()
    }

    pub fn qty_signed(&self, symbol: &str) -> i64 {
        self.state
            .positions
            .get(symbol)
            .map(|p| p.quantity)
            .unwrap_or(0)
    }

    pub fn is_flat(&self) -> bool {
        self.state.positions.is_empty()
    }

    /// Recompute state from the stored ledger entries and verify it matches
    /// the running incremental state. Returns `true` if consistent.
    ///
    /// This is an **integrity check** — expensive (O(n) replay) — for use in
    /// tests, startup verification, or audit flows only.
    pub fn verify_integrity(&self) -> bool {
        let (cash, realized, positions) =
            recompute_from_ledger(self.state.initial_cash, &self.state.ledger);
        cash == self.state.cash
            && realized == self.state.total_realized_pnl
            && positions == self.state.positions
    }

    /// Compute mark-to-market equity: `cash + Σ(qty × mark)`.
    pub fn equity(&self, marks: &MarkMap) -> Decimal4 {
        crate::metrics::compute_equity(self.state.cash, &self.state.positions, marks)
    }

    /// Compute unrealized PnL across positions at the given marks.
    pub fn unrealized_pnl(&self, marks: &MarkMap) -> Decimal4 {
        crate::metrics::compute_unrealized_pnl(&self.state.positions, marks)
    }

    fn validate_fill(fill: &Fill) -> Result<(), LedgerError> {
        if fill.symbol.trim().is_empty() {
            return Err(LedgerError::EmptySymbol);
        }
        if fill.qty <= 0 {
            return Err(LedgerError::NonPositiveQty { qty: fill.qty });
        }
        if fill.price.is_zero() || fill.price.is_negative() {
            return Err(LedgerError::NonPositivePrice { price: fill.price });
        }
        if fill.fee.is_negative() {
            return Err(LedgerError::NegativeFee { fee: fill.fee });
        }
        Ok(())
    }
}
