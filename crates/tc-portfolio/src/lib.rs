//! Portfolio & accounting model
//!
//! - Fill-driven ledger is the source of truth.
//! - Weighted-average cost on adds, realized P&L on reduces.
//! - Equity and exposure metrics.
//! - Max gross exposure enforcement.
//! - Pure deterministic logic (no IO, no time, no broker wiring).

mod accounting;
mod metrics;
mod ordering;
mod types;

pub mod ledger;

pub use accounting::{apply_entry, apply_fill, recompute_from_ledger};
pub use ledger::{Ledger, LedgerError, LedgerSnapshot};

pub use metrics::{
    compute_equity, compute_exposure, compute_unrealized_pnl, enforce_max_gross_exposure,
    EquityMetrics, ExposureBreach, ExposureMetrics,
};

pub use ordering::{apply_fills_canonical, sort_fills_canonical, TaggedFill};

pub use types::{
    AssetClass, CashEntry, Fill, LedgerEntry, Portfolio, Position, PositionSide, Side,
};

use std::collections::BTreeMap;

use tc_money::Decimal4;

/// Canonical mark map type (symbol -> current price).
pub type MarkMap = BTreeMap<String, Decimal4>;

/// Helper to build a MarkMap with minimal boilerplate.
pub fn marks<I, S>(items: I) -> MarkMap
where
    I: IntoIterator<Item = (S, Decimal4)>,
    S: Into<String>,
{
    let mut m = MarkMap::new();
    for (sym, px) in items {
        m.insert(sym.into(), px);
    }
    m
}
