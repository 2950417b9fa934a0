//! Capital-gains-tax trade ledger: records every executed fill as a
//! [`TradeRecord`], matching sells against open FIFO acquisition parcels
//! and annotating the result with holding period, discount eligibility,
//! and AUD-denominated gain or loss.

mod fifo;
mod tax_year;
mod types;

pub use fifo::CgtLedger;
pub use tax_year::{derive_tax_year, discount_eligible, holding_period_days};
pub use types::{CgtError, MatchedParcel, Parcel, Side, TradeRecord};
