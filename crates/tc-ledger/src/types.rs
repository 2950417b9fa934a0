use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use tc_money::{Decimal4, FxRate};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// An open acquisition parcel awaiting consumption by a later sell.
/// Consumed in ascending `acquisition_date` order (FIFO).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    pub acquisition_date: NaiveDate,
    pub remaining_qty: i64,
    pub cost_basis_per_unit: Decimal4,
    pub currency: String,
    pub fx_rate_to_aud: FxRate,
}

/// One matched parcel's contribution to a sell, for the per-parcel
/// cost-basis breakdown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedParcel {
    pub acquisition_date: NaiveDate,
    pub quantity: i64,
    pub cost_basis_per_unit: Decimal4,
}

/// A persistent trade record. Created for every executed fill; a buy's CGT
/// fields stay `None` (a buy realizes nothing), a sell's are filled in once
/// FIFO matching against open parcels completes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: i64,
    pub price: Decimal4,
    pub commission: Decimal4,
    pub timestamp: NaiveDate,
    pub currency: String,
    pub fx_rate_to_aud: FxRate,
    pub total_value: Decimal4,
    pub total_value_aud: Decimal4,
    pub signal_confidence: u8,

    // CGT annotations — populated only for sells.
    pub acquisition_date: Option<NaiveDate>,
    pub cost_basis_per_unit: Option<Decimal4>,
    pub cost_basis_total: Option<Decimal4>,
    pub matched_parcels: Vec<MatchedParcel>,
    pub holding_period_days: Option<i64>,
    pub cgt_discount_eligible: Option<bool>,
    pub cgt_gross_gain: Option<Decimal4>,
    pub cgt_gross_loss: Option<Decimal4>,
    pub cgt_net_gain: Option<Decimal4>,
    pub tax_year: Option<String>,
}

/// Invariant and usage errors surfaced by [`crate::CgtLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CgtError {
    NonPositiveQty { qty: i64 },
    NonPositivePrice { price: Decimal4 },
    InvalidSignalConfidence { value: u8 },
    EmptySymbol,
    InsufficientParcels { symbol: String, requested: i64, available: i64 },
}

impl std::fmt::Display for CgtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveQty { qty } => write!(f, "trade quantity must be > 0, got {qty}"),
            Self::NonPositivePrice { price } => {
                write!(f, "trade price must be > 0, got {price}")
            }
            Self::InvalidSignalConfidence { value } => {
                write!(f, "signal_confidence must be in [0, 100], got {value}")
            }
            Self::EmptySymbol => write!(f, "symbol must not be empty"),
            Self::InsufficientParcels {
                symbol,
                requested,
                available,
            } => write!(
                f,
                "sell of {requested} {symbol} exceeds {available} held in open parcels"
            ),
        }
    }
}

impl std::error::Error for CgtError {}
