//! The trading-signal shape consumed by [`crate::convert`] — the common
//! currency between a rule-based strategy, a backtest decision, and a
//! flattened LLM-agent `TradingDecision`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tc_money::Decimal4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SignalType {
    Buy,
    Sell,
    Hold,
    CloseLong,
    CloseShort,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TradingSignal {
    pub symbol: String,
    pub signal_type: SignalType,
    pub strength: Decimal4,
    /// Confidence in `[0, 1]` expressed at price scale (e.g. `0.7500`).
    pub confidence: Decimal4,
    pub price_at_signal: Option<Decimal4>,
    pub target_price: Option<Decimal4>,
    pub stop_loss_price: Option<Decimal4>,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub metadata: BTreeMap<String, String>,
}

impl TradingSignal {
    pub fn side(&self) -> Option<tc_broker::Side> {
        match self.signal_type {
            SignalType::Buy | SignalType::CloseShort => Some(tc_broker::Side::Buy),
            SignalType::Sell | SignalType::CloseLong => Some(tc_broker::Side::Sell),
            SignalType::Hold => None,
        }
    }
}
