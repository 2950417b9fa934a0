//! The callback contract between a strategy and the day loop.

use chrono::NaiveDate;
use tc_marketdata::{Bar, Indicators};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSignal {
    Buy,
    Sell,
    Hold,
}

/// A strategy's verdict for one ticker on one day. `recommended_quantity`
/// overrides the engine's percent-of-equity sizing on a BUY; it has no
/// effect on SELL, which always liquidates the full position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingDecision {
    pub signal: DecisionSignal,
    pub recommended_quantity: Option<i64>,
}

impl TradingDecision {
    pub fn hold() -> Self {
        Self { signal: DecisionSignal::Hold, recommended_quantity: None }
    }

    pub fn buy(recommended_quantity: Option<i64>) -> Self {
        Self { signal: DecisionSignal::Buy, recommended_quantity }
    }

    pub fn sell() -> Self {
        Self { signal: DecisionSignal::Sell, recommended_quantity: None }
    }
}

/// Everything a decision callback sees for one ticker on one day. No
/// lookahead: `bar` and `indicators` are the data available as of the
/// close of `date`, never a future bar.
pub struct DecisionContext<'a> {
    pub ticker: &'a str,
    pub date: NaiveDate,
    pub bar: &'a Bar,
    pub indicators: Option<&'a Indicators>,
    pub holding: bool,
}

/// A strategy function: ticker + date + market context in, a verdict out.
pub type Strategy<'s> = dyn FnMut(&DecisionContext) -> TradingDecision + 's;
