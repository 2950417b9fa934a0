//! Cost model and run parameters for a backtest.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tc_money::Decimal4;

/// Commission and slippage model applied to every simulated fill, plus
/// the sizing rule used when a decision doesn't specify its own quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    pub initial_cash: Decimal4,
    pub commission_per_share: Decimal4,
    pub commission_per_trade: Decimal4,
    /// Percent of notional, in `[0, 100]`.
    pub commission_percent: Decimal4,
    pub min_commission: Decimal4,
    pub max_commission: Option<Decimal4>,
    /// Percent of price, in `[0, 100]`.
    pub slippage_percent: Decimal4,
    /// Fractional-share sizing is not modeled; [`Position`] quantities are
    /// whole shares regardless of this flag. Retained so a config loaded
    /// from the same surface as the live executor round-trips faithfully.
    pub allow_fractional_shares: bool,
    /// Percent of equity, in `(0, 100]`, used to size a BUY when the
    /// decision doesn't supply a `recommended_quantity`.
    pub max_position_size_percent: Decimal4,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            initial_cash: Decimal4::from_scaled_i128(100_000 * 10_000),
            commission_per_share: Decimal4::ZERO,
            commission_per_trade: Decimal4::rounded(dec!(1.0), tc_money::Rounding::Down),
            commission_percent: Decimal4::ZERO,
            min_commission: Decimal4::ZERO,
            max_commission: None,
            slippage_percent: Decimal4::ZERO,
            allow_fractional_shares: false,
            max_position_size_percent: Decimal4::rounded(dec!(10.0), tc_money::Rounding::Down),
        }
    }
}

/// A full backtest run specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub name: String,
    pub tickers: Vec<String>,
    /// Drives the trading-day calendar the day loop iterates over.
    pub primary_ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Trading days at the start of the range during which decisions are
    /// consulted (so indicators can warm up) but no orders are placed.
    pub warmup_period: i64,
    pub interval: String,
    pub portfolio: PortfolioConfig,
    pub benchmark_ticker: Option<String>,
    /// Annualized, e.g. `0.02` for 2%.
    pub risk_free_rate: Decimal4,
}
