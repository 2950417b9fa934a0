//! The outcome of a backtest run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tc_ledger::TradeRecord;
use tc_money::Decimal4;

use crate::curve::EquityCurvePoint;
use crate::metrics::PerformanceMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BacktestStatus {
    Completed,
    Failed,
}

/// A data-load or internal error during a run is captured here rather
/// than raised — a backtest result is always produced, success or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub status: BacktestStatus,
    pub name: String,
    pub tickers: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub initial_cash: Decimal4,
    pub equity_curve: Vec<EquityCurvePoint>,
    pub trades: Vec<TradeRecord>,
    pub total_trades: usize,
    pub trading_days: usize,
    pub end_equity: Decimal4,
    pub metrics: Option<PerformanceMetrics>,
    pub error_message: Option<String>,
}

impl BacktestResult {
    pub fn failed(name: impl Into<String>, tickers: Vec<String>, start: NaiveDate, end: NaiveDate, initial_cash: Decimal4, error_message: impl Into<String>) -> Self {
        Self {
            status: BacktestStatus::Failed,
            name: name.into(),
            tickers,
            start,
            end,
            initial_cash,
            equity_curve: Vec::new(),
            trades: Vec::new(),
            total_trades: 0,
            trading_days: 0,
            end_equity: initial_cash,
            metrics: None,
            error_message: Some(error_message.into()),
        }
    }
}
