//! Backtest engine: a deterministic day-loop replay of OHLCV bars through
//! a decision callback, commission/slippage model, and the same FIFO CGT
//! ledger the live pipeline uses, producing an equity curve and
//! performance metrics.

mod commission;
mod config;
mod curve;
mod decision;
mod engine;
mod metrics;
mod result;

pub use commission::{apply_slippage, commission};
pub use config::{BacktestConfig, PortfolioConfig};
pub use curve::EquityCurvePoint;
pub use decision::{DecisionContext, DecisionSignal, Strategy, TradingDecision};
pub use engine::{BacktestEngine, EngineError};
pub use metrics::{calculate as calculate_metrics, MetricsError, PerformanceMetrics};
pub use result::{BacktestResult, BacktestStatus};
