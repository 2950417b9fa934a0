//! Pre-trade risk management: position, concentration and loss limits, a
//! cooling-off latch that overrides every other rule while engaged, and a
//! pluggable slot for strategy-specific rules.

mod engine;
mod rules;
mod types;

pub use engine::RiskManager;
pub use rules::{
    concentration, consecutive_losses, daily_loss_absolute, daily_loss_percent, drawdown_absolute,
    drawdown_percent, position_size, position_value, single_trade_loss, total_positions,
};
pub use types::{RiskCheckResponse, RiskLimits, RuleType, Severity, Side, ValidationContext, Violation};
