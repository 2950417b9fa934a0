//! Rule inputs, violation records, and the per-user limit configuration.

use std::collections::BTreeMap;

use tc_money::Decimal4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    PositionSize,
    PositionValue,
    Concentration,
    TotalPositions,
    DailyLossAbsolute,
    DailyLossPercent,
    DrawdownAbsolute,
    DrawdownPercent,
    SingleTradeLoss,
    ConsecutiveLosses,
    CoolingOffPeriod,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub rule_type: RuleType,
    pub rule_name: String,
    pub message: String,
    pub current_value: Decimal4,
    pub limit_value: Decimal4,
    pub severity: Severity,
    pub metadata: BTreeMap<String, String>,
}

impl Violation {
    pub fn new(
        rule_type: RuleType,
        rule_name: impl Into<String>,
        message: impl Into<String>,
        current_value: Decimal4,
        limit_value: Decimal4,
        severity: Severity,
    ) -> Self {
        Self {
            rule_type,
            rule_name: rule_name.into(),
            message: message.into(),
            current_value,
            limit_value,
            severity,
            metadata: BTreeMap::new(),
        }
    }
}

/// The order-in-context: what a pending order would do to the portfolio,
/// shared across every rule so none of them re-derives it independently.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub symbol: String,
    pub side: Side,
    pub order_qty: i64,
    /// Existing signed position quantity in `symbol` (0 if none).
    pub current_qty: i64,
    pub estimated_price: Decimal4,
    pub equity: Decimal4,
    /// Number of distinct symbols the portfolio currently holds.
    pub open_position_count: usize,
    /// True only for a BUY that would open a symbol the portfolio does not
    /// already hold — the only case rule 4 (total positions) restricts.
    pub opens_new_symbol: bool,
}

impl ValidationContext {
    /// Signed quantity after the order fills.
    pub fn resulting_qty(&self) -> i64 {
        match self.side {
            Side::Buy => self.current_qty + self.order_qty,
            Side::Sell => self.current_qty - self.order_qty,
        }
    }

    pub fn estimated_order_value(&self) -> Decimal4 {
        self.estimated_price
            .checked_mul_qty(self.order_qty, tc_money::Rounding::Down)
            .unwrap_or(Decimal4::ZERO)
    }
}

/// Pre-trade limit configuration. Every limit is optional — `None` means
/// the rule is not enforced.
#[derive(Debug, Clone)]
pub struct RiskLimits {
    pub max_position_size: Option<i64>,
    pub max_position_size_overrides: BTreeMap<String, i64>,
    pub max_position_value: Option<Decimal4>,
    pub max_concentration_percent: Option<Decimal4>,
    pub max_total_positions: Option<usize>,
    pub max_daily_loss: Option<Decimal4>,
    pub max_daily_loss_percent: Option<Decimal4>,
    pub max_drawdown: Option<Decimal4>,
    pub max_drawdown_percent: Option<Decimal4>,
    pub max_single_trade_loss: Option<Decimal4>,
    pub max_consecutive_losses: Option<u32>,
    pub cooling_off_period_minutes: i64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_size: None,
            max_position_size_overrides: BTreeMap::new(),
            max_position_value: None,
            max_concentration_percent: None,
            max_total_positions: None,
            max_daily_loss: None,
            max_daily_loss_percent: None,
            max_drawdown: None,
            max_drawdown_percent: None,
            max_single_trade_loss: None,
            max_consecutive_losses: None,
            cooling_off_period_minutes: 0,
        }
    }
}

impl RiskLimits {
    pub fn position_size_limit_for(&self, symbol: &str) -> Option<i64> {
        self.max_position_size_overrides
            .get(symbol)
            .copied()
            .or(self.max_position_size)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiskCheckResponse {
    pub passed: bool,
    pub violations: Vec<Violation>,
}

impl RiskCheckResponse {
    pub fn allow() -> Self {
        Self { passed: true, violations: Vec::new() }
    }
}
