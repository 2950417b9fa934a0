//! Individual rule evaluators. Each takes the shared [`ValidationContext`]
//! plus whatever running state it needs and returns `Some(Violation)` or
//! `None`. Pure functions — no locking, no time lookups beyond what the
//! caller already resolved.

use tc_money::{Decimal4, Rounding};

use crate::types::{RiskLimits, RuleType, Severity, ValidationContext, Violation};

fn hundred() -> Decimal4 {
    Decimal4::from_scaled_i128(100 * 10_000)
}

pub fn position_size(ctx: &ValidationContext, limits: &RiskLimits) -> Option<Violation> {
    let limit = limits.position_size_limit_for(&ctx.symbol)?;
    let resulting = ctx.resulting_qty().abs();
    if resulting > limit {
        Some(Violation::new(
            RuleType::PositionSize,
            "max_position_size",
            format!("resulting position {resulting} exceeds max position size {limit} for {}", ctx.symbol),
            Decimal4::from_scaled_i128(resulting as i128 * 10_000),
            Decimal4::from_scaled_i128(limit as i128 * 10_000),
            Severity::Error,
        ))
    } else {
        None
    }
}

pub fn position_value(ctx: &ValidationContext, limits: &RiskLimits) -> Option<Violation> {
    let limit = limits.max_position_value?;
    let resulting_value = ctx
        .estimated_price
        .checked_mul_qty(ctx.resulting_qty().abs(), Rounding::Down)?;
    if resulting_value > limit {
        Some(Violation::new(
            RuleType::PositionValue,
            "max_position_value",
            format!("resulting position value {resulting_value} exceeds max position value {limit} for {}", ctx.symbol),
            resulting_value,
            limit,
            Severity::Error,
        ))
    } else {
        None
    }
}

pub fn concentration(ctx: &ValidationContext, limits: &RiskLimits) -> Option<Violation> {
    let limit = limits.max_concentration_percent?;
    if ctx.equity.is_zero() || ctx.equity.is_negative() {
        return None;
    }
    let new_value = ctx
        .estimated_price
        .checked_mul_qty(ctx.resulting_qty().abs(), Rounding::Down)?;
    let concentration_pct = new_value
        .checked_div(ctx.equity, Rounding::HalfEven)?
        .checked_mul(hundred(), Rounding::HalfEven)?;
    if concentration_pct > limit {
        Some(Violation::new(
            RuleType::Concentration,
            "max_concentration_percent",
            format!("{} would represent {concentration_pct}% of equity, exceeding {limit}%", ctx.symbol),
            concentration_pct,
            limit,
            Severity::Error,
        ))
    } else {
        None
    }
}

pub fn total_positions(ctx: &ValidationContext, limits: &RiskLimits) -> Option<Violation> {
    let limit = limits.max_total_positions?;
    if ctx.opens_new_symbol && ctx.open_position_count >= limit {
        Some(Violation::new(
            RuleType::TotalPositions,
            "max_total_positions",
            format!("opening {} would exceed max total positions {limit}", ctx.symbol),
            Decimal4::from_scaled_i128(ctx.open_position_count as i128 * 10_000),
            Decimal4::from_scaled_i128(limit as i128 * 10_000),
            Severity::Error,
        ))
    } else {
        None
    }
}

/// Returns the violation plus whether it should also latch cooling-off.
pub fn daily_loss_absolute(daily_pnl: Decimal4, limits: &RiskLimits) -> Option<Violation> {
    let limit = limits.max_daily_loss?;
    let loss = daily_pnl.neg();
    if daily_pnl.is_negative() && loss > limit {
        Some(Violation::new(
            RuleType::DailyLossAbsolute,
            "max_daily_loss",
            format!("daily loss {loss} exceeds max daily loss {limit}"),
            loss,
            limit,
            Severity::Error,
        ))
    } else {
        None
    }
}

pub fn daily_loss_percent(daily_pnl: Decimal4, equity: Decimal4, limits: &RiskLimits) -> Option<Violation> {
    let limit = limits.max_daily_loss_percent?;
    if equity.is_zero() || equity.is_negative() || !daily_pnl.is_negative() {
        return None;
    }
    let loss = daily_pnl.neg();
    let loss_pct = loss.checked_div(equity, Rounding::HalfEven)?.checked_mul(hundred(), Rounding::HalfEven)?;
    if loss_pct > limit {
        Some(Violation::new(
            RuleType::DailyLossPercent,
            "max_daily_loss_percent",
            format!("daily loss {loss_pct}% of equity exceeds {limit}%"),
            loss_pct,
            limit,
            Severity::Error,
        ))
    } else {
        None
    }
}

pub fn drawdown_absolute(peak_equity: Decimal4, equity: Decimal4, limits: &RiskLimits) -> Option<Violation> {
    let limit = limits.max_drawdown?;
    let drawdown = if peak_equity > equity { peak_equity.checked_sub(equity)? } else { Decimal4::ZERO };
    if drawdown > limit {
        Some(Violation::new(
            RuleType::DrawdownAbsolute,
            "max_drawdown",
            format!("drawdown {drawdown} exceeds max drawdown {limit}"),
            drawdown,
            limit,
            Severity::Error,
        ))
    } else {
        None
    }
}

pub fn drawdown_percent(peak_equity: Decimal4, equity: Decimal4, limits: &RiskLimits) -> Option<Violation> {
    let limit = limits.max_drawdown_percent?;
    if peak_equity.is_zero() || peak_equity.is_negative() {
        return None;
    }
    let drawdown = if peak_equity > equity { peak_equity.checked_sub(equity)? } else { Decimal4::ZERO };
    let drawdown_pct = drawdown.checked_div(peak_equity, Rounding::HalfEven)?.checked_mul(hundred(), Rounding::HalfEven)?;
    if drawdown_pct > limit {
        Some(Violation::new(
            RuleType::DrawdownPercent,
            "max_drawdown_percent",
            format!("drawdown {drawdown_pct}% of peak equity exceeds {limit}%"),
            drawdown_pct,
            limit,
            Severity::Error,
        ))
    } else {
        None
    }
}

/// Non-blocking: always `Severity::Warning`.
pub fn single_trade_loss(ctx: &ValidationContext, limits: &RiskLimits) -> Option<Violation> {
    let limit = limits.max_single_trade_loss?;
    let order_value = ctx.estimated_order_value();
    if order_value > limit {
        Some(Violation::new(
            RuleType::SingleTradeLoss,
            "max_single_trade_loss",
            format!("estimated order value {order_value} exceeds max single trade loss {limit}"),
            order_value,
            limit,
            Severity::Warning,
        ))
    } else {
        None
    }
}

pub fn consecutive_losses(consecutive_losses: u32, limits: &RiskLimits) -> Option<Violation> {
    let limit = limits.max_consecutive_losses?;
    if consecutive_losses >= limit {
        Some(Violation::new(
            RuleType::ConsecutiveLosses,
            "max_consecutive_losses",
            format!("{consecutive_losses} consecutive losses reached the limit of {limit}"),
            Decimal4::from_scaled_i128(consecutive_losses as i128 * 10_000),
            Decimal4::from_scaled_i128(limit as i128 * 10_000),
            Severity::Error,
        ))
    } else {
        None
    }
}
