//! Commission and slippage models applied to simulated fills.

use tc_money::{Decimal4, Rounding};

use crate::config::PortfolioConfig;

/// `per_trade + per_share*qty + percent*notional/100`, clamped to
/// `[min_commission, max_commission]`.
pub fn commission(qty: i64, notional: Decimal4, cfg: &PortfolioConfig) -> Decimal4 {
    let per_share = cfg
        .commission_per_share
        .checked_mul_qty(qty, Rounding::HalfEven)
        .expect("commission per-share overflow");
    let hundred = Decimal4::from_scaled_i128(100 * 10_000);
    let percent_fee = notional
        .checked_mul(cfg.commission_percent, Rounding::HalfEven)
        .and_then(|v| v.checked_div(hundred, Rounding::HalfEven))
        .expect("commission percent overflow");
    let raw = cfg
        .commission_per_trade
        .checked_add(per_share)
        .and_then(|v| v.checked_add(percent_fee))
        .expect("commission sum overflow");

    let floored = if raw.raw() < cfg.min_commission.raw() { cfg.min_commission } else { raw };
    match cfg.max_commission {
        Some(cap) if floored.raw() > cap.raw() => cap,
        _ => floored,
    }
}

/// BUY fills worse (higher) than quote, SELL fills worse (lower) than
/// quote — slippage always works against the trader.
pub fn apply_slippage(price: Decimal4, side: tc_portfolio::Side, slippage_percent: Decimal4) -> Decimal4 {
    let hundred = Decimal4::from_scaled_i128(100 * 10_000);
    let delta = price
        .checked_mul(slippage_percent, Rounding::HalfEven)
        .and_then(|v| v.checked_div(hundred, Rounding::HalfEven))
        .expect("slippage overflow");
    match side {
        tc_portfolio::Side::Buy => price.checked_add(delta).expect("slippage overflow"),
        tc_portfolio::Side::Sell => price.checked_sub(delta).expect("slippage overflow"),
    }
}
