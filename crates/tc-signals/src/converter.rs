//! Signal → order conversion: position sizing, bracket-leg construction,
//! and `OrderRequest` assembly. The caller (the strategy executor) is
//! responsible for resolving a concrete price before calling [`convert`]
//! — this module performs no quote lookups itself.

use tc_broker::{OrderRequest, OrderType, Side, TimeInForce};
use tc_money::Decimal4;

use crate::bracket::{self, StopLeg, StopLossConfig, TakeProfitConfig};
use crate::signal::{SignalType, TradingSignal};
use crate::sizing::{self, SizingMethod};

#[derive(Debug, Clone, Copy)]
pub struct ConversionConfig {
    pub sizing: SizingMethod,
    pub stop_loss: StopLossConfig,
    pub take_profit: TakeProfitConfig,
    pub default_time_in_force: TimeInForce,
    pub extended_hours: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Bracket {
    pub stop_loss_order: Option<OrderRequest>,
    pub take_profit_order: Option<OrderRequest>,
}

#[derive(Debug, Clone, Default)]
pub struct ConversionResult {
    pub success: bool,
    pub order_request: Option<OrderRequest>,
    pub bracket: Bracket,
    pub errors: Vec<String>,
}

impl ConversionResult {
    fn failure(error: impl Into<String>) -> Self {
        Self { success: false, order_request: None, bracket: Bracket::default(), errors: vec![error.into()] }
    }
}

fn opposite(side: Side) -> Side {
    match side {
        Side::Buy => Side::Sell,
        Side::Sell => Side::Buy,
    }
}

/// Converts `signal` into an entry `OrderRequest` plus its bracket legs.
/// `resolved_price` is the price the caller already chose (the signal's
/// own `price_at_signal`, or a broker quote mid); `portfolio_value` backs
/// the percentage-based sizing methods.
pub fn convert(
    signal: &TradingSignal,
    config: &ConversionConfig,
    resolved_price: Decimal4,
    portfolio_value: Decimal4,
) -> ConversionResult {
    if matches!(signal.signal_type, SignalType::Hold) {
        return ConversionResult::failure("hold signal produces no order");
    }
    let Some(side) = signal.side() else {
        return ConversionResult::failure("signal has no actionable side");
    };

    let qty = match sizing::compute_quantity(config.sizing, resolved_price, portfolio_value) {
        Ok(q) => q,
        Err(e) => return ConversionResult::failure(e.to_string()),
    };
    if qty <= 0 {
        return ConversionResult::failure("computed a non-positive order quantity");
    }

    let client_order_id = format!("sig-{}-{}", signal.symbol, signal.timestamp.timestamp_nanos_opt().unwrap_or(0));

    let entry = OrderRequest {
        client_order_id: client_order_id.clone(),
        symbol: signal.symbol.clone(),
        side,
        order_type: OrderType::Market,
        qty,
        limit_price: None,
        stop_price: None,
        trail_amount: None,
        trail_percent: None,
        time_in_force: config.default_time_in_force,
        extended_hours: config.extended_hours,
        take_profit_price: None,
        stop_loss_price: None,
    };

    let stop_leg = bracket::compute_stop_loss(config.stop_loss, side, resolved_price);
    let take_profit_price =
        bracket::compute_take_profit(config.take_profit, side, resolved_price, stop_leg);

    if matches!(config.take_profit, TakeProfitConfig::RiskRewardRatio { .. }) && take_profit_price.is_none() {
        return ConversionResult::failure(
            "risk/reward take-profit requires a concrete (non-trailing) stop-loss price",
        );
    }

    let child_side = opposite(side);
    let stop_loss_order = stop_leg.map(|leg| match leg {
        StopLeg::Price(price) => OrderRequest {
            client_order_id: format!("{client_order_id}-sl"),
            symbol: signal.symbol.clone(),
            side: child_side,
            order_type: OrderType::Stop,
            qty,
            limit_price: None,
            stop_price: Some(price),
            trail_amount: None,
            trail_percent: None,
            time_in_force: config.default_time_in_force,
            extended_hours: config.extended_hours,
            take_profit_price: None,
            stop_loss_price: None,
        },
        StopLeg::TrailingPercent(percent) => OrderRequest {
            client_order_id: format!("{client_order_id}-sl"),
            symbol: signal.symbol.clone(),
            side: child_side,
            order_type: OrderType::TrailingStop,
            qty,
            limit_price: None,
            stop_price: None,
            trail_amount: None,
            trail_percent: Some(percent),
            time_in_force: config.default_time_in_force,
            extended_hours: config.extended_hours,
            take_profit_price: None,
            stop_loss_price: None,
        },
        StopLeg::TrailingAmount(amount) => OrderRequest {
            client_order_id: format!("{client_order_id}-sl"),
            symbol: signal.symbol.clone(),
            side: child_side,
            order_type: OrderType::TrailingStop,
            qty,
            limit_price: None,
            stop_price: None,
            trail_amount: Some(amount),
            trail_percent: None,
            time_in_force: config.default_time_in_force,
            extended_hours: config.extended_hours,
            take_profit_price: None,
            stop_loss_price: None,
        },
    });

    let take_profit_order = take_profit_price.map(|price| OrderRequest {
        client_order_id: format!("{client_order_id}-tp"),
        symbol: signal.symbol.clone(),
        side: child_side,
        order_type: OrderType::Limit,
        qty,
        limit_price: Some(price),
        stop_price: None,
        trail_amount: None,
        trail_percent: None,
        time_in_force: config.default_time_in_force,
        extended_hours: config.extended_hours,
        take_profit_price: None,
        stop_loss_price: None,
    });

    ConversionResult {
        success: true,
        order_request: Some(entry),
        bracket: Bracket { stop_loss_order, take_profit_order },
        errors: Vec::new(),
    }
}
