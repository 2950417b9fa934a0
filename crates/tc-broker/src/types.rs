//! Broker-facing order, account, position, quote and asset types shared by
//! every concrete adapter (paper, Alpaca, IBKR).

use chrono::{DateTime, Utc};
use tc_money::Decimal4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
    TrailingStop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TimeInForce {
    Day,
    Gtc,
    Ioc,
    Fok,
    Opg,
    Cls,
    Gtd,
}

/// Broker-level order status. A broker only ever reports a subset of the
/// full order-manager lifecycle — submission-pending states belong to the
/// order manager, not the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    Expired,
    Replaced,
}

impl OrderStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::PartiallyFilled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub client_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub qty: i64,
    pub limit_price: Option<Decimal4>,
    pub stop_price: Option<Decimal4>,
    pub trail_amount: Option<Decimal4>,
    pub trail_percent: Option<Decimal4>,
    pub time_in_force: TimeInForce,
    pub extended_hours: bool,
    pub take_profit_price: Option<Decimal4>,
    pub stop_loss_price: Option<Decimal4>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub broker_order_id: String,
    pub client_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub qty: i64,
    pub filled_qty: i64,
    pub limit_price: Option<Decimal4>,
    pub stop_price: Option<Decimal4>,
    pub avg_fill_price: Option<Decimal4>,
    pub status: OrderStatus,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub symbol: String,
    pub qty: i64,
    pub avg_cost: Decimal4,
    pub market_price: Decimal4,
}

impl Position {
    pub fn market_value(&self) -> Decimal4 {
        self.market_price
            .checked_mul_qty(self.qty, tc_money::Rounding::Down)
            .unwrap_or(Decimal4::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub cash: Decimal4,
    pub equity: Decimal4,
    pub buying_power: Decimal4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub bid: Decimal4,
    pub ask: Decimal4,
}

impl Quote {
    pub fn mid(&self) -> Decimal4 {
        self.bid
            .checked_add(self.ask)
            .and_then(|sum| sum.checked_div(Decimal4::from_scaled_i128(20_000), tc_money::Rounding::HalfEven))
            .unwrap_or(self.bid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AssetClass {
    Equity,
    Etf,
    Crypto,
    Future,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub symbol: String,
    pub asset_class: AssetClass,
    pub tradable: bool,
    pub exchange: String,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatusFilter {
    Open,
    Closed,
    All,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_mid_averages_bid_and_ask() {
        let q = Quote {
            bid: Decimal4::parse("99.0000").unwrap(),
            ask: Decimal4::parse("101.0000").unwrap(),
        };
        assert_eq!(q.mid().to_string(), "100.0000");
    }

    #[test]
    fn order_status_open_classification() {
        assert!(OrderStatus::New.is_open());
        assert!(OrderStatus::PartiallyFilled.is_open());
        assert!(!OrderStatus::Filled.is_open());
        assert!(!OrderStatus::Rejected.is_open());
    }

    #[test]
    fn position_market_value() {
        let p = Position {
            symbol: "AAPL".to_string(),
            qty: 10,
            avg_cost: Decimal4::parse("100.0000").unwrap(),
            market_price: Decimal4::parse("110.0000").unwrap(),
        };
        assert_eq!(p.market_value().to_string(), "1100.0000");
    }
}
