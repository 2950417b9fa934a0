//! Deterministic in-memory paper broker.
//!
//! Holds simulated cash and positions. On `submit_order`, a fill price is
//! drawn from an injected price source, adjusted by slippage, and a limit
//! order only fills if the market side crosses the limit. A fillable order
//! additionally passes a Bernoulli fill-probability gate before it is
//! actually marked filled on this call — otherwise it stays `new` for a
//! later `get_order`/resubmission to pick up. `reset()` restores cash to
//! the initial balance and clears orders and positions.

mod types;

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tc_broker::{
    insufficient_funds, invalid_order, Account, Asset, AssetClass, Broker, BrokerError, Order,
    OrderRequest, OrderStatus, OrderStatusFilter, OrderType, Position, Quote, Side,
};
use tc_money::{Decimal4, Rounding};

use types::XorShiftRng;

/// Injected price source: the simulated "market" the paper broker fills
/// against. Returns `None` if the symbol has no known price.
pub type PriceSource = Box<dyn Fn(&str) -> Option<Decimal4> + Send + Sync>;

struct PaperState {
    cash: Decimal4,
    initial_cash: Decimal4,
    positions: BTreeMap<String, Position>,
    orders: BTreeMap<String, Order>,
    realized_pnl: Decimal4,
    next_seq: u64,
    rng: XorShiftRng,
}

pub struct PaperBroker {
    state: Mutex<PaperState>,
    price_source: PriceSource,
    slippage_percent: Decimal4,
    fill_probability: f64,
}

fn basis_points(percent: Decimal4) -> Decimal4 {
    // percent expressed as e.g. 0.0500 meaning 0.05%
    percent
        .checked_div(Decimal4::from_scaled_i128(1_000_000), Rounding::HalfEven)
        .unwrap_or(Decimal4::ZERO)
}

impl PaperBroker {
    pub fn new(initial_cash: Decimal4, price_source: PriceSource) -> Self {
        Self::with_config(initial_cash, price_source, Decimal4::ZERO, 1.0, 1)
    }

    pub fn with_config(
        initial_cash: Decimal4,
        price_source: PriceSource,
        slippage_percent: Decimal4,
        fill_probability: f64,
        seed: u64,
    ) -> Self {
        Self {
            state: Mutex::new(PaperState {
                cash: initial_cash,
                initial_cash,
                positions: BTreeMap::new(),
                orders: BTreeMap::new(),
                realized_pnl: Decimal4::ZERO,
                next_seq: 1,
                rng: XorShiftRng::new(seed),
            }),
            price_source,
            slippage_percent,
            fill_probability: fill_probability.clamp(0.0, 1.0),
        }
    }

    /// Restores cash to the initial balance and clears orders/positions.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.cash = state.initial_cash;
        state.positions.clear();
        state.orders.clear();
        state.realized_pnl = Decimal4::ZERO;
    }

    pub fn realized_pnl(&self) -> Decimal4 {
        self.state.lock().unwrap().realized_pnl
    }

    fn adjusted_fill_price(&self, side: Side, market_price: Decimal4) -> Decimal4 {
        let slip = basis_points(self.slippage_percent);
        let adjustment = market_price.raw() * slip.raw();
        match side {
            Side::Buy => Decimal4::rounded(market_price.raw() + adjustment, Rounding::HalfEven),
            Side::Sell => Decimal4::rounded(market_price.raw() - adjustment, Rounding::HalfEven),
        }
    }

    fn crosses_limit(req: &OrderRequest, fill_price: Decimal4) -> bool {
        match req.order_type {
            OrderType::Market => true,
            OrderType::Limit | OrderType::StopLimit => match req.limit_price {
                Some(limit) => match req.side {
                    Side::Buy => fill_price <= limit,
                    Side::Sell => fill_price >= limit,
                },
                None => false,
            },
            OrderType::Stop | OrderType::TrailingStop => true,
        }
    }

    fn apply_fill(state: &mut PaperState, req: &OrderRequest, fill_price: Decimal4) -> Order {
        let notional = fill_price.checked_mul_qty(req.qty, Rounding::Down).unwrap_or(Decimal4::ZERO);
        match req.side {
            Side::Buy => {
                state.cash = state.cash.checked_sub(notional).unwrap_or(state.cash);
                let entry = state.positions.entry(req.symbol.clone()).or_insert(Position {
                    symbol: req.symbol.clone(),
                    qty: 0,
                    avg_cost: fill_price,
                    market_price: fill_price,
                });
                let total_qty = entry.qty + req.qty;
                if total_qty != 0 {
                    let existing_cost = entry.avg_cost.checked_mul_qty(entry.qty, Rounding::Down).unwrap_or(Decimal4::ZERO);
                    let new_cost = existing_cost.checked_add(notional).unwrap_or(existing_cost);
                    entry.avg_cost = new_cost
                        .checked_div(Decimal4::from_scaled_i128(total_qty as i128 * 10_000), Rounding::HalfEven)
                        .unwrap_or(fill_price);
                }
                entry.qty = total_qty;
                entry.market_price = fill_price;
            }
            Side::Sell => {
                state.cash = state.cash.checked_add(notional).unwrap_or(state.cash);
                if let Some(entry) = state.positions.get_mut(&req.symbol) {
                    let closed_qty = req.qty.min(entry.qty);
                    let cost_basis = entry.avg_cost.checked_mul_qty(closed_qty, Rounding::Down).unwrap_or(Decimal4::ZERO);
                    let proceeds = fill_price.checked_mul_qty(closed_qty, Rounding::Down).unwrap_or(Decimal4::ZERO);
                    let gain = proceeds.checked_sub(cost_basis).unwrap_or(Decimal4::ZERO);
                    state.realized_pnl = state.realized_pnl.checked_add(gain).unwrap_or(state.realized_pnl);
                    entry.qty -= closed_qty;
                    entry.market_price = fill_price;
                    if entry.qty == 0 {
                        state.positions.remove(&req.symbol);
                    }
                }
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        Order {
            broker_order_id: format!("paper-{seq}"),
            client_order_id: req.client_order_id.clone(),
            symbol: req.symbol.clone(),
            side: req.side,
            order_type: req.order_type,
            qty: req.qty,
            filled_qty: req.qty,
            limit_price: req.limit_price,
            stop_price: req.stop_price,
            avg_fill_price: Some(fill_price),
            status: OrderStatus::Filled,
            submitted_at: Utc::now(),
        }
    }

    fn new_unfilled_order(req: &OrderRequest, seq: u64) -> Order {
        Order {
            broker_order_id: format!("paper-{seq}"),
            client_order_id: req.client_order_id.clone(),
            symbol: req.symbol.clone(),
            side: req.side,
            order_type: req.order_type,
            qty: req.qty,
            filled_qty: 0,
            limit_price: req.limit_price,
            stop_price: req.stop_price,
            avg_fill_price: None,
            status: OrderStatus::New,
            submitted_at: Utc::now(),
        }
    }
}

#[async_trait]
impl Broker for PaperBroker {
    fn name(&self) -> &'static str {
        "paper"
    }

    async fn connect(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn is_market_open(&self) -> Result<bool, BrokerError> {
        Ok(true)
    }

    async fn get_account(&self) -> Result<Account, BrokerError> {
        let state = self.state.lock().unwrap();
        let positions_value: Decimal4 = state
            .positions
            .values()
            .fold(Decimal4::ZERO, |acc, p| acc.checked_add(p.market_value()).unwrap_or(acc));
        let equity = state.cash.checked_add(positions_value).unwrap_or(state.cash);
        Ok(Account {
            cash: state.cash,
            equity,
            buying_power: state.cash,
        })
    }

    async fn submit_order(&self, req: OrderRequest) -> Result<Order, BrokerError> {
        let market_price = (self.price_source)(&req.symbol)
            .ok_or_else(|| invalid_order(format!("no price available for {}", req.symbol)))?;
        let fill_price = self.adjusted_fill_price(req.side, market_price);

        let mut state = self.state.lock().unwrap();

        if matches!(req.side, Side::Buy) {
            let notional = fill_price.checked_mul_qty(req.qty, Rounding::Down).unwrap_or(Decimal4::ZERO);
            if notional > state.cash {
                return Err(insufficient_funds(format!(
                    "order notional {notional} exceeds available cash {}",
                    state.cash
                )));
            }
        }

        let order = if Self::crosses_limit(&req, fill_price) && state.rng.bernoulli(self.fill_probability) {
            Self::apply_fill(&mut state, &req, fill_price)
        } else {
            let seq = state.next_seq;
            state.next_seq += 1;
            Self::new_unfilled_order(&req, seq)
        };

        state.orders.insert(order.broker_order_id.clone(), order.clone());
        Ok(order)
    }

    async fn cancel_order(&self, broker_order_id: &str) -> Result<(), BrokerError> {
        let mut state = self.state.lock().unwrap();
        match state.orders.get_mut(broker_order_id) {
            Some(order) if order.status.is_open() => {
                order.status = OrderStatus::Cancelled;
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(invalid_order(format!("unknown order {broker_order_id}"))),
        }
    }

    async fn replace_order(&self, broker_order_id: &str, req: OrderRequest) -> Result<Order, BrokerError> {
        self.cancel_order(broker_order_id).await?;
        self.submit_order(req).await
    }

    async fn get_order(&self, broker_order_id: &str) -> Result<Order, BrokerError> {
        self.state
            .lock()
            .unwrap()
            .orders
            .get(broker_order_id)
            .cloned()
            .ok_or_else(|| invalid_order(format!("unknown order {broker_order_id}")))
    }

    async fn get_orders(
        &self,
        status: Option<OrderStatusFilter>,
        limit: usize,
        symbols: Option<&[String]>,
    ) -> Result<Vec<Order>, BrokerError> {
        let state = self.state.lock().unwrap();
        let mut out: Vec<Order> = state
            .orders
            .values()
            .filter(|o| match status {
                Some(OrderStatusFilter::Open) => o.status.is_open(),
                Some(OrderStatusFilter::Closed) => !o.status.is_open(),
                Some(OrderStatusFilter::All) | None => true,
            })
            .filter(|o| symbols.map(|s| s.iter().any(|sym| sym == &o.symbol)).unwrap_or(true))
            .cloned()
            .collect();
        out.truncate(limit);
        Ok(out)
    }

    async fn get_positions(&self) -> Result<Vec<Position>, BrokerError> {
        Ok(self.state.lock().unwrap().positions.values().cloned().collect())
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>, BrokerError> {
        Ok(self.state.lock().unwrap().positions.get(symbol).cloned())
    }

    async fn close_position(&self, symbol: &str) -> Result<Order, BrokerError> {
        let qty = {
            let state = self.state.lock().unwrap();
            state.positions.get(symbol).map(|p| p.qty).unwrap_or(0)
        };
        if qty == 0 {
            return Err(invalid_order(format!("no open position for {symbol}")));
        }
        let side = if qty > 0 { Side::Sell } else { Side::Buy };
        self.submit_order(OrderRequest {
            client_order_id: format!("close-{symbol}"),
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            qty: qty.abs(),
            limit_price: None,
            stop_price: None,
            trail_amount: None,
            trail_percent: None,
            time_in_force: tc_broker::TimeInForce::Day,
            extended_hours: false,
            take_profit_price: None,
            stop_loss_price: None,
        })
        .await
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, BrokerError> {
        let market_price = (self.price_source)(symbol)
            .ok_or_else(|| invalid_order(format!("no price available for {symbol}")))?;
        let half_spread = basis_points(Decimal4::from_scaled_i128(500)); // 0.05%
        let spread_amount = Decimal4::rounded(market_price.raw() * half_spread.raw(), Rounding::HalfEven);
        Ok(Quote {
            bid: market_price.checked_sub(spread_amount).unwrap_or(market_price),
            ask: market_price.checked_add(spread_amount).unwrap_or(market_price),
        })
    }

    async fn get_asset(&self, symbol: &str) -> Result<Asset, BrokerError> {
        Ok(Asset {
            symbol: symbol.to_string(),
            asset_class: AssetClass::Equity,
            tradable: true,
            exchange: "PAPER".to_string(),
            currency: "AUD".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_price(price: &str) -> PriceSource {
        let p = Decimal4::parse(price).unwrap();
        Box::new(move |_symbol: &str| Some(p))
    }

    fn market_buy(symbol: &str, qty: i64) -> OrderRequest {
        OrderRequest {
            client_order_id: "c1".to_string(),
            symbol: symbol.to_string(),
            side: Side::Buy,
            order_type: OrderType::Market,
            qty,
            limit_price: None,
            stop_price: None,
            trail_amount: None,
            trail_percent: None,
            time_in_force: tc_broker::TimeInForce::Day,
            extended_hours: false,
            take_profit_price: None,
            stop_loss_price: None,
        }
    }

    #[tokio::test]
    async fn market_buy_fills_and_debits_cash() {
        let broker = PaperBroker::new(Decimal4::parse("10000.0000").unwrap(), fixed_price("100.0000"));
        let order = broker.submit_order(market_buy("AAPL", 10)).await.unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        let account = broker.get_account().await.unwrap();
        assert_eq!(account.cash.to_string(), "9000.0000");
    }

    #[tokio::test]
    async fn insufficient_cash_blocks_buy() {
        let broker = PaperBroker::new(Decimal4::parse("500.0000").unwrap(), fixed_price("100.0000"));
        let err = broker.submit_order(market_buy("AAPL", 10)).await.unwrap_err();
        assert!(matches!(
            err,
            BrokerError::Order { kind: tc_broker::OrderErrorKind::InsufficientFunds, .. }
        ));
    }

    #[tokio::test]
    async fn limit_buy_above_market_does_not_fill() {
        let broker = PaperBroker::new(Decimal4::parse("10000.0000").unwrap(), fixed_price("100.0000"));
        let req = OrderRequest {
            order_type: OrderType::Limit,
            limit_price: Some(Decimal4::parse("90.0000").unwrap()),
            ..market_buy("AAPL", 10)
        };
        let order = broker.submit_order(req).await.unwrap();
        assert_eq!(order.status, OrderStatus::New);
    }

    #[tokio::test]
    async fn fill_probability_zero_leaves_order_new() {
        let broker = PaperBroker::with_config(
            Decimal4::parse("10000.0000").unwrap(),
            fixed_price("100.0000"),
            Decimal4::ZERO,
            0.0,
            1,
        );
        let order = broker.submit_order(market_buy("AAPL", 5)).await.unwrap();
        assert_eq!(order.status, OrderStatus::New);
    }

    #[tokio::test]
    async fn weighted_average_cost_on_repeated_buys() {
        let price = std::sync::Arc::new(Mutex::new(Decimal4::parse("100.0000").unwrap()));
        let price_for_source = price.clone();
        let broker = PaperBroker::new(
            Decimal4::parse("100000.0000").unwrap(),
            Box::new(move |_symbol: &str| Some(*price_for_source.lock().unwrap())),
        );
        broker.submit_order(market_buy("AAPL", 10)).await.unwrap();
        *price.lock().unwrap() = Decimal4::parse("120.0000").unwrap();
        broker.submit_order(market_buy("AAPL", 10)).await.unwrap();

        let position = broker.get_position("AAPL").await.unwrap().unwrap();
        assert_eq!(position.qty, 20);
        // (10*100 + 10*120) / 20 = 110.0000
        assert_eq!(position.avg_cost.to_string(), "110.0000");
    }

    #[tokio::test]
    async fn reset_restores_initial_cash_and_clears_state() {
        let broker = PaperBroker::new(Decimal4::parse("10000.0000").unwrap(), fixed_price("100.0000"));
        broker.submit_order(market_buy("AAPL", 10)).await.unwrap();
        broker.reset();
        let account = broker.get_account().await.unwrap();
        assert_eq!(account.cash.to_string(), "10000.0000");
        assert!(broker.get_positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn quote_has_bid_below_ask() {
        let broker = PaperBroker::new(Decimal4::parse("10000.0000").unwrap(), fixed_price("100.0000"));
        let quote = broker.get_quote("AAPL").await.unwrap();
        assert!(quote.bid < quote.ask);
    }

    #[tokio::test]
    async fn close_position_sells_entire_quantity() {
        let broker = PaperBroker::new(Decimal4::parse("100000.0000").unwrap(), fixed_price("100.0000"));
        broker.submit_order(market_buy("AAPL", 10)).await.unwrap();
        let close_order = broker.close_position("AAPL").await.unwrap();
        assert_eq!(close_order.side, Side::Sell);
        assert_eq!(close_order.qty, 10);
        assert!(broker.get_position("AAPL").await.unwrap().is_none());
    }
}
