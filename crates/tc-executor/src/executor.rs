//! The per-signal pipeline: resolve price, convert to an order, risk-check
//! against a live portfolio snapshot, submit, await the fill, and place
//! bracket children.

use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use tc_broker::{Broker, OrderRequest, Side as BrokerSide};
use tc_oms::{OmsError, OrderManager, OrderStatus, TrackedOrder};
use tc_portfolio::{compute_equity, MarkMap, Portfolio};
use tc_risk::{RiskManager, Side as RiskSide, ValidationContext};
use tc_signals::{convert, ConversionConfig, TradingSignal};

use crate::event::{EventHistory, EventKind, ExecutionEvent};
use crate::result::{ExecutionOutcome, ExecutionResult};
use crate::retry::{self, RetryConfig};

fn map_order_status(status: tc_broker::OrderStatus) -> OrderStatus {
    match status {
        tc_broker::OrderStatus::New => OrderStatus::New,
        tc_broker::OrderStatus::PartiallyFilled => OrderStatus::PartiallyFilled,
        tc_broker::OrderStatus::Filled => OrderStatus::Filled,
        tc_broker::OrderStatus::Cancelled => OrderStatus::Cancelled,
        tc_broker::OrderStatus::Rejected => OrderStatus::Rejected,
        tc_broker::OrderStatus::Expired => OrderStatus::Expired,
        tc_broker::OrderStatus::Replaced => OrderStatus::Replaced,
    }
}

pub struct ExecutorConfig {
    pub conversion: ConversionConfig,
    pub retry: RetryConfig,
    /// How long to wait for a submitted entry order to reach a terminal
    /// state before giving up and cancelling it.
    pub fill_timeout: Duration,
    /// How often to poll the broker for order status while waiting.
    pub poll_interval: Duration,
    pub event_history_capacity: usize,
}

/// Drives one strategy's signals through conversion, risk, submission and
/// fill monitoring. Signals for different symbols may run concurrently;
/// signals sharing a symbol should be serialized by the caller since a
/// stale `current_qty` snapshot could otherwise double-count.
pub struct StrategyExecutor<B: Broker> {
    broker: B,
    orders: OrderManager,
    risk: Mutex<RiskManager>,
    config: ExecutorConfig,
    events: Mutex<EventHistory>,
}

impl<B: Broker> StrategyExecutor<B> {
    pub fn new(broker: B, risk: RiskManager, config: ExecutorConfig) -> Self {
        let events = Mutex::new(EventHistory::new(config.event_history_capacity));
        Self { broker, orders: OrderManager::new(), risk: Mutex::new(risk), config, events }
    }

    pub fn order_manager(&self) -> &OrderManager {
        &self.orders
    }

    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events.lock().unwrap().iter().cloned().collect()
    }

    fn record(&self, kind: EventKind, signal_id: &str, order_id: Option<String>, detail: impl Into<String>) {
        self.events.lock().unwrap().push(ExecutionEvent::new(kind, signal_id, order_id, detail));
    }

    pub async fn execute_signal(&self, signal: &TradingSignal, portfolio: &Portfolio, marks: &MarkMap) -> ExecutionResult {
        let signal_id = format!("{}-{}", signal.symbol, signal.timestamp.timestamp_nanos_opt().unwrap_or(0));
        self.record(EventKind::SignalReceived, &signal_id, None, format!("{:?} {}", signal.signal_type, signal.symbol));

        let equity = compute_equity(portfolio.cash, &portfolio.positions, marks);

        let resolved_price = match signal.price_at_signal {
            Some(p) => p,
            None => match self.broker.get_quote(&signal.symbol).await {
                Ok(quote) => quote.mid(),
                Err(e) => {
                    self.record(EventKind::Error, &signal_id, None, e.to_string());
                    return ExecutionResult::failed(signal_id, e.to_string());
                }
            },
        };

        let conversion = convert(signal, &self.config.conversion, resolved_price, equity);
        if !conversion.success {
            let detail = conversion.errors.join("; ");
            self.record(EventKind::Error, &signal_id, None, detail.clone());
            return ExecutionResult::failed(signal_id, detail);
        }
        self.record(EventKind::OrderBuilt, &signal_id, None, "entry order built");
        let entry_request = conversion.order_request.expect("convert reported success without an order");

        let current_position = portfolio.positions.get(&entry_request.symbol);
        let current_qty = current_position.map(|p| p.quantity).unwrap_or(0);
        let opens_new_symbol =
            entry_request.side == BrokerSide::Buy && current_position.map(|p| p.is_flat()).unwrap_or(true);
        let ctx = ValidationContext {
            symbol: entry_request.symbol.clone(),
            side: match entry_request.side {
                BrokerSide::Buy => RiskSide::Buy,
                BrokerSide::Sell => RiskSide::Sell,
            },
            order_qty: entry_request.qty,
            current_qty,
            estimated_price: resolved_price,
            equity,
            open_position_count: portfolio.positions.values().filter(|p| !p.is_flat()).count(),
            opens_new_symbol,
        };

        let risk_response = {
            let mut risk = self.risk.lock().unwrap();
            risk.validate_order(&ctx, equity, Utc::now())
        };
        self.record(EventKind::RiskChecked, &signal_id, None, format!("passed={}", risk_response.passed));
        if !risk_response.passed {
            self.record(EventKind::Rejected, &signal_id, None, "risk check failed");
            return ExecutionResult::rejected(signal_id, risk_response.violations);
        }

        let tracked = match self.submit_with_retry(entry_request).await {
            Ok(tracked) => tracked,
            Err(e) => {
                self.record(EventKind::Error, &signal_id, None, e.to_string());
                return ExecutionResult::failed(signal_id, e.to_string());
            }
        };
        let order_id = tracked.client_order_id().to_string();
        self.record(EventKind::Submitted, &signal_id, Some(order_id.clone()), "entry submitted");

        match self.await_terminal(&order_id, self.config.fill_timeout).await {
            Some(OrderStatus::Filled) => {
                self.record(EventKind::Filled, &signal_id, Some(order_id.clone()), "entry filled");
                let mut bracket_orders = Vec::new();
                let legs = [conversion.bracket.stop_loss_order, conversion.bracket.take_profit_order];
                for leg in legs.into_iter().flatten() {
                    match self.submit_with_retry(leg).await {
                        Ok(child) => {
                            self.record(
                                EventKind::BracketPlaced,
                                &signal_id,
                                Some(child.client_order_id().to_string()),
                                "bracket leg submitted",
                            );
                            bracket_orders.push(child);
                        }
                        Err(e) => {
                            self.record(EventKind::Error, &signal_id, None, format!("bracket leg failed: {e}"));
                        }
                    }
                }
                ExecutionResult {
                    signal_id,
                    outcome: ExecutionOutcome::Filled,
                    order: self.orders.get(&order_id),
                    bracket_orders,
                    risk_violations: Vec::new(),
                    error: None,
                }
            }
            Some(OrderStatus::PartiallyFilled) => {
                self.record(EventKind::PartiallyFilled, &signal_id, Some(order_id.clone()), "partially filled at timeout");
                ExecutionResult {
                    signal_id,
                    outcome: ExecutionOutcome::PartiallyFilled,
                    order: self.orders.get(&order_id),
                    bracket_orders: Vec::new(),
                    risk_violations: Vec::new(),
                    error: None,
                }
            }
            Some(OrderStatus::Cancelled) => {
                self.record(EventKind::Cancelled, &signal_id, Some(order_id.clone()), "entry cancelled");
                ExecutionResult {
                    signal_id,
                    outcome: ExecutionOutcome::Cancelled,
                    order: self.orders.get(&order_id),
                    bracket_orders: Vec::new(),
                    risk_violations: Vec::new(),
                    error: None,
                }
            }
            Some(OrderStatus::Rejected) => {
                self.record(EventKind::Rejected, &signal_id, Some(order_id.clone()), "entry rejected by broker");
                ExecutionResult {
                    signal_id,
                    outcome: ExecutionOutcome::Rejected,
                    order: self.orders.get(&order_id),
                    bracket_orders: Vec::new(),
                    risk_violations: Vec::new(),
                    error: None,
                }
            }
            Some(other) => {
                self.record(EventKind::Error, &signal_id, Some(order_id.clone()), format!("unexpected terminal status {other:?}"));
                ExecutionResult::failed(signal_id, format!("unexpected terminal status {other:?}"))
            }
            None => {
                self.record(EventKind::Timeout, &signal_id, Some(order_id.clone()), "fill wait timed out");
                tracing::warn!(order_id, signal_id, "fill wait timed out, cancelling");
                let _ = self.orders.cancel_order(&self.broker, &order_id).await;
                ExecutionResult {
                    signal_id,
                    outcome: ExecutionOutcome::TimedOut,
                    order: self.orders.get(&order_id),
                    bracket_orders: Vec::new(),
                    risk_violations: Vec::new(),
                    error: None,
                }
            }
        }
    }

    /// Feeds a closed trade's realized P&L back into the risk gate so
    /// daily-loss and consecutive-loss tracking stays current.
    pub fn record_trade_result(&self, realized_pnl: tc_money::Decimal4) {
        self.risk.lock().unwrap().record_trade_result(realized_pnl);
    }

    async fn submit_with_retry(&self, request: OrderRequest) -> Result<TrackedOrder, OmsError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.orders.submit_order(&self.broker, request.clone()).await {
                Ok(tracked) => return Ok(tracked),
                Err(OmsError::Broker(broker_err)) => {
                    if self.config.retry.should_retry(&broker_err, attempt) {
                        let delay = self.config.retry.delay_for(attempt, retry::retry_after_duration(&broker_err));
                        if delay > Duration::ZERO {
                            tokio::time::sleep(delay).await;
                        }
                        continue;
                    }
                    return Err(OmsError::Broker(broker_err));
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Polls the broker until the tracked order reaches a terminal state
    /// or `timeout` elapses. Returns `None` on timeout with no terminal
    /// status observed.
    async fn await_terminal(&self, client_order_id: &str, timeout: Duration) -> Option<OrderStatus> {
        let deadline = Instant::now() + timeout;
        loop {
            let Some(tracked) = self.orders.get(client_order_id) else {
                return None;
            };
            if tracked.status.is_terminal() {
                return Some(tracked.status);
            }
            if let Some(broker_order) = &tracked.broker_order {
                if let Ok(fresh) = self.broker.get_order(&broker_order.broker_order_id).await {
                    let mapped = map_order_status(fresh.status);
                    self.orders.update_order_status(client_order_id, mapped);
                    if mapped.is_terminal() {
                        return Some(mapped);
                    }
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(self.config.poll_interval.min(timeout)).await;
        }
    }
}
