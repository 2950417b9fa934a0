//! Order Manager: a nine-state order lifecycle tracked per client order id,
//! submitted and mirrored through a `tc_broker::Broker`, with bounded
//! capacity (oldest terminal orders evicted first) and lifecycle callbacks.

mod error;
mod manager;
mod order;
mod status;

pub use error::OmsError;
pub use manager::OrderManager;
pub use order::{HistoryEntry, OmsEvent, TrackedOrder};
pub use status::{is_legal_transition, OrderStatus};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tc_broker::{
        Account, Asset, AssetClass, Broker, BrokerError, Order, OrderRequest, OrderStatusFilter,
        OrderType, Position, Quote, Side, TimeInForce,
    };
    use tc_money::Decimal4;

    struct StubBroker {
        should_reject: bool,
    }

    #[async_trait]
    impl Broker for StubBroker {
        fn name(&self) -> &'static str {
            "stub"
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
            Ok(Account {
                cash: Decimal4::parse("100000.0000").unwrap(),
                equity: Decimal4::parse("100000.0000").unwrap(),
                buying_power: Decimal4::parse("100000.0000").unwrap(),
            })
        }
        async fn submit_order(&self, req: OrderRequest) -> Result<Order, BrokerError> {
            if self.should_reject {
                return Err(tc_broker::invalid_order("stub rejects everything"));
            }
            Ok(Order {
                broker_order_id: format!("b-{}", req.client_order_id),
                client_order_id: req.client_order_id,
                symbol: req.symbol,
                side: req.side,
                order_type: req.order_type,
                qty: req.qty,
                filled_qty: 0,
                limit_price: req.limit_price,
                stop_price: req.stop_price,
                avg_fill_price: None,
                status: tc_broker::OrderStatus::New,
                submitted_at: chrono::Utc::now(),
            })
        }
        async fn cancel_order(&self, _broker_order_id: &str) -> Result<(), BrokerError> {
            Ok(())
        }
        async fn replace_order(&self, _broker_order_id: &str, req: OrderRequest) -> Result<Order, BrokerError> {
            self.submit_order(req).await
        }
        async fn get_order(&self, _broker_order_id: &str) -> Result<Order, BrokerError> {
            unimplemented!()
        }
        async fn get_orders(
            &self,
            _status: Option<OrderStatusFilter>,
            _limit: usize,
            _symbols: Option<&[String]>,
        ) -> Result<Vec<Order>, BrokerError> {
            unimplemented!()
        }
        async fn get_positions(&self) -> Result<Vec<Position>, BrokerError> {
            unimplemented!()
        }
        async fn get_position(&self, _symbol: &str) -> Result<Option<Position>, BrokerError> {
            unimplemented!()
        }
        async fn close_position(&self, _symbol: &str) -> Result<Order, BrokerError> {
            unimplemented!()
        }
        async fn get_quote(&self, _symbol: &str) -> Result<Quote, BrokerError> {
            unimplemented!()
        }
        async fn get_asset(&self, _symbol: &str) -> Result<Asset, BrokerError> {
            Ok(Asset {
                symbol: "AAPL".to_string(),
                asset_class: AssetClass::Equity,
                tradable: true,
                exchange: "PAPER".to_string(),
                currency: "USD".to_string(),
            })
        }
    }

    fn sample_request(id: &str) -> OrderRequest {
        OrderRequest {
            client_order_id: id.to_string(),
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            order_type: OrderType::Market,
            qty: 10,
            limit_price: None,
            stop_price: None,
            trail_amount: None,
            trail_percent: None,
            time_in_force: TimeInForce::Day,
            extended_hours: false,
            take_profit_price: None,
            stop_loss_price: None,
        }
    }

    #[tokio::test]
    async fn submit_order_tracks_and_transitions_to_new() {
        let manager = OrderManager::new();
        let broker = StubBroker { should_reject: false };
        let tracked = manager.submit_order(&broker, sample_request("c1")).await.unwrap();
        assert_eq!(tracked.status, OrderStatus::New);
        assert!(manager.get("c1").is_some());
    }

    #[tokio::test]
    async fn rejected_submission_lands_in_terminal_rejected_state() {
        let manager = OrderManager::new();
        let broker = StubBroker { should_reject: true };
        let err = manager.submit_order(&broker, sample_request("c1")).await.unwrap_err();
        assert!(matches!(err, OmsError::Broker(_)));
        let tracked = manager.get("c1").unwrap();
        assert_eq!(tracked.status, OrderStatus::Rejected);
        assert!(tracked.status.is_terminal());
    }

    #[tokio::test]
    async fn cancel_order_moves_through_pending_cancel_to_cancelled() {
        let manager = OrderManager::new();
        let broker = StubBroker { should_reject: false };
        manager.submit_order(&broker, sample_request("c1")).await.unwrap();
        manager.cancel_order(&broker, "c1").await.unwrap();
        assert_eq!(manager.get("c1").unwrap().status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn out_of_matrix_transition_is_applied_not_rejected() {
        let manager = OrderManager::new();
        let broker = StubBroker { should_reject: false };
        manager.submit_order(&broker, sample_request("c1")).await.unwrap();
        manager.update_order_status("c1", OrderStatus::Cancelled).unwrap();
        // Cancelled -> New is outside the matrix, but the broker is authoritative.
        let tracked = manager.update_order_status("c1", OrderStatus::New).unwrap();
        assert_eq!(tracked.status, OrderStatus::New);
    }

    #[tokio::test]
    async fn capacity_evicts_oldest_terminal_order_before_open_ones() {
        let manager = OrderManager::with_capacity(2);
        let broker = StubBroker { should_reject: false };
        manager.submit_order(&broker, sample_request("c1")).await.unwrap();
        manager.update_order_status("c1", OrderStatus::Cancelled);
        manager.submit_order(&broker, sample_request("c2")).await.unwrap();
        // At capacity; c3 should evict terminal c1, not open c2.
        manager.submit_order(&broker, sample_request("c3")).await.unwrap();
        assert!(manager.get("c1").is_none());
        assert!(manager.get("c2").is_some());
        assert!(manager.get("c3").is_some());
    }

    #[tokio::test]
    async fn callbacks_fire_on_every_transition() {
        let manager = OrderManager::new();
        let broker = StubBroker { should_reject: false };
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        manager.on_event(Box::new(move |_order, _event| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        manager.submit_order(&broker, sample_request("c1")).await.unwrap();
        assert!(count.load(Ordering::SeqCst) >= 2);
    }
}
