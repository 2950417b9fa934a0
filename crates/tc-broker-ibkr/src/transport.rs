//! Vendor wire shapes and the transport boundary for Interactive Brokers.
//!
//! Same scoping as the Alpaca adapter: no live socket/gateway client lives
//! here. [`IbkrTransport`] is the seam a TWS/IB Gateway client would sit
//! behind; [`mock::MockTransport`] drives the mapping and contract-
//! qualification logic in tests.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Connection(String),
    Api { code: i32, message: String },
    RateLimited { retry_after_secs: Option<u64> },
}

/// Resolved contract detail for a symbol. Equities carry a unit multiplier;
/// futures carry the exchange's actual contract multiplier (e.g. 50 for an
/// ES future).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSpec {
    pub exchange: String,
    pub currency: String,
    pub multiplier: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IbkrOrderRequest {
    pub client_order_id: String,
    pub symbol: String,
    pub side: String,
    pub order_type: String,
    pub qty: String,
    pub limit_price: Option<String>,
    pub stop_price: Option<String>,
    pub time_in_force: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IbkrOrderResponse {
    pub order_id: String,
    pub client_order_id: String,
    pub symbol: String,
    pub side: String,
    pub order_type: String,
    pub qty: String,
    pub filled_qty: String,
    pub limit_price: Option<String>,
    pub stop_price: Option<String>,
    pub avg_fill_price: Option<String>,
    pub status: String,
    pub submitted_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IbkrAccountResponse {
    pub cash: String,
    pub net_liquidation: String,
    pub buying_power: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IbkrPositionResponse {
    pub symbol: String,
    pub qty: String,
    pub avg_cost: String,
    pub market_price: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IbkrQuoteResponse {
    pub bid: String,
    pub ask: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IbkrAssetResponse {
    pub symbol: String,
    pub tradable: bool,
    pub sec_type: String,
    pub exchange: String,
    pub currency: String,
}

pub trait IbkrTransport: Send + Sync {
    fn submit_order(&self, req: &IbkrOrderRequest) -> Result<IbkrOrderResponse, TransportError>;
    fn cancel_order(&self, id: &str) -> Result<(), TransportError>;
    fn get_order(&self, id: &str) -> Result<IbkrOrderResponse, TransportError>;
    fn list_orders(&self, status: &str, limit: usize) -> Result<Vec<IbkrOrderResponse>, TransportError>;
    fn get_account(&self) -> Result<IbkrAccountResponse, TransportError>;
    fn get_positions(&self) -> Result<Vec<IbkrPositionResponse>, TransportError>;
    fn get_position(&self, symbol: &str) -> Result<Option<IbkrPositionResponse>, TransportError>;
    fn close_position(&self, symbol: &str) -> Result<IbkrOrderResponse, TransportError>;
    fn get_quote(&self, symbol: &str) -> Result<IbkrQuoteResponse, TransportError>;
    fn get_asset(&self, symbol: &str) -> Result<IbkrAssetResponse, TransportError>;
    fn is_market_open(&self) -> Result<bool, TransportError>;
    /// Resolves exchange, currency and contract multiplier for a symbol.
    /// Real IB contract qualification is a round trip to the gateway; here
    /// it is a lookup the mock and (eventually) a real client both serve.
    fn qualify_contract(&self, symbol: &str) -> Result<ContractSpec, TransportError>;
}

#[cfg(any(test, feature = "mock-transport"))]
pub mod mock {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockTransport {
        pub orders: Mutex<BTreeMap<String, IbkrOrderResponse>>,
        pub positions: Mutex<BTreeMap<String, IbkrPositionResponse>>,
        pub account: Mutex<Option<IbkrAccountResponse>>,
        pub quotes: Mutex<BTreeMap<String, IbkrQuoteResponse>>,
        pub assets: Mutex<BTreeMap<String, IbkrAssetResponse>>,
        pub contracts: Mutex<BTreeMap<String, ContractSpec>>,
        pub next_error: Mutex<Option<TransportError>>,
        pub market_open: Mutex<bool>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                market_open: Mutex::new(true),
                ..Default::default()
            }
        }

        pub fn fail_next(&self, err: TransportError) {
            *self.next_error.lock().unwrap() = Some(err);
        }

        fn take_error(&self) -> Option<TransportError> {
            self.next_error.lock().unwrap().take()
        }
    }

    impl IbkrTransport for MockTransport {
        fn submit_order(&self, req: &IbkrOrderRequest) -> Result<IbkrOrderResponse, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            let resp = IbkrOrderResponse {
                order_id: format!("mock-{}", req.client_order_id),
                client_order_id: req.client_order_id.clone(),
                symbol: req.symbol.clone(),
                side: req.side.clone(),
                order_type: req.order_type.clone(),
                qty: req.qty.clone(),
                filled_qty: "0".to_string(),
                limit_price: req.limit_price.clone(),
                stop_price: req.stop_price.clone(),
                avg_fill_price: None,
                status: "Submitted".to_string(),
                submitted_at: "2024-01-01T00:00:00Z".to_string(),
            };
            self.orders.lock().unwrap().insert(resp.order_id.clone(), resp.clone());
            Ok(resp)
        }

        fn cancel_order(&self, id: &str) -> Result<(), TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            if let Some(o) = self.orders.lock().unwrap().get_mut(id) {
                o.status = "Cancelled".to_string();
            }
            Ok(())
        }

        fn get_order(&self, id: &str) -> Result<IbkrOrderResponse, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            self.orders
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| TransportError::Api { code: 404, message: "order not found".to_string() })
        }

        fn list_orders(&self, status: &str, limit: usize) -> Result<Vec<IbkrOrderResponse>, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            let mut out: Vec<IbkrOrderResponse> = self
                .orders
                .lock()
                .unwrap()
                .values()
                .filter(|o| status == "All" || o.status == status)
                .cloned()
                .collect();
            out.truncate(limit);
            Ok(out)
        }

        fn get_account(&self) -> Result<IbkrAccountResponse, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            self.account
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| TransportError::Connection("no account configured".to_string()))
        }

        fn get_positions(&self) -> Result<Vec<IbkrPositionResponse>, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            Ok(self.positions.lock().unwrap().values().cloned().collect())
        }

        fn get_position(&self, symbol: &str) -> Result<Option<IbkrPositionResponse>, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            Ok(self.positions.lock().unwrap().get(symbol).cloned())
        }

        fn close_position(&self, symbol: &str) -> Result<IbkrOrderResponse, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            let position = self.positions.lock().unwrap().remove(symbol);
            let qty = position.map(|p| p.qty).unwrap_or_else(|| "0".to_string());
            Ok(IbkrOrderResponse {
                order_id: format!("mock-close-{symbol}"),
                client_order_id: format!("close-{symbol}"),
                symbol: symbol.to_string(),
                side: "SELL".to_string(),
                order_type: "MKT".to_string(),
                qty,
                filled_qty: "0".to_string(),
                limit_price: None,
                stop_price: None,
                avg_fill_price: None,
                status: "Submitted".to_string(),
                submitted_at: "2024-01-01T00:00:00Z".to_string(),
            })
        }

        fn get_quote(&self, symbol: &str) -> Result<IbkrQuoteResponse, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            self.quotes
                .lock()
                .unwrap()
                .get(symbol)
                .cloned()
                .ok_or_else(|| TransportError::Api { code: 404, message: "no quote".to_string() })
        }

        fn get_asset(&self, symbol: &str) -> Result<IbkrAssetResponse, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            self.assets
                .lock()
                .unwrap()
                .get(symbol)
                .cloned()
                .ok_or_else(|| TransportError::Api { code: 404, message: "asset not found".to_string() })
        }

        fn is_market_open(&self) -> Result<bool, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            Ok(*self.market_open.lock().unwrap())
        }

        fn qualify_contract(&self, symbol: &str) -> Result<ContractSpec, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            if let Some(spec) = self.contracts.lock().unwrap().get(symbol) {
                return Ok(spec.clone());
            }
            Ok(crate::default_contract_spec(symbol))
        }
    }
}
