//! Vendor wire shapes and the transport boundary.
//!
//! No live HTTP client lives in this crate: [`AlpacaTransport`] is the
//! seam a real implementation (outside this codebase's scope) would sit
//! behind. [`mock::MockTransport`] drives the adapter's mapping logic in
//! tests.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Connection(String),
    Http { status: u16, code: Option<String>, message: String },
    RateLimited { retry_after_secs: Option<u64> },
}

#[derive(Debug, Clone, Serialize)]
pub struct AlpacaOrderRequest {
    pub client_order_id: String,
    pub symbol: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub qty: String,
    pub limit_price: Option<String>,
    pub stop_price: Option<String>,
    pub time_in_force: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaOrderResponse {
    pub id: String,
    pub client_order_id: String,
    pub symbol: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub qty: String,
    pub filled_qty: String,
    pub limit_price: Option<String>,
    pub stop_price: Option<String>,
    pub filled_avg_price: Option<String>,
    pub status: String,
    pub submitted_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaAccountResponse {
    pub cash: String,
    pub equity: String,
    pub buying_power: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaPositionResponse {
    pub symbol: String,
    pub qty: String,
    pub avg_entry_price: String,
    pub current_price: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaQuoteResponse {
    pub bid_price: String,
    pub ask_price: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaAssetResponse {
    pub symbol: String,
    pub tradable: bool,
    pub class: String,
    pub exchange: String,
}

pub trait AlpacaTransport: Send + Sync {
    fn submit_order(&self, req: &AlpacaOrderRequest) -> Result<AlpacaOrderResponse, TransportError>;
    fn cancel_order(&self, id: &str) -> Result<(), TransportError>;
    fn get_order(&self, id: &str) -> Result<AlpacaOrderResponse, TransportError>;
    fn list_orders(&self, status: &str, limit: usize) -> Result<Vec<AlpacaOrderResponse>, TransportError>;
    fn get_account(&self) -> Result<AlpacaAccountResponse, TransportError>;
    fn get_positions(&self) -> Result<Vec<AlpacaPositionResponse>, TransportError>;
    fn get_position(&self, symbol: &str) -> Result<Option<AlpacaPositionResponse>, TransportError>;
    fn close_position(&self, symbol: &str) -> Result<AlpacaOrderResponse, TransportError>;
    fn get_quote(&self, symbol: &str) -> Result<AlpacaQuoteResponse, TransportError>;
    fn get_asset(&self, symbol: &str) -> Result<AlpacaAssetResponse, TransportError>;
    fn is_market_open(&self) -> Result<bool, TransportError>;
}

#[cfg(any(test, feature = "mock-transport"))]
pub mod mock {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockTransport {
        pub orders: Mutex<BTreeMap<String, AlpacaOrderResponse>>,
        pub positions: Mutex<BTreeMap<String, AlpacaPositionResponse>>,
        pub account: Mutex<Option<AlpacaAccountResponse>>,
        pub quotes: Mutex<BTreeMap<String, AlpacaQuoteResponse>>,
        pub assets: Mutex<BTreeMap<String, AlpacaAssetResponse>>,
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

    impl AlpacaTransport for MockTransport {
        fn submit_order(&self, req: &AlpacaOrderRequest) -> Result<AlpacaOrderResponse, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            let resp = AlpacaOrderResponse {
                id: format!("mock-{}", req.client_order_id),
                client_order_id: req.client_order_id.clone(),
                symbol: req.symbol.clone(),
                side: req.side.clone(),
                order_type: req.order_type.clone(),
                qty: req.qty.clone(),
                filled_qty: "0".to_string(),
                limit_price: req.limit_price.clone(),
                stop_price: req.stop_price.clone(),
                filled_avg_price: None,
                status: "new".to_string(),
                submitted_at: "2024-01-01T00:00:00Z".to_string(),
            };
            self.orders.lock().unwrap().insert(resp.id.clone(), resp.clone());
            Ok(resp)
        }

        fn cancel_order(&self, id: &str) -> Result<(), TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            if let Some(o) = self.orders.lock().unwrap().get_mut(id) {
                o.status = "canceled".to_string();
            }
            Ok(())
        }

        fn get_order(&self, id: &str) -> Result<AlpacaOrderResponse, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            self.orders
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| TransportError::Http { status: 404, code: None, message: "order not found".to_string() })
        }

        fn list_orders(&self, status: &str, limit: usize) -> Result<Vec<AlpacaOrderResponse>, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            let mut out: Vec<AlpacaOrderResponse> = self
                .orders
                .lock()
                .unwrap()
                .values()
                .filter(|o| status == "all" || o.status == status)
                .cloned()
                .collect();
            out.truncate(limit);
            Ok(out)
        }

        fn get_account(&self) -> Result<AlpacaAccountResponse, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            self.account
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| TransportError::Connection("no account configured".to_string()))
        }

        fn get_positions(&self) -> Result<Vec<AlpacaPositionResponse>, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            Ok(self.positions.lock().unwrap().values().cloned().collect())
        }

        fn get_position(&self, symbol: &str) -> Result<Option<AlpacaPositionResponse>, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            Ok(self.positions.lock().unwrap().get(symbol).cloned())
        }

        fn close_position(&self, symbol: &str) -> Result<AlpacaOrderResponse, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            let position = self.positions.lock().unwrap().remove(symbol);
            let qty = position.map(|p| p.qty).unwrap_or_else(|| "0".to_string());
            Ok(AlpacaOrderResponse {
                id: format!("mock-close-{symbol}"),
                client_order_id: format!("close-{symbol}"),
                symbol: symbol.to_string(),
                side: "sell".to_string(),
                order_type: "market".to_string(),
                qty,
                filled_qty: "0".to_string(),
                limit_price: None,
                stop_price: None,
                filled_avg_price: None,
                status: "new".to_string(),
                submitted_at: "2024-01-01T00:00:00Z".to_string(),
            })
        }

        fn get_quote(&self, symbol: &str) -> Result<AlpacaQuoteResponse, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            self.quotes
                .lock()
                .unwrap()
                .get(symbol)
                .cloned()
                .ok_or_else(|| TransportError::Http { status: 404, code: None, message: "no quote".to_string() })
        }

        fn get_asset(&self, symbol: &str) -> Result<AlpacaAssetResponse, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            self.assets.lock().unwrap().get(symbol).cloned().ok_or_else(|| {
                TransportError::Http { status: 404, code: None, message: "asset not found".to_string() }
            })
        }

        fn is_market_open(&self) -> Result<bool, TransportError> {
            if let Some(e) = self.take_error() {
                return Err(e);
            }
            Ok(*self.market_open.lock().unwrap())
        }
    }
}
