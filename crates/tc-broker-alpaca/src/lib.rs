//! Adapter mapping the broker abstraction onto Alpaca's enums and error
//! shapes. No live HTTP transport is implemented here — the vendor SDK
//! sits outside this crate's scope; what lives here is the mapping layer
//! between `tc_broker` types and Alpaca's wire vocabulary, plus the
//! symbol-to-asset-class default used when a caller hasn't pre-classified
//! a symbol.

mod transport;

pub use transport::{
    AlpacaAccountResponse, AlpacaAssetResponse, AlpacaOrderRequest, AlpacaOrderResponse,
    AlpacaPositionResponse, AlpacaQuoteResponse, AlpacaTransport, TransportError,
};

#[cfg(any(test, feature = "mock-transport"))]
pub use transport::mock::MockTransport;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tc_broker::{
    Account, Asset, AssetClass, Broker, BrokerError, Order, OrderRequest, OrderStatus,
    OrderStatusFilter, OrderType, Position, Quote, Side, TimeInForce,
};
use tc_money::Decimal4;

pub struct AlpacaBroker {
    transport: Box<dyn AlpacaTransport>,
}

impl AlpacaBroker {
    pub fn new(transport: Box<dyn AlpacaTransport>) -> Self {
        Self { transport }
    }
}

fn map_transport_error(err: TransportError) -> BrokerError {
    match err {
        TransportError::Connection(msg) => BrokerError::Connection(msg),
        TransportError::RateLimited { retry_after_secs } => BrokerError::RateLimit {
            message: "alpaca rate limit exceeded".to_string(),
            retry_after_secs,
        },
        TransportError::Http { status: 401, message, .. } | TransportError::Http { status: 403, message, .. } => {
            BrokerError::Authentication(message)
        }
        TransportError::Http { status, code, message } => match code.as_deref() {
            Some("insufficient_balance") => tc_broker::insufficient_funds(message),
            _ if (400..500).contains(&status) => tc_broker::invalid_order(message),
            _ => BrokerError::Connection(format!("http {status}: {message}")),
        },
    }
}

fn side_to_wire(side: Side) -> &'static str {
    match side {
        Side::Buy => "buy",
        Side::Sell => "sell",
    }
}

fn side_from_wire(side: &str) -> Side {
    if side.eq_ignore_ascii_case("sell") {
        Side::Sell
    } else {
        Side::Buy
    }
}

fn order_type_to_wire(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Market => "market",
        OrderType::Limit => "limit",
        OrderType::Stop => "stop",
        OrderType::StopLimit => "stop_limit",
        OrderType::TrailingStop => "trailing_stop",
    }
}

fn order_type_from_wire(order_type: &str) -> OrderType {
    match order_type {
        "limit" => OrderType::Limit,
        "stop" => OrderType::Stop,
        "stop_limit" => OrderType::StopLimit,
        "trailing_stop" => OrderType::TrailingStop,
        _ => OrderType::Market,
    }
}

fn tif_to_wire(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::Day => "day",
        TimeInForce::Gtc => "gtc",
        TimeInForce::Ioc => "ioc",
        TimeInForce::Fok => "fok",
        TimeInForce::Opg => "opg",
        TimeInForce::Cls => "cls",
        TimeInForce::Gtd => "gtd",
    }
}

fn status_from_wire(status: &str) -> OrderStatus {
    match status {
        "new" | "accepted" | "pending_new" => OrderStatus::New,
        "partially_filled" => OrderStatus::PartiallyFilled,
        "filled" => OrderStatus::Filled,
        "canceled" | "pending_cancel" => OrderStatus::Cancelled,
        "rejected" => OrderStatus::Rejected,
        "expired" => OrderStatus::Expired,
        "replaced" => OrderStatus::Replaced,
        _ => OrderStatus::New,
    }
}

/// Symbols containing a `/` are crypto pairs (`BTC/USD`); everything else
/// defaults to equity. Alpaca has no ETF/future designation in its asset
/// class field distinct from equity, so callers that need that distinction
/// should consult a reference data source rather than this heuristic.
fn default_asset_class(symbol: &str) -> AssetClass {
    if symbol.contains('/') {
        AssetClass::Crypto
    } else {
        AssetClass::Equity
    }
}

fn asset_class_from_wire(class: &str, symbol: &str) -> AssetClass {
    match class {
        "crypto" => AssetClass::Crypto,
        "us_equity" => AssetClass::Equity,
        _ => default_asset_class(symbol),
    }
}

fn parse_qty(raw: &str) -> i64 {
    raw.parse::<f64>().map(|v| v as i64).unwrap_or(0)
}

fn parse_price(raw: &str) -> Decimal4 {
    Decimal4::parse(raw).unwrap_or(Decimal4::ZERO)
}

fn order_from_wire(resp: AlpacaOrderResponse) -> Order {
    Order {
        broker_order_id: resp.id,
        client_order_id: resp.client_order_id,
        symbol: resp.symbol,
        side: side_from_wire(&resp.side),
        order_type: order_type_from_wire(&resp.order_type),
        qty: parse_qty(&resp.qty),
        filled_qty: parse_qty(&resp.filled_qty),
        limit_price: resp.limit_price.as_deref().map(parse_price),
        stop_price: resp.stop_price.as_deref().map(parse_price),
        avg_fill_price: resp.filled_avg_price.as_deref().map(parse_price),
        status: status_from_wire(&resp.status),
        submitted_at: resp
            .submitted_at
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|_| Utc::now()),
    }
}

#[async_trait]
impl Broker for AlpacaBroker {
    fn name(&self) -> &'static str {
        "alpaca"
    }

    async fn connect(&self) -> Result<(), BrokerError> {
        self.transport.is_market_open().map(|_| ()).map_err(map_transport_error)
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn is_market_open(&self) -> Result<bool, BrokerError> {
        self.transport.is_market_open().map_err(map_transport_error)
    }

    async fn get_account(&self) -> Result<Account, BrokerError> {
        let resp = self.transport.get_account().map_err(map_transport_error)?;
        Ok(Account {
            cash: parse_price(&resp.cash),
            equity: parse_price(&resp.equity),
            buying_power: parse_price(&resp.buying_power),
        })
    }

    async fn submit_order(&self, req: OrderRequest) -> Result<Order, BrokerError> {
        let wire = AlpacaOrderRequest {
            client_order_id: req.client_order_id,
            symbol: req.symbol,
            side: side_to_wire(req.side).to_string(),
            order_type: order_type_to_wire(req.order_type).to_string(),
            qty: req.qty.to_string(),
            limit_price: req.limit_price.map(|p| p.to_string()),
            stop_price: req.stop_price.map(|p| p.to_string()),
            time_in_force: tif_to_wire(req.time_in_force).to_string(),
        };
        let resp = self.transport.submit_order(&wire).map_err(map_transport_error)?;
        Ok(order_from_wire(resp))
    }

    async fn cancel_order(&self, broker_order_id: &str) -> Result<(), BrokerError> {
        self.transport.cancel_order(broker_order_id).map_err(map_transport_error)
    }

    async fn replace_order(&self, broker_order_id: &str, req: OrderRequest) -> Result<Order, BrokerError> {
        self.cancel_order(broker_order_id).await?;
        self.submit_order(req).await
    }

    async fn get_order(&self, broker_order_id: &str) -> Result<Order, BrokerError> {
        let resp = self.transport.get_order(broker_order_id).map_err(map_transport_error)?;
        Ok(order_from_wire(resp))
    }

    async fn get_orders(
        &self,
        status: Option<OrderStatusFilter>,
        limit: usize,
        symbols: Option<&[String]>,
    ) -> Result<Vec<Order>, BrokerError> {
        let wire_status = match status {
            Some(OrderStatusFilter::Open) => "open",
            Some(OrderStatusFilter::Closed) => "closed",
            Some(OrderStatusFilter::All) | None => "all",
        };
        let resp = self.transport.list_orders(wire_status, limit).map_err(map_transport_error)?;
        let mut orders: Vec<Order> = resp.into_iter().map(order_from_wire).collect();
        if let Some(symbols) = symbols {
            orders.retain(|o| symbols.iter().any(|s| s == &o.symbol));
        }
        Ok(orders)
    }

    async fn get_positions(&self) -> Result<Vec<Position>, BrokerError> {
        let resp = self.transport.get_positions().map_err(map_transport_error)?;
        Ok(resp
            .into_iter()
            .map(|p| Position {
                symbol: p.symbol,
                qty: parse_qty(&p.qty),
                avg_cost: parse_price(&p.avg_entry_price),
                market_price: parse_price(&p.current_price),
            })
            .collect())
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>, BrokerError> {
        let resp = self.transport.get_position(symbol).map_err(map_transport_error)?;
        Ok(resp.map(|p| Position {
            symbol: p.symbol,
            qty: parse_qty(&p.qty),
            avg_cost: parse_price(&p.avg_entry_price),
            market_price: parse_price(&p.current_price),
        }))
    }

    async fn close_position(&self, symbol: &str) -> Result<Order, BrokerError> {
        let resp = self.transport.close_position(symbol).map_err(map_transport_error)?;
        Ok(order_from_wire(resp))
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, BrokerError> {
        let resp = self.transport.get_quote(symbol).map_err(map_transport_error)?;
        Ok(Quote {
            bid: parse_price(&resp.bid_price),
            ask: parse_price(&resp.ask_price),
        })
    }

    async fn get_asset(&self, symbol: &str) -> Result<Asset, BrokerError> {
        let resp = self.transport.get_asset(symbol).map_err(map_transport_error)?;
        Ok(Asset {
            symbol: resp.symbol.clone(),
            asset_class: asset_class_from_wire(&resp.class, &resp.symbol),
            tradable: resp.tradable,
            exchange: resp.exchange,
            currency: "USD".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport::mock::MockTransport;
    use transport::{AlpacaAssetResponse, AlpacaQuoteResponse};

    fn broker_with(transport: MockTransport) -> AlpacaBroker {
        AlpacaBroker::new(Box::new(transport))
    }

    #[tokio::test]
    async fn submit_order_maps_wire_status_to_new() {
        let transport = MockTransport::new();
        let broker = broker_with(transport);
        let req = OrderRequest {
            client_order_id: "abc-1".to_string(),
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
        };
        let order = broker.submit_order(req).await.unwrap();
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.symbol, "AAPL");
        assert_eq!(order.qty, 10);
    }

    #[tokio::test]
    async fn authentication_error_is_distinguished_from_connection_error() {
        let transport = MockTransport::new();
        transport.fail_next(TransportError::Http {
            status: 401,
            code: None,
            message: "invalid key".to_string(),
        });
        let broker = broker_with(transport);
        let err = broker.get_account().await.unwrap_err();
        assert!(matches!(err, BrokerError::Authentication(_)));
    }

    #[tokio::test]
    async fn rate_limit_carries_retry_after() {
        let transport = MockTransport::new();
        transport.fail_next(TransportError::RateLimited { retry_after_secs: Some(5) });
        let broker = broker_with(transport);
        let err = broker.cancel_order("abc").await.unwrap_err();
        match err {
            BrokerError::RateLimit { retry_after_secs, .. } => assert_eq!(retry_after_secs, Some(5)),
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[test]
    fn crypto_symbol_defaults_to_crypto_asset_class() {
        assert_eq!(default_asset_class("BTC/USD"), AssetClass::Crypto);
        assert_eq!(default_asset_class("AAPL"), AssetClass::Equity);
    }

    #[tokio::test]
    async fn get_asset_falls_back_to_symbol_heuristic_for_unknown_class() {
        let transport = MockTransport::new();
        transport.assets.lock().unwrap().insert(
            "ETH/USD".to_string(),
            AlpacaAssetResponse {
                symbol: "ETH/USD".to_string(),
                tradable: true,
                class: "".to_string(),
                exchange: "FTXU".to_string(),
            },
        );
        let broker = broker_with(transport);
        let asset = broker.get_asset("ETH/USD").await.unwrap();
        assert_eq!(asset.asset_class, AssetClass::Crypto);
    }

    #[tokio::test]
    async fn get_quote_parses_bid_ask() {
        let transport = MockTransport::new();
        transport.quotes.lock().unwrap().insert(
            "AAPL".to_string(),
            AlpacaQuoteResponse {
                bid_price: "99.5000".to_string(),
                ask_price: "99.5500".to_string(),
            },
        );
        let broker = broker_with(transport);
        let quote = broker.get_quote("AAPL").await.unwrap();
        assert_eq!(quote.bid.to_string(), "99.5000");
        assert_eq!(quote.ask.to_string(), "99.5500");
    }
}
