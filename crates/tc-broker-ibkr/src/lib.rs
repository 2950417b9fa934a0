//! Adapter mapping the broker abstraction onto Interactive Brokers. Adds
//! futures (with contract specs: exchange, currency, multiplier) and ASX
//! equities (symbol ending in `.AX`) on top of the default-equity shape
//! the Alpaca adapter covers. Same transport scoping: no live TWS/IB
//! Gateway client lives in this crate, only the mapping layer.

mod transport;

pub use transport::{
    ContractSpec, IbkrAccountResponse, IbkrAssetResponse, IbkrOrderRequest, IbkrOrderResponse,
    IbkrPositionResponse, IbkrQuoteResponse, IbkrTransport, TransportError,
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

pub struct IbkrBroker {
    transport: Box<dyn IbkrTransport>,
}

impl IbkrBroker {
    pub fn new(transport: Box<dyn IbkrTransport>) -> Self {
        Self { transport }
    }

    /// Resolves the contract spec for a symbol. Futures and ASX equities
    /// need this to submit a correctly-scoped order; plain US equities get
    /// a default spec without a transport round trip.
    pub async fn qualify_contract(&self, symbol: &str) -> Result<ContractSpec, BrokerError> {
        self.transport.qualify_contract(symbol).map_err(map_transport_error)
    }
}

fn map_transport_error(err: TransportError) -> BrokerError {
    match err {
        TransportError::Connection(msg) => BrokerError::Connection(msg),
        TransportError::RateLimited { retry_after_secs } => BrokerError::RateLimit {
            message: "ibkr pacing violation".to_string(),
            retry_after_secs,
        },
        TransportError::Api { code, message } if code == 501 || code == 502 => {
            BrokerError::Authentication(message)
        }
        TransportError::Api { code, message } if (100..600).contains(&code) => {
            tc_broker::invalid_order(message)
        }
        TransportError::Api { code, message } => BrokerError::Connection(format!("api error {code}: {message}")),
    }
}

/// Known futures multipliers. Symbols not listed here that still look like
/// futures (all-caps, no `.AX` suffix, under 4 characters) get a multiplier
/// of 1 and exchange `GLOBEX`, left for a real qualification call to
/// correct.
const FUTURES_MULTIPLIERS: &[(&str, i64)] = &[("ES", 50), ("NQ", 20), ("CL", 1000), ("GC", 100), ("ZN", 1000)];

fn futures_multiplier(root: &str) -> Option<i64> {
    FUTURES_MULTIPLIERS
        .iter()
        .find(|(sym, _)| *sym == root)
        .map(|(_, mult)| *mult)
}

/// Best-effort contract spec from the symbol alone, used when no
/// transport-provided qualification is available. ASX equities use the
/// `.AX` suffix convention; recognised futures roots get their real
/// multiplier; everything else defaults to SMART/USD equity.
pub(crate) fn default_contract_spec(symbol: &str) -> ContractSpec {
    if let Some(root) = symbol.strip_suffix(".AX") {
        let _ = root;
        return ContractSpec {
            exchange: "ASX".to_string(),
            currency: "AUD".to_string(),
            multiplier: 1,
        };
    }
    if let Some(multiplier) = futures_multiplier(symbol) {
        return ContractSpec {
            exchange: "GLOBEX".to_string(),
            currency: "USD".to_string(),
            multiplier,
        };
    }
    ContractSpec {
        exchange: "SMART".to_string(),
        currency: "USD".to_string(),
        multiplier: 1,
    }
}

fn default_asset_class(symbol: &str) -> AssetClass {
    if symbol.ends_with(".AX") {
        AssetClass::Equity
    } else if futures_multiplier(symbol).is_some() {
        AssetClass::Future
    } else {
        AssetClass::Equity
    }
}

fn asset_class_from_wire(sec_type: &str, symbol: &str) -> AssetClass {
    match sec_type {
        "FUT" => AssetClass::Future,
        "STK" => AssetClass::Equity,
        "CRYPTO" => AssetClass::Crypto,
        _ => default_asset_class(symbol),
    }
}

fn side_to_wire(side: Side) -> &'static str {
    match side {
        Side::Buy => "BUY",
        Side::Sell => "SELL",
    }
}

fn side_from_wire(side: &str) -> Side {
    if side.eq_ignore_ascii_case("SELL") {
        Side::Sell
    } else {
        Side::Buy
    }
}

fn order_type_to_wire(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Market => "MKT",
        OrderType::Limit => "LMT",
        OrderType::Stop => "STP",
        OrderType::StopLimit => "STP LMT",
        OrderType::TrailingStop => "TRAIL",
    }
}

fn order_type_from_wire(order_type: &str) -> OrderType {
    match order_type {
        "LMT" => OrderType::Limit,
        "STP" => OrderType::Stop,
        "STP LMT" => OrderType::StopLimit,
        _ => OrderType::Market,
    }
}

fn tif_to_wire(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::Day => "DAY",
        TimeInForce::Gtc => "GTC",
        TimeInForce::Ioc => "IOC",
        TimeInForce::Fok => "FOK",
        TimeInForce::Opg => "OPG",
        TimeInForce::Cls => "CLS",
        TimeInForce::Gtd => "GTD",
    }
}

fn status_from_wire(status: &str) -> OrderStatus {
    match status {
        "PendingSubmit" | "PreSubmitted" | "Submitted" => OrderStatus::New,
        "PartiallyFilled" => OrderStatus::PartiallyFilled,
        "Filled" => OrderStatus::Filled,
        "PendingCancel" | "Cancelled" | "ApiCancelled" => OrderStatus::Cancelled,
        "Inactive" => OrderStatus::Rejected,
        "Expired" => OrderStatus::Expired,
        _ => OrderStatus::New,
    }
}

fn parse_qty(raw: &str) -> i64 {
    raw.parse::<f64>().map(|v| v as i64).unwrap_or(0)
}

fn parse_price(raw: &str) -> Decimal4 {
    Decimal4::parse(raw).unwrap_or(Decimal4::ZERO)
}

fn order_from_wire(resp: IbkrOrderResponse) -> Order {
    Order {
        broker_order_id: resp.order_id,
        client_order_id: resp.client_order_id,
        symbol: resp.symbol,
        side: side_from_wire(&resp.side),
        order_type: order_type_from_wire(&resp.order_type),
        qty: parse_qty(&resp.qty),
        filled_qty: parse_qty(&resp.filled_qty),
        limit_price: resp.limit_price.as_deref().map(parse_price),
        stop_price: resp.stop_price.as_deref().map(parse_price),
        avg_fill_price: resp.avg_fill_price.as_deref().map(parse_price),
        status: status_from_wire(&resp.status),
        submitted_at: resp
            .submitted_at
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|_| Utc::now()),
    }
}

#[async_trait]
impl Broker for IbkrBroker {
    fn name(&self) -> &'static str {
        "ibkr"
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
            equity: parse_price(&resp.net_liquidation),
            buying_power: parse_price(&resp.buying_power),
        })
    }

    async fn submit_order(&self, req: OrderRequest) -> Result<Order, BrokerError> {
        // Contract qualification may suspend on a real gateway connection;
        // here the mock answers it synchronously like every other call.
        self.qualify_contract(&req.symbol).await?;
        let wire = IbkrOrderRequest {
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
            Some(OrderStatusFilter::Open) => "Submitted",
            Some(OrderStatusFilter::Closed) => "Filled",
            Some(OrderStatusFilter::All) | None => "All",
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
                avg_cost: parse_price(&p.avg_cost),
                market_price: parse_price(&p.market_price),
            })
            .collect())
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>, BrokerError> {
        let resp = self.transport.get_position(symbol).map_err(map_transport_error)?;
        Ok(resp.map(|p| Position {
            symbol: p.symbol,
            qty: parse_qty(&p.qty),
            avg_cost: parse_price(&p.avg_cost),
            market_price: parse_price(&p.market_price),
        }))
    }

    async fn close_position(&self, symbol: &str) -> Result<Order, BrokerError> {
        let resp = self.transport.close_position(symbol).map_err(map_transport_error)?;
        Ok(order_from_wire(resp))
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, BrokerError> {
        let resp = self.transport.get_quote(symbol).map_err(map_transport_error)?;
        Ok(Quote {
            bid: parse_price(&resp.bid),
            ask: parse_price(&resp.ask),
        })
    }

    async fn get_asset(&self, symbol: &str) -> Result<Asset, BrokerError> {
        let resp = self.transport.get_asset(symbol).map_err(map_transport_error)?;
        let spec = self.qualify_contract(symbol).await?;
        Ok(Asset {
            symbol: resp.symbol.clone(),
            asset_class: asset_class_from_wire(&resp.sec_type, &resp.symbol),
            tradable: resp.tradable,
            exchange: spec.exchange,
            currency: spec.currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport::mock::MockTransport;
    use transport::IbkrAssetResponse;

    fn broker_with(transport: MockTransport) -> IbkrBroker {
        IbkrBroker::new(Box::new(transport))
    }

    #[test]
    fn asx_suffix_maps_to_asx_exchange_and_aud_currency() {
        let spec = default_contract_spec("BHP.AX");
        assert_eq!(spec.exchange, "ASX");
        assert_eq!(spec.currency, "AUD");
    }

    #[test]
    fn known_future_root_carries_real_multiplier() {
        let spec = default_contract_spec("ES");
        assert_eq!(spec.exchange, "GLOBEX");
        assert_eq!(spec.multiplier, 50);
    }

    #[test]
    fn unrecognised_symbol_defaults_to_smart_usd_equity() {
        let spec = default_contract_spec("AAPL");
        assert_eq!(spec.exchange, "SMART");
        assert_eq!(spec.currency, "USD");
        assert_eq!(spec.multiplier, 1);
    }

    #[tokio::test]
    async fn submit_order_on_futures_symbol_qualifies_contract_first() {
        let transport = MockTransport::new();
        let broker = broker_with(transport);
        let req = OrderRequest {
            client_order_id: "ibkr-1".to_string(),
            symbol: "ES".to_string(),
            side: Side::Buy,
            order_type: OrderType::Market,
            qty: 2,
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
        assert_eq!(order.symbol, "ES");
        assert_eq!(order.status, OrderStatus::New);
    }

    #[tokio::test]
    async fn get_asset_for_asx_symbol_reports_aud_currency() {
        let transport = MockTransport::new();
        transport.assets.lock().unwrap().insert(
            "BHP.AX".to_string(),
            IbkrAssetResponse {
                symbol: "BHP.AX".to_string(),
                tradable: true,
                sec_type: "STK".to_string(),
                exchange: "ASX".to_string(),
                currency: "AUD".to_string(),
            },
        );
        let broker = broker_with(transport);
        let asset = broker.get_asset("BHP.AX").await.unwrap();
        assert_eq!(asset.currency, "AUD");
        assert_eq!(asset.exchange, "ASX");
        assert_eq!(asset.asset_class, AssetClass::Equity);
    }

    #[tokio::test]
    async fn auth_error_code_is_distinguished_from_generic_api_error() {
        let transport = MockTransport::new();
        transport.fail_next(TransportError::Api { code: 501, message: "not authenticated".to_string() });
        let broker = broker_with(transport);
        let err = broker.get_account().await.unwrap_err();
        assert!(matches!(err, BrokerError::Authentication(_)));
    }
}
