//! The broker abstraction every concrete adapter implements.

use async_trait::async_trait;
use tc_money::Decimal4;

use crate::error::{BrokerError, OrderErrorKind};
use crate::types::{Account, Asset, Order, OrderRequest, OrderStatusFilter, Position, Quote};

#[derive(Debug, Clone, Default)]
pub struct OrderValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Every operation may suspend: this is a thin wrapper over a live vendor
/// connection (or, for the paper broker, an in-memory simulation with the
/// same shape). Implementations must be object-safe so routing code can
/// hold a `Box<dyn Broker>` per account without knowing the concrete
/// vendor.
#[async_trait]
pub trait Broker: Send + Sync {
    fn name(&self) -> &'static str;

    async fn connect(&self) -> Result<(), BrokerError>;
    async fn disconnect(&self) -> Result<(), BrokerError>;
    async fn is_market_open(&self) -> Result<bool, BrokerError>;

    async fn get_account(&self) -> Result<Account, BrokerError>;

    async fn submit_order(&self, req: OrderRequest) -> Result<Order, BrokerError>;
    async fn cancel_order(&self, broker_order_id: &str) -> Result<(), BrokerError>;
    async fn replace_order(&self, broker_order_id: &str, req: OrderRequest) -> Result<Order, BrokerError>;
    async fn get_order(&self, broker_order_id: &str) -> Result<Order, BrokerError>;
    async fn get_orders(
        &self,
        status: Option<OrderStatusFilter>,
        limit: usize,
        symbols: Option<&[String]>,
    ) -> Result<Vec<Order>, BrokerError>;

    async fn get_positions(&self) -> Result<Vec<Position>, BrokerError>;
    async fn get_position(&self, symbol: &str) -> Result<Option<Position>, BrokerError>;
    async fn close_position(&self, symbol: &str) -> Result<Order, BrokerError>;

    async fn get_quote(&self, symbol: &str) -> Result<Quote, BrokerError>;
    async fn get_asset(&self, symbol: &str) -> Result<Asset, BrokerError>;

    /// Cancels every open order. Default implementation lists open orders
    /// and cancels them one at a time; a vendor with a bulk-cancel endpoint
    /// should override this.
    async fn cancel_all_orders(&self) -> Result<(), BrokerError> {
        let open = self
            .get_orders(Some(OrderStatusFilter::Open), usize::MAX, None)
            .await?;
        for order in open {
            self.cancel_order(&order.broker_order_id).await?;
        }
        Ok(())
    }

    /// Closes every open position. Default implementation iterates
    /// `get_positions` and calls `close_position` per symbol.
    async fn close_all_positions(&self) -> Result<Vec<Order>, BrokerError> {
        let positions = self.get_positions().await?;
        let mut out = Vec::with_capacity(positions.len());
        for position in positions {
            out.push(self.close_position(&position.symbol).await?);
        }
        Ok(out)
    }

    /// Fetches a quote per symbol. Default implementation calls
    /// `get_quote` once per symbol; a vendor with a batch-quote endpoint
    /// should override this.
    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<(String, Quote)>, BrokerError> {
        let mut out = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            out.push((symbol.clone(), self.get_quote(symbol).await?));
        }
        Ok(out)
    }

    /// Pre-submit validation: tradability, price sign for conditional
    /// orders, and estimated buying-power coverage. Does not touch broker
    /// state.
    async fn validate_order(&self, req: &OrderRequest) -> Result<OrderValidation, BrokerError> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let asset = self.get_asset(&req.symbol).await?;
        if !asset.tradable {
            errors.push(format!("{} is not tradable", req.symbol));
        }

        if matches!(req.order_type, crate::types::OrderType::Limit | crate::types::OrderType::StopLimit) {
            match req.limit_price {
                Some(p) if p.is_negative() || p.is_zero() => {
                    errors.push("limit price must be strictly positive".to_string());
                }
                None => errors.push("limit order requires a limit price".to_string()),
                _ => {}
            }
        }
        if matches!(req.order_type, crate::types::OrderType::Stop | crate::types::OrderType::StopLimit) {
            match req.stop_price {
                Some(p) if p.is_negative() || p.is_zero() => {
                    errors.push("stop price must be strictly positive".to_string());
                }
                None => errors.push("stop order requires a stop price".to_string()),
                _ => {}
            }
        }

        if matches!(req.side, crate::types::Side::Buy) {
            let account = self.get_account().await?;
            if let Some(limit) = req.limit_price {
                let estimated_cost = limit.checked_mul_qty(req.qty, tc_money::Rounding::Down).unwrap_or(Decimal4::ZERO);
                if estimated_cost > account.buying_power {
                    warnings.push("estimated cost exceeds current buying power".to_string());
                }
            }
        }

        Ok(OrderValidation {
            valid: errors.is_empty(),
            errors,
            warnings,
        })
    }
}

pub fn insufficient_funds(message: impl Into<String>) -> BrokerError {
    BrokerError::Order {
        kind: OrderErrorKind::InsufficientFunds,
        message: message.into(),
    }
}

pub fn invalid_order(message: impl Into<String>) -> BrokerError {
    BrokerError::Order {
        kind: OrderErrorKind::InvalidOrder,
        message: message.into(),
    }
}
