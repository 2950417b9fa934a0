//! Broker abstraction: the contract every concrete adapter (paper,
//! Alpaca, IBKR) implements, plus the shared order/account/position/quote
//! types that flow across it.

mod broker;
mod error;
mod types;

pub use broker::{insufficient_funds, invalid_order, Broker, OrderValidation};
pub use error::{BrokerError, OrderErrorKind};
pub use types::{
    Account, Asset, AssetClass, Order, OrderRequest, OrderStatus, OrderStatusFilter, OrderType,
    Position, Quote, Side, TimeInForce,
};
