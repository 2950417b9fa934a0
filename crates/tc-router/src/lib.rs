//! Symbol→asset-class classification and priority-weighted broker
//! selection over a registry of connected brokers, with a bounded routing
//! history ring and best-bid/ask quote aggregation across brokers that
//! support a symbol's asset class.

mod classifier;
mod registry;
mod router;

pub use classifier::SymbolClassifier;
pub use registry::BrokerRegistration;
pub use router::{BrokerRouter, RouterError, RoutingRecord};
