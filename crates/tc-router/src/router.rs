//! Symbol→asset-class classification and priority-weighted broker
//! selection over a registry of connected brokers.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, RwLock};

use tc_broker::{AssetClass, Broker, BrokerError, Quote};

use crate::classifier::SymbolClassifier;
use crate::registry::BrokerRegistration;

const DEFAULT_HISTORY_CAPACITY: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    NoBrokerForAssetClass { symbol: String, asset_class: AssetClass },
    UnknownBroker(String),
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::NoBrokerForAssetClass { symbol, asset_class } => {
                write!(f, "no broker registered for {symbol} (asset class {asset_class:?})")
            }
            RouterError::UnknownBroker(name) => write!(f, "no broker registered under name '{name}'"),
        }
    }
}

impl std::error::Error for RouterError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRecord {
    pub symbol: String,
    pub asset_class: AssetClass,
    pub broker_name: String,
}

pub struct BrokerRouter {
    classifier: SymbolClassifier,
    registrations: RwLock<Vec<BrokerRegistration>>,
    fallback: Option<String>,
    history: RwLock<VecDeque<RoutingRecord>>,
    history_capacity: usize,
}

impl BrokerRouter {
    pub fn new(classifier: SymbolClassifier, fallback: Option<String>) -> Self {
        Self {
            classifier,
            registrations: RwLock::new(Vec::new()),
            fallback,
            history: RwLock::new(VecDeque::new()),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        broker: Arc<dyn Broker>,
        supported_asset_classes: Vec<AssetClass>,
        priority: u32,
    ) {
        let mut registrations = self.registrations.write().unwrap();
        registrations.push(BrokerRegistration {
            name: name.into(),
            broker,
            supported_asset_classes,
            priority,
        });
    }

    pub fn classify(&self, symbol: &str) -> AssetClass {
        self.classifier.classify(symbol)
    }

    fn record_routing(&self, symbol: &str, asset_class: AssetClass, broker_name: &str) {
        let mut history = self.history.write().unwrap();
        if history.len() >= self.history_capacity {
            history.pop_front();
        }
        history.push_back(RoutingRecord {
            symbol: symbol.to_string(),
            asset_class,
            broker_name: broker_name.to_string(),
        });
    }

    /// Selects a broker supporting `symbol`'s asset class, preferring the
    /// highest-priority registration; falls back to the configured fallback
    /// broker name when nothing matches.
    pub fn route(&self, symbol: &str) -> Result<Arc<dyn Broker>, RouterError> {
        let asset_class = self.classifier.classify(symbol);
        let registrations = self.registrations.read().unwrap();

        let chosen = registrations
            .iter()
            .filter(|r| r.supports(asset_class))
            .max_by_key(|r| r.priority);

        let chosen = match chosen {
            Some(r) => r,
            None => match &self.fallback {
                Some(fallback_name) => registrations
                    .iter()
                    .find(|r| &r.name == fallback_name)
                    .ok_or_else(|| RouterError::UnknownBroker(fallback_name.clone()))?,
                None => {
                    return Err(RouterError::NoBrokerForAssetClass {
                        symbol: symbol.to_string(),
                        asset_class,
                    })
                }
            },
        };

        let broker = chosen.broker.clone();
        let name = chosen.name.clone();
        drop(registrations);
        self.record_routing(symbol, asset_class, &name);
        Ok(broker)
    }

    pub fn history(&self) -> Vec<RoutingRecord> {
        self.history.read().unwrap().iter().cloned().collect()
    }

    pub fn registered_names(&self) -> Vec<String> {
        self.registrations.read().unwrap().iter().map(|r| r.name.clone()).collect()
    }

    /// Queries every broker whose registration supports `symbol`'s asset
    /// class and returns the aggregated best bid and best ask across them.
    /// Brokers that error or have no quote are skipped rather than failing
    /// the whole aggregation.
    pub async fn best_quote(&self, symbol: &str) -> Result<Quote, RouterError> {
        let asset_class = self.classifier.classify(symbol);
        let candidates: Vec<Arc<dyn Broker>> = {
            let registrations = self.registrations.read().unwrap();
            registrations.iter().filter(|r| r.supports(asset_class)).map(|r| r.broker.clone()).collect()
        };
        if candidates.is_empty() {
            return Err(RouterError::NoBrokerForAssetClass { symbol: symbol.to_string(), asset_class });
        }

        let mut best: Option<Quote> = None;
        for broker in candidates {
            let quote: Result<Quote, BrokerError> = broker.get_quote(symbol).await;
            if let Ok(q) = quote {
                best = Some(match best {
                    None => q,
                    Some(prev) => Quote {
                        bid: prev.bid.max(q.bid),
                        ask: prev.ask.min(q.ask),
                    },
                });
            }
        }

        best.ok_or(RouterError::NoBrokerForAssetClass { symbol: symbol.to_string(), asset_class })
    }
}
