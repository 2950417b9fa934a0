use std::fmt;
use std::sync::Arc;

use tc_broker::{AssetClass, Broker};

#[derive(Clone)]
pub struct BrokerRegistration {
    pub name: String,
    pub broker: Arc<dyn Broker>,
    pub supported_asset_classes: Vec<AssetClass>,
    /// Higher priority wins when more than one registered broker supports
    /// the same asset class.
    pub priority: u32,
}

impl fmt::Debug for BrokerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerRegistration")
            .field("name", &self.name)
            .field("supported_asset_classes", &self.supported_asset_classes)
            .field("priority", &self.priority)
            .finish()
    }
}

impl BrokerRegistration {
    pub fn supports(&self, class: AssetClass) -> bool {
        self.supported_asset_classes.contains(&class)
    }
}
