use std::fmt;

use tc_broker::BrokerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OmsError {
    Validation(Vec<String>),
    Broker(BrokerError),
    UnknownOrder(String),
}

impl fmt::Display for OmsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OmsError::Validation(errors) => write!(f, "order failed validation: {}", errors.join("; ")),
            OmsError::Broker(e) => write!(f, "broker error: {e}"),
            OmsError::UnknownOrder(id) => write!(f, "no tracked order with id '{id}'"),
        }
    }
}

impl std::error::Error for OmsError {}

impl From<BrokerError> for OmsError {
    fn from(value: BrokerError) -> Self {
        OmsError::Broker(value)
    }
}
