use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderErrorKind {
    InsufficientFunds,
    InvalidOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    Connection(String),
    Authentication(String),
    Order { kind: OrderErrorKind, message: String },
    Position(String),
    RateLimit { message: String, retry_after_secs: Option<u64> },
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerError::Connection(msg) => write!(f, "connection error: {msg}"),
            BrokerError::Authentication(msg) => write!(f, "authentication error: {msg}"),
            BrokerError::Order { kind, message } => write!(f, "order error ({kind:?}): {message}"),
            BrokerError::Position(msg) => write!(f, "position error: {msg}"),
            BrokerError::RateLimit { message, retry_after_secs } => match retry_after_secs {
                Some(secs) => write!(f, "rate limited (retry after {secs}s): {message}"),
                None => write!(f, "rate limited: {message}"),
            },
        }
    }
}

impl std::error::Error for BrokerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_retry_after() {
        let e = BrokerError::RateLimit {
            message: "too many requests".to_string(),
            retry_after_secs: Some(30),
        };
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn display_order_error_names_kind() {
        let e = BrokerError::Order {
            kind: OrderErrorKind::InsufficientFunds,
            message: "cash short".to_string(),
        };
        assert!(e.to_string().contains("InsufficientFunds"));
    }
}
