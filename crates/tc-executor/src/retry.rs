//! Retry policy and broker-error classification.

use std::collections::HashSet;
use std::time::Duration;

use tc_broker::{BrokerError, OrderErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Authentication,
    InvalidOrder,
    InsufficientFunds,
    RateLimit,
    Position,
    UnknownOrder,
}

/// Errors that can never succeed on retry regardless of `retry_on`.
fn is_non_retryable(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::InvalidOrder | ErrorKind::InsufficientFunds | ErrorKind::Authentication)
}

pub fn classify(error: &BrokerError) -> ErrorKind {
    match error {
        BrokerError::Connection(_) => ErrorKind::Connection,
        BrokerError::Authentication(_) => ErrorKind::Authentication,
        BrokerError::Order { kind: OrderErrorKind::InvalidOrder, .. } => ErrorKind::InvalidOrder,
        BrokerError::Order { kind: OrderErrorKind::InsufficientFunds, .. } => ErrorKind::InsufficientFunds,
        BrokerError::Position(_) => ErrorKind::Position,
        BrokerError::RateLimit { .. } => ErrorKind::RateLimit,
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RetryPolicy {
    None,
    FixedDelay(Duration),
    ExponentialBackoff { base: Duration, max_delay: Duration, jitter: f64 },
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub policy: RetryPolicy,
    pub max_attempts: u32,
    pub retry_on: HashSet<ErrorKind>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { policy: RetryPolicy::None, max_attempts: 1, retry_on: HashSet::new() }
    }
}

impl RetryConfig {
    /// Whether `error`, having just failed on `attempt` (1-indexed), should
    /// be retried. A `rate_limit` error with a server-provided
    /// `retry_after` is retried unconditionally, since the broker is
    /// explicitly telling the caller to come back.
    pub fn should_retry(&self, error: &BrokerError, attempt: u32) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        let kind = classify(error);
        if is_non_retryable(kind) {
            return false;
        }
        if let BrokerError::RateLimit { retry_after_secs: Some(_), .. } = error {
            return true;
        }
        self.retry_on.contains(&kind)
    }

    /// Delay to wait before the next attempt. `retry_after` overrides the
    /// configured policy when the broker supplied one.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(d) = retry_after {
            return d;
        }
        match self.policy {
            RetryPolicy::None => Duration::ZERO,
            RetryPolicy::FixedDelay(d) => d,
            RetryPolicy::ExponentialBackoff { base, max_delay, jitter } => {
                let scaled = base.saturating_mul(1u32 << attempt.min(16));
                let capped = scaled.min(max_delay);
                if jitter > 0.0 {
                    let factor = 1.0 - jitter + (attempt as f64 * 0.0001).fract() * (2.0 * jitter);
                    Duration::from_secs_f64((capped.as_secs_f64() * factor).max(0.0))
                } else {
                    capped
                }
            }
        }
    }
}

pub fn retry_after_duration(error: &BrokerError) -> Option<Duration> {
    match error {
        BrokerError::RateLimit { retry_after_secs: Some(secs), .. } => Some(Duration::from_secs(*secs)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_funds_never_retries() {
        let mut retry_on = HashSet::new();
        retry_on.insert(ErrorKind::InsufficientFunds);
        let cfg = RetryConfig { policy: RetryPolicy::FixedDelay(Duration::from_millis(1)), max_attempts: 5, retry_on };
        let err = BrokerError::Order { kind: OrderErrorKind::InsufficientFunds, message: "short".into() };
        assert!(!cfg.should_retry(&err, 1));
    }

    #[test]
    fn connection_errors_retry_up_to_max_attempts() {
        let mut retry_on = HashSet::new();
        retry_on.insert(ErrorKind::Connection);
        let cfg = RetryConfig { policy: RetryPolicy::FixedDelay(Duration::from_millis(1)), max_attempts: 3, retry_on };
        let err = BrokerError::Connection("down".into());
        assert!(cfg.should_retry(&err, 1));
        assert!(cfg.should_retry(&err, 2));
        assert!(!cfg.should_retry(&err, 3));
    }

    #[test]
    fn rate_limit_with_retry_after_ignores_retry_on_set() {
        let cfg = RetryConfig { policy: RetryPolicy::None, max_attempts: 2, retry_on: HashSet::new() };
        let err = BrokerError::RateLimit { message: "slow down".into(), retry_after_secs: Some(5) };
        assert!(cfg.should_retry(&err, 1));
        assert_eq!(cfg.delay_for(1, retry_after_duration(&err)), Duration::from_secs(5));
    }

    #[test]
    fn exponential_backoff_caps_at_max_delay() {
        let cfg = RetryConfig {
            policy: RetryPolicy::ExponentialBackoff {
                base: Duration::from_secs(1),
                max_delay: Duration::from_secs(10),
                jitter: 0.0,
            },
            max_attempts: 10,
            retry_on: HashSet::new(),
        };
        assert_eq!(cfg.delay_for(10, None), Duration::from_secs(10));
    }
}
