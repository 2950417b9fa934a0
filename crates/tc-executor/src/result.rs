//! The terminal outcome of a single signal execution.

use tc_oms::TrackedOrder;
use tc_risk::Violation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Filled,
    PartiallyFilled,
    Rejected,
    Cancelled,
    TimedOut,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub signal_id: String,
    pub outcome: ExecutionOutcome,
    pub order: Option<TrackedOrder>,
    pub bracket_orders: Vec<TrackedOrder>,
    pub risk_violations: Vec<Violation>,
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn failed(signal_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            signal_id: signal_id.into(),
            outcome: ExecutionOutcome::Failed,
            order: None,
            bracket_orders: Vec::new(),
            risk_violations: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn rejected(signal_id: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self {
            signal_id: signal_id.into(),
            outcome: ExecutionOutcome::Rejected,
            order: None,
            bracket_orders: Vec::new(),
            risk_violations: violations,
            error: None,
        }
    }
}
