//! Bounded execution event history, the monitoring surface callers poll or
//! drain for observability.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SignalReceived,
    OrderBuilt,
    RiskChecked,
    Submitted,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    BracketPlaced,
    Timeout,
    Error,
}

#[derive(Debug, Clone)]
pub struct ExecutionEvent {
    pub kind: EventKind,
    pub signal_id: String,
    pub order_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub detail: String,
}

impl ExecutionEvent {
    pub fn new(kind: EventKind, signal_id: impl Into<String>, order_id: Option<String>, detail: impl Into<String>) -> Self {
        Self { kind, signal_id: signal_id.into(), order_id, timestamp: Utc::now(), detail: detail.into() }
    }
}

/// FIFO-bounded ring of [`ExecutionEvent`]; oldest entries drop silently
/// once `capacity` is reached, matching the bounded histories used
/// elsewhere in the order-management stack.
pub struct EventHistory {
    capacity: usize,
    events: VecDeque<ExecutionEvent>,
}

impl EventHistory {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, events: VecDeque::with_capacity(capacity.min(1024)) }
    }

    pub fn push(&mut self, event: ExecutionEvent) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecutionEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
