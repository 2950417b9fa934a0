//! Tracked order state and the event taxonomy fired to callbacks.

use chrono::{DateTime, Utc};
use tc_broker::{Order, OrderRequest};

use crate::status::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmsEvent {
    Created,
    Submitted,
    Accepted,
    Rejected,
    PartiallyFilled,
    Filled,
    PendingCancel,
    Cancelled,
    Replaced,
    Expired,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub event: OmsEvent,
    pub from: Option<OrderStatus>,
    pub to: OrderStatus,
    pub recorded_at: DateTime<Utc>,
    /// Set when the broker reported a transition outside the legal matrix;
    /// the broker is authoritative, so the transition is still applied.
    pub out_of_band: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedOrder {
    pub request: OrderRequest,
    pub broker_order: Option<Order>,
    pub status: OrderStatus,
    pub history: Vec<HistoryEntry>,
}

impl TrackedOrder {
    pub fn new(request: OrderRequest) -> Self {
        let now = Utc::now();
        Self {
            request,
            broker_order: None,
            status: OrderStatus::PendingNew,
            history: vec![HistoryEntry {
                event: OmsEvent::Created,
                from: None,
                to: OrderStatus::PendingNew,
                recorded_at: now,
                out_of_band: false,
            }],
        }
    }

    pub fn client_order_id(&self) -> &str {
        &self.request.client_order_id
    }

    fn record(&mut self, event: OmsEvent, to: OrderStatus, out_of_band: bool) {
        let from = Some(self.status);
        self.status = to;
        self.history.push(HistoryEntry { event, from, to, recorded_at: Utc::now(), out_of_band });
    }

    pub(crate) fn transition(&mut self, event: OmsEvent, to: OrderStatus) -> bool {
        let legal = crate::status::is_legal_transition(self.status, to) || self.status == to;
        self.record(event, to, !legal);
        legal
    }
}
