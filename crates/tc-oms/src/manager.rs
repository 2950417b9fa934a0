//! Order submission, tracking, and capacity-bounded history.

use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::{Mutex, RwLock};

use tc_broker::{Broker, Order, OrderRequest, OrderValidation};

use crate::error::OmsError;
use crate::order::{OmsEvent, TrackedOrder};
use crate::status::OrderStatus;

const DEFAULT_MAX_ORDERS: usize = 10_000;

type Callback = Box<dyn Fn(&TrackedOrder, OmsEvent) + Send + Sync>;

struct Inner {
    orders: HashMap<String, TrackedOrder>,
    insertion_order: VecDeque<String>,
}

pub struct OrderManager {
    inner: Mutex<Inner>,
    callbacks: RwLock<Vec<Callback>>,
    max_orders: usize,
    validate_on_submit: bool,
}

fn map_broker_status(status: tc_broker::OrderStatus) -> OrderStatus {
    match status {
        tc_broker::OrderStatus::New => OrderStatus::New,
        tc_broker::OrderStatus::PartiallyFilled => OrderStatus::PartiallyFilled,
        tc_broker::OrderStatus::Filled => OrderStatus::Filled,
        tc_broker::OrderStatus::Cancelled => OrderStatus::Cancelled,
        tc_broker::OrderStatus::Rejected => OrderStatus::Rejected,
        tc_broker::OrderStatus::Expired => OrderStatus::Expired,
        tc_broker::OrderStatus::Replaced => OrderStatus::Replaced,
    }
}

fn event_for_status(status: OrderStatus) -> OmsEvent {
    match status {
        OrderStatus::PendingNew => OmsEvent::Created,
        OrderStatus::New => OmsEvent::Accepted,
        OrderStatus::PartiallyFilled => OmsEvent::PartiallyFilled,
        OrderStatus::Filled => OmsEvent::Filled,
        OrderStatus::PendingCancel => OmsEvent::PendingCancel,
        OrderStatus::Cancelled => OmsEvent::Cancelled,
        OrderStatus::Rejected => OmsEvent::Rejected,
        OrderStatus::Expired => OmsEvent::Expired,
        OrderStatus::Replaced => OmsEvent::Replaced,
    }
}

impl OrderManager {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ORDERS)
    }

    pub fn with_capacity(max_orders: usize) -> Self {
        Self {
            inner: Mutex::new(Inner { orders: HashMap::new(), insertion_order: VecDeque::new() }),
            callbacks: RwLock::new(Vec::new()),
            max_orders,
            validate_on_submit: true,
        }
    }

    pub fn without_validation(mut self) -> Self {
        self.validate_on_submit = false;
        self
    }

    pub fn on_event(&self, callback: Callback) {
        self.callbacks.write().unwrap().push(callback);
    }

    fn fire(&self, order: &TrackedOrder, event: OmsEvent) {
        for callback in self.callbacks.read().unwrap().iter() {
            // A panicking callback must not abort the submit path.
            let _ = std::panic::catch_unwind(AssertUnwindSafe(|| callback(order, event)));
        }
    }

    fn evict_if_needed(inner: &mut Inner, max_orders: usize) {
        if inner.orders.len() < max_orders {
            return;
        }
        let terminal_slot = inner
            .insertion_order
            .iter()
            .position(|id| inner.orders.get(id).map(|o| o.status.is_terminal()).unwrap_or(true));
        let evict_index = terminal_slot.unwrap_or(0);
        if let Some(id) = inner.insertion_order.remove(evict_index) {
            inner.orders.remove(&id);
        }
    }

    pub fn get(&self, client_order_id: &str) -> Option<TrackedOrder> {
        self.inner.lock().unwrap().orders.get(client_order_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn validate_order(
        &self,
        broker: &dyn Broker,
        request: &OrderRequest,
    ) -> Result<OrderValidation, OmsError> {
        Ok(broker.validate_order(request).await?)
    }

    /// Validates (unless disabled), submits via `broker`, tracks the
    /// resulting order, and fires the matching lifecycle callbacks.
    pub async fn submit_order(&self, broker: &dyn Broker, request: OrderRequest) -> Result<TrackedOrder, OmsError> {
        if self.validate_on_submit {
            let validation = broker.validate_order(&request).await?;
            if !validation.valid {
                return Err(OmsError::Validation(validation.errors));
            }
        }

        let client_order_id = request.client_order_id.clone();
        let mut tracked = TrackedOrder::new(request.clone());
        tracked.history.push(crate::order::HistoryEntry {
            event: OmsEvent::Submitted,
            from: Some(OrderStatus::PendingNew),
            to: OrderStatus::PendingNew,
            recorded_at: chrono::Utc::now(),
            out_of_band: false,
        });

        {
            let mut inner = self.inner.lock().unwrap();
            Self::evict_if_needed(&mut inner, self.max_orders);
            inner.insertion_order.push_back(client_order_id.clone());
            inner.orders.insert(client_order_id.clone(), tracked.clone());
        }
        self.fire(&tracked, OmsEvent::Submitted);

        match broker.submit_order(request).await {
            Ok(broker_order) => {
                let new_status = map_broker_status(broker_order.status);
                self.apply_broker_order(&client_order_id, broker_order, new_status)
            }
            Err(e) => {
                self.update_order_status(&client_order_id, OrderStatus::Rejected);
                Err(OmsError::Broker(e))
            }
        }
    }

    fn apply_broker_order(
        &self,
        client_order_id: &str,
        broker_order: Order,
        new_status: OrderStatus,
    ) -> Result<TrackedOrder, OmsError> {
        let tracked = {
            let mut inner = self.inner.lock().unwrap();
            let tracked = inner.orders.get_mut(client_order_id).ok_or_else(|| OmsError::UnknownOrder(client_order_id.to_string()))?;
            tracked.broker_order = Some(broker_order);
            tracked.transition(event_for_status(new_status), new_status);
            tracked.clone()
        };
        self.fire(&tracked, event_for_status(new_status));
        Ok(tracked)
    }

    /// Records a broker-reported transition. The broker is authoritative:
    /// a transition outside the legal matrix is still applied, with a
    /// warning logged rather than an error returned.
    pub fn update_order_status(&self, client_order_id: &str, new_status: OrderStatus) -> Option<TrackedOrder> {
        let tracked = {
            let mut inner = self.inner.lock().unwrap();
            let tracked = inner.orders.get_mut(client_order_id)?;
            let legal = tracked.transition(event_for_status(new_status), new_status);
            if !legal {
                tracing::warn!(
                    order_id = client_order_id,
                    to = ?new_status,
                    "broker reported an out-of-matrix order transition; applying anyway"
                );
            }
            tracked.clone()
        };
        self.fire(&tracked, event_for_status(new_status));
        Some(tracked)
    }

    pub async fn cancel_order(&self, broker: &dyn Broker, client_order_id: &str) -> Result<(), OmsError> {
        {
            let mut inner = self.inner.lock().unwrap();
            let tracked = inner
                .orders
                .get_mut(client_order_id)
                .ok_or_else(|| OmsError::UnknownOrder(client_order_id.to_string()))?;
            tracked.transition(OmsEvent::PendingCancel, OrderStatus::PendingCancel);
        }
        broker.cancel_order(client_order_id).await?;
        self.update_order_status(client_order_id, OrderStatus::Cancelled);
        Ok(())
    }

    pub async fn replace_order(
        &self,
        broker: &dyn Broker,
        client_order_id: &str,
        new_request: OrderRequest,
    ) -> Result<TrackedOrder, OmsError> {
        let broker_order = broker.replace_order(client_order_id, new_request.clone()).await?;
        self.update_order_status(client_order_id, OrderStatus::Replaced);

        let replacement_id = new_request.client_order_id.clone();
        let mut replacement = TrackedOrder::new(new_request);
        let new_status = map_broker_status(broker_order.status);
        replacement.broker_order = Some(broker_order);
        replacement.transition(event_for_status(new_status), new_status);

        {
            let mut inner = self.inner.lock().unwrap();
            Self::evict_if_needed(&mut inner, self.max_orders);
            inner.insertion_order.push_back(replacement_id.clone());
            inner.orders.insert(replacement_id, replacement.clone());
        }
        self.fire(&replacement, event_for_status(new_status));
        Ok(replacement)
    }
}

impl Default for OrderManager {
    fn default() -> Self {
        Self::new()
    }
}
