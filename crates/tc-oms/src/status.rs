//! The nine-value order lifecycle status and its transition matrix.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    PendingNew,
    New,
    PartiallyFilled,
    Filled,
    PendingCancel,
    Cancelled,
    Rejected,
    Expired,
    Replaced,
}

impl OrderStatus {
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            OrderStatus::PendingNew | OrderStatus::New | OrderStatus::PartiallyFilled | OrderStatus::PendingCancel
        )
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }
}

/// Returns whether `from -> to` appears in the authoritative transition
/// table. A same-state transition is legal wherever the source state is
/// still open (a repeated `new` or `partially_filled` report is a no-op,
/// not an error) and illegal once terminal.
pub fn is_legal_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    match from {
        PendingNew => matches!(to, New | Rejected | Cancelled),
        New => matches!(
            to,
            PartiallyFilled | Filled | PendingCancel | Cancelled | Expired | Replaced
        ),
        PartiallyFilled => matches!(to, PartiallyFilled | Filled | PendingCancel | Cancelled),
        PendingCancel => matches!(to, Cancelled | Filled | PartiallyFilled),
        Filled | Cancelled | Rejected | Expired | Replaced => false,
    }
}
