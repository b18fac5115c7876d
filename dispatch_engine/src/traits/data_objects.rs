use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{AgentSnapshot, CartGroupId, LifecycleEvent, Order, OrderId, OrderStatusType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InsertOrderResult {
    Inserted(Vec<Order>),
    AlreadyExists(Vec<Order>),
}

impl InsertOrderResult {
    pub fn orders(&self) -> &[Order] {
        match self {
            InsertOrderResult::Inserted(orders) | InsertOrderResult::AlreadyExists(orders) => orders,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, InsertOrderResult::Inserted(_))
    }
}

//--------------------------------------   StatusTransition    ---------------------------------------------------------
/// A guarded status change. The backend applies it only if the order is currently in one of the `expected` states
/// and the optional code and agent guards hold.
///
/// `events` are appended to the history in order, all stamped with the transition time. The last event must leave
/// the order in `new_status`. If `events` is empty, the single event for `new_status` is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub order_id: OrderId,
    pub expected: Vec<OrderStatusType>,
    pub new_status: OrderStatusType,
    pub events: Vec<LifecycleEvent>,
    pub at: DateTime<Utc>,
    /// Assign this agent to the order.
    pub agent: Option<AgentSnapshot>,
    /// Stored with the order if, and only if, `new_status` is `DeliveryCodeGenerated`. Any other status clears it.
    pub delivery_code: Option<String>,
    /// Guard: the stored code must equal this value.
    pub expected_code: Option<String>,
    /// Guard: the order must be unassigned, or assigned to this agent.
    pub expected_agent: Option<String>,
}

impl StatusTransition {
    pub fn new(order_id: OrderId, expected: &[OrderStatusType], new_status: OrderStatusType, at: DateTime<Utc>) -> Self {
        Self {
            order_id,
            expected: expected.to_vec(),
            new_status,
            events: vec![],
            at,
            agent: None,
            delivery_code: None,
            expected_code: None,
            expected_agent: None,
        }
    }

    pub fn with_agent(mut self, agent: AgentSnapshot) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn with_delivery_code<S: Into<String>>(mut self, code: S) -> Self {
        self.delivery_code = Some(code.into());
        self
    }

    pub fn when_code_is<S: Into<String>>(mut self, code: S) -> Self {
        self.expected_code = Some(code.into());
        self
    }

    pub fn when_agent_is<S: Into<String>>(mut self, agent_id: S) -> Self {
        self.expected_agent = Some(agent_id.into());
        self
    }

    /// Writes `event` to the history before the event for the new status.
    pub fn preceded_by(mut self, event: LifecycleEvent) -> Self {
        self.events.push(event);
        self
    }

    /// The full list of history entries this transition writes.
    pub fn history_events(&self) -> Vec<LifecycleEvent> {
        let mut events = self.events.clone();
        let last = LifecycleEvent::from(self.new_status);
        if events.last() != Some(&last) {
            events.push(last);
        }
        events
    }
}

//--------------------------------------   OrderQueryFilter    ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQueryFilter {
    pub order_id: Option<OrderId>,
    pub payment_id: Option<String>,
    pub cart_group: Option<CartGroupId>,
    pub wholesaler_id: Option<String>,
    /// Matches either the retailer's id or mobile number.
    pub retailer: Option<String>,
    pub delivery_agent_id: Option<String>,
    pub statuses: Vec<OrderStatusType>,
    /// Only orders that no agent has accepted yet.
    pub unassigned: bool,
    /// Only orders whose delivery code was issued strictly before this time.
    pub code_issued_before: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_payment_id<S: Into<String>>(mut self, payment_id: S) -> Self {
        self.payment_id = Some(payment_id.into());
        self
    }

    pub fn with_cart_group(mut self, cart_group: CartGroupId) -> Self {
        self.cart_group = Some(cart_group);
        self
    }

    pub fn with_wholesaler_id<S: Into<String>>(mut self, id: S) -> Self {
        self.wholesaler_id = Some(id.into());
        self
    }

    pub fn with_retailer<S: Into<String>>(mut self, id_or_mobile: S) -> Self {
        self.retailer = Some(id_or_mobile.into());
        self
    }

    pub fn with_delivery_agent_id<S: Into<String>>(mut self, id: S) -> Self {
        self.delivery_agent_id = Some(id.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn unassigned(mut self) -> Self {
        self.unassigned = true;
        self
    }

    pub fn with_code_issued_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.code_issued_before = Some(cutoff);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() &&
            self.payment_id.is_none() &&
            self.cart_group.is_none() &&
            self.wholesaler_id.is_none() &&
            self.retailer.is_none() &&
            self.delivery_agent_id.is_none() &&
            self.statuses.is_empty() &&
            !self.unassigned &&
            self.code_issued_before.is_none()
    }
}
