use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType};

/// A confirmed payment produced a new order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// An order moved to a new status. `order` is the state after the transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub previous: OrderStatusType,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, previous: OrderStatusType) -> Self {
        Self { order, previous }
    }
}

/// A handoff code was issued (or re-issued). The code travels only to the retailer, over SMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryCodeIssuedEvent {
    pub order: Order,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl DeliveryCodeIssuedEvent {
    pub fn new(order: Order, code: String, expires_at: DateTime<Utc>) -> Self {
        Self { order, code, expires_at }
    }
}
