use std::{fmt::Debug, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::{
    db_types::{Order, OrderId, OrderStatusType, PartyRole},
    dispatch_api::errors::DispatchError,
    helpers::{Clock, SystemClock},
    traits::{OrderManagement, OrderQueryFilter},
};

/// Read-only views over orders. Only needs an [`OrderManagement`] backend.
pub struct OrderQueryApi<B> {
    db: B,
    delivered_visibility: Duration,
    clock: Arc<dyn Clock>,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi")
    }
}

impl<B> OrderQueryApi<B> {
    pub fn new(db: B, delivered_visibility: Duration) -> Self {
        Self { db, delivered_visibility, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement
{
    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, DispatchError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| DispatchError::OrderNotFound(order_id.clone()))
    }

    /// `listActiveOrders`. All of the party's orders, except delivered orders whose delivery is older than the
    /// visibility window. Retailers may be looked up by id or by mobile number.
    pub async fn list_active_orders(&self, role: PartyRole, party_key: &str) -> Result<Vec<Order>, DispatchError> {
        let party_key = party_key.trim();
        if party_key.is_empty() {
            return Err(DispatchError::InvalidRequest("A party id is required".into()));
        }
        let query = match role {
            PartyRole::Wholesaler => OrderQueryFilter::default().with_wholesaler_id(party_key),
            PartyRole::Retailer => OrderQueryFilter::default().with_retailer(party_key),
            PartyRole::DeliveryAgent => OrderQueryFilter::default().with_delivery_agent_id(party_key),
        };
        let now = self.clock.now();
        let orders = self.db.search_orders(query).await?;
        let total = orders.len();
        let active = orders.into_iter().filter(|o| self.is_visible(o, now)).collect::<Vec<_>>();
        trace!("🔄️ {role} {party_key} has {} active orders ({total} in total)", active.len());
        Ok(active)
    }

    fn is_visible(&self, order: &Order, now: DateTime<Utc>) -> bool {
        if order.status != OrderStatusType::Delivered {
            return true;
        }
        let delivered_at = order.delivered_at().unwrap_or(order.updated_at);
        now - delivered_at <= self.delivered_visibility
    }
}
