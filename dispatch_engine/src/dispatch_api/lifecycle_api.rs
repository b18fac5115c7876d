use std::{fmt::Debug, sync::Arc};

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use log::*;
use serde::Serialize;

use crate::{
    db_types::{DeliveryAgentProfile, LifecycleEvent, Order, OrderId, OrderStatusType},
    dispatch_api::{errors::DispatchError, rules::DispatchRules},
    events::{DeliveryCodeIssuedEvent, EventProducers, OrderStatusChangedEvent},
    helpers::{generate_delivery_code, Clock, SystemClock},
    matcher::DeliveryMatcher,
    traits::{DispatchDatabase, OrderQueryFilter, StatusTransition},
};

/// The result of issuing a delivery code. The code itself is only ever sent to the retailer, so it is not serialized.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedDeliveryCode {
    pub order: Order,
    #[serde(skip)]
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// `OrderLifecycleApi` drives an order through its delivery states:
///
/// ```text
/// paid ──accept──▶ delivery_accepted ──pickup──▶ picked_up ──code──▶ delivery_code_generated ──verify──▶ delivered
///   └──────────────────pickup──────────────────────▲    ▲                     │
///                                                       └──────expiry─────────┘
/// ```
///
/// Every transition is a compare-and-swap on the current status in the backend, so of two racing calls exactly one
/// wins and the other sees [`DispatchError::InvalidState`].
pub struct OrderLifecycleApi<B> {
    db: B,
    producers: EventProducers,
    matcher: DeliveryMatcher,
    rules: DispatchRules,
    clock: Arc<dyn Clock>,
}

impl<B> Debug for OrderLifecycleApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderLifecycleApi({:?}, {:?})", self.matcher, self.rules)
    }
}

impl<B> OrderLifecycleApi<B> {
    pub fn new(db: B, producers: EventProducers, matcher: DeliveryMatcher, rules: DispatchRules) -> Self {
        Self { db, producers, matcher, rules, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn rules(&self) -> &DispatchRules {
        &self.rules
    }

    pub fn matcher(&self) -> &DeliveryMatcher {
        &self.matcher
    }
}

impl<B> OrderLifecycleApi<B>
where B: DispatchDatabase
{
    /// `accept`. Only a `paid` order can be accepted, and only by a registered agent with a live location inside the
    /// matching radius of the pickup point. The agent's name and mobile are copied from the stored profile.
    pub async fn accept_order(&self, order_id: &OrderId, agent_id: &str) -> Result<Order, DispatchError> {
        let order = self.fetch_existing(order_id).await?;
        if order.status != OrderStatusType::Paid {
            return Err(DispatchError::invalid_state(order_id, order.status, "accepted"));
        }
        let agent = self.agent_in_range(&order, agent_id).await?;
        let transition =
            StatusTransition::new(order_id.clone(), &[OrderStatusType::Paid], OrderStatusType::DeliveryAccepted, self.now())
                .with_agent(agent.snapshot())
                .when_agent_is(agent_id);
        let updated = self.transition_or_conflict(transition, "accepted").await?;
        info!("🔄️🛵️ Order {order_id} accepted by agent {agent_id}");
        self.publish_status_change(&updated, order.status).await;
        Ok(updated)
    }

    /// `pickup`. Allowed from `paid` (skipping the accept step) or from `delivery_accepted` by the agent that accepted
    /// the order. The agent details are re-read from the profile.
    pub async fn pickup_order(&self, order_id: &OrderId, agent_id: &str) -> Result<Order, DispatchError> {
        let order = self.fetch_existing(order_id).await?;
        match order.status {
            OrderStatusType::Paid => {},
            OrderStatusType::DeliveryAccepted if order.agent_id() == Some(agent_id) => {},
            OrderStatusType::DeliveryAccepted => {
                warn!(
                    "🔄️📦️ Agent {agent_id} tried to pick up order {order_id}, which is assigned to {}",
                    order.agent_id().unwrap_or("nobody")
                );
                return Err(DispatchError::invalid_state(order_id, order.status, "picked up by another agent"));
            },
            status => return Err(DispatchError::invalid_state(order_id, status, "picked up")),
        }
        let agent = self.agent_in_range(&order, agent_id).await?;
        let transition = StatusTransition::new(
            order_id.clone(),
            &[OrderStatusType::Paid, OrderStatusType::DeliveryAccepted],
            OrderStatusType::PickedUp,
            self.now(),
        )
        .with_agent(agent.snapshot())
        .when_agent_is(agent_id);
        let updated = self.transition_or_conflict(transition, "picked up").await?;
        info!("🔄️📦️ Order {order_id} picked up by agent {agent_id}");
        self.publish_status_change(&updated, order.status).await;
        Ok(updated)
    }

    /// `generateDeliveryCode`. Issues a fresh code for a picked-up order. Calling it again while a code is live
    /// rotates the code; the previous one stops working immediately.
    pub async fn generate_delivery_code(&self, order_id: &OrderId) -> Result<IssuedDeliveryCode, DispatchError> {
        let order = self.fetch_existing(order_id).await?;
        if !matches!(order.status, OrderStatusType::PickedUp | OrderStatusType::DeliveryCodeGenerated) {
            return Err(DispatchError::invalid_state(order_id, order.status, "given a delivery code"));
        }
        if order.delivery_agent.is_none() {
            return Err(DispatchError::AgentNotAssigned(order_id.clone()));
        }
        let code = generate_delivery_code(self.rules.code_length);
        let transition = StatusTransition::new(
            order_id.clone(),
            &[OrderStatusType::PickedUp, OrderStatusType::DeliveryCodeGenerated],
            OrderStatusType::DeliveryCodeGenerated,
            self.now(),
        )
        .with_delivery_code(code.clone());
        let updated = self.transition_or_conflict(transition, "given a delivery code").await?;
        let issued_at = updated.delivery_code_time.unwrap_or(updated.updated_at);
        let expires_at = issued_at + self.rules.code_expiry;
        info!("🔄️🔑️ Delivery code issued for order {order_id}. It expires at {expires_at}");
        let event = DeliveryCodeIssuedEvent::new(updated.clone(), code.clone(), expires_at);
        self.producers.publish_code_issued(event).await;
        if order.status != updated.status {
            self.publish_status_change(&updated, order.status).await;
        }
        Ok(IssuedDeliveryCode { order: updated, code, expires_at })
    }

    /// `verifyDeliveryCode`. Expiry is checked before the code itself: an expired code regresses the order to
    /// `picked_up` and clears the code, whether or not the supplied code was right. A wrong code changes nothing and
    /// may be retried.
    pub async fn verify_delivery_code(&self, order_id: &OrderId, code: &str) -> Result<Order, DispatchError> {
        let order = self.fetch_existing(order_id).await?;
        if order.status != OrderStatusType::DeliveryCodeGenerated {
            return Err(DispatchError::invalid_state(order_id, order.status, "verified"));
        }
        let now = self.now();
        if self.code_has_expired(&order, now) {
            if let Some(regressed) = self.regress_expired(&order, now).await? {
                self.publish_status_change(&regressed, order.status).await;
            }
            return Err(DispatchError::CodeExpired(order_id.clone()));
        }
        let Some(stored) = order.delivery_code.as_deref() else {
            error!("🔄️🔑️ Order {order_id} is {} but has no stored code", order.status);
            return Err(DispatchError::WrongCode(order_id.clone()));
        };
        if stored != code {
            debug!("🔄️🔑️ Wrong delivery code supplied for order {order_id}");
            return Err(DispatchError::WrongCode(order_id.clone()));
        }
        let transition = StatusTransition::new(
            order_id.clone(),
            &[OrderStatusType::DeliveryCodeGenerated],
            OrderStatusType::Delivered,
            now,
        )
        .when_code_is(code);
        match self.db.apply_transition(transition).await? {
            Some(delivered) => {
                info!("🔄️✅️ Order {order_id} delivered");
                self.publish_status_change(&delivered, order.status).await;
                Ok(delivered)
            },
            None => {
                // The code was rotated or consumed between the read and the write
                let current = self.fetch_existing(order_id).await?;
                if current.status == OrderStatusType::DeliveryCodeGenerated {
                    Err(DispatchError::WrongCode(order_id.clone()))
                } else {
                    Err(DispatchError::invalid_state(order_id, current.status, "verified"))
                }
            },
        }
    }

    /// Orders that are paid, not yet taken by any agent, and whose pickup point is within the agent's reach.
    pub async fn list_available_orders(&self, agent_id: &str) -> Result<Vec<Order>, DispatchError> {
        let agent = self.fetch_agent(agent_id).await?;
        if agent.location.is_none() {
            return Err(DispatchError::AgentProfileMissing(format!("Agent {agent_id} has not reported a live location.")));
        }
        let query = OrderQueryFilter::default().with_status(OrderStatusType::Paid).unassigned();
        let candidates = self.db.search_orders(query).await?;
        let checks = candidates.iter().map(|order| self.matcher.check_in_range(order.origin(), &agent));
        let results = join_all(checks).await;
        let available = candidates
            .into_iter()
            .zip(results)
            .filter_map(|(order, in_range)| in_range.ok().map(|_| order))
            .collect::<Vec<_>>();
        trace!("🔄️ {} orders are available to agent {agent_id}", available.len());
        Ok(available)
    }

    /// The periodic sweep. Every order whose code has outlived the expiry window is regressed to `picked_up` exactly
    /// as a late verification would. Returns the regressed orders.
    pub async fn expire_stale_codes(&self) -> Result<Vec<Order>, DispatchError> {
        let now = self.now();
        let cutoff = now - self.rules.code_expiry;
        let query = OrderQueryFilter::default()
            .with_status(OrderStatusType::DeliveryCodeGenerated)
            .with_code_issued_before(cutoff);
        let stale = self.db.search_orders(query).await?;
        let mut regressed = Vec::with_capacity(stale.len());
        for order in stale {
            if let Some(updated) = self.regress_expired(&order, now).await? {
                self.publish_status_change(&updated, order.status).await;
                regressed.push(updated);
            }
        }
        if !regressed.is_empty() {
            info!("🔄️⏰️ {} expired delivery code(s) cleared", regressed.len());
        }
        Ok(regressed)
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn code_has_expired(&self, order: &Order, now: DateTime<Utc>) -> bool {
        match order.delivery_code_time {
            Some(issued) => now - issued > self.rules.code_expiry,
            None => true,
        }
    }

    /// Regresses the order to `picked_up` if it still holds the same code. `None` means someone else got there first.
    async fn regress_expired(&self, order: &Order, now: DateTime<Utc>) -> Result<Option<Order>, DispatchError> {
        let mut transition = StatusTransition::new(
            order.order_id.clone(),
            &[OrderStatusType::DeliveryCodeGenerated],
            OrderStatusType::PickedUp,
            now,
        )
        .preceded_by(LifecycleEvent::CodeExpired);
        if let Some(code) = &order.delivery_code {
            transition = transition.when_code_is(code.clone());
        }
        let result = self.db.apply_transition(transition).await?;
        if result.is_some() {
            info!("🔄️⏰️ Delivery code for order {} expired. The order is back to picked_up", order.order_id);
        }
        Ok(result)
    }

    async fn fetch_existing(&self, order_id: &OrderId) -> Result<Order, DispatchError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| DispatchError::OrderNotFound(order_id.clone()))
    }

    async fn fetch_agent(&self, agent_id: &str) -> Result<DeliveryAgentProfile, DispatchError> {
        self.db
            .fetch_agent(agent_id)
            .await?
            .ok_or_else(|| DispatchError::AgentProfileMissing(format!("Agent {agent_id} has no profile.")))
    }

    async fn agent_in_range(&self, order: &Order, agent_id: &str) -> Result<DeliveryAgentProfile, DispatchError> {
        let agent = self.fetch_agent(agent_id).await?;
        let distance = self.matcher.check_in_range(order.origin(), &agent).await?;
        trace!("🔄️ Agent {agent_id} is {distance:.2} km from the pickup point of order {}", order.order_id);
        Ok(agent)
    }

    /// Applies the transition. If a guard fails, the current state is re-read to report why.
    async fn transition_or_conflict(&self, transition: StatusTransition, action: &str) -> Result<Order, DispatchError> {
        let order_id = transition.order_id.clone();
        match self.db.apply_transition(transition).await? {
            Some(order) => Ok(order),
            None => {
                let current = self.fetch_existing(&order_id).await?;
                debug!("🔄️ Order {order_id} changed to {} before it could be {action}", current.status);
                Err(DispatchError::invalid_state(&order_id, current.status, action))
            },
        }
    }

    async fn publish_status_change(&self, order: &Order, previous: OrderStatusType) {
        let event = OrderStatusChangedEvent::new(order.clone(), previous);
        self.producers.publish_status_changed(event).await;
    }
}
