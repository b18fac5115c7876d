use std::{fmt::Debug, future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::{
    db_types::PartyRole,
    events::{DeliveryCodeIssuedEvent, EventHooks, OrderCreatedEvent, OrderStatusChangedEvent},
    matcher::DeliveryMatcher,
    notifications::{
        code_issued_sms,
        order_available_notification,
        order_created_notification,
        status_notifications,
        Notification,
        PushSender,
        Recipient,
        SendError,
        SmsSender,
    },
    traits::{AgentManagement, PartyManagement},
};
#[cfg(feature = "sqlite")]
use crate::SqliteDatabase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    /// The recipient has not registered a push token.
    NoToken,
    /// The provider rejected the token, and it has been removed.
    TokenCleared,
    Failed,
}

pub struct NotificationDispatch<B> {
    db: B,
    push: Arc<dyn PushSender>,
    sms: Arc<dyn SmsSender>,
    matcher: DeliveryMatcher,
}

impl<B> Debug for NotificationDispatch<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationDispatch({:?})", self.matcher)
    }
}

impl<B> NotificationDispatch<B> {
    pub fn new(db: B, push: Arc<dyn PushSender>, sms: Arc<dyn SmsSender>, matcher: DeliveryMatcher) -> Self {
        Self { db, push, sms, matcher }
    }
}

impl<B> NotificationDispatch<B>
where B: PartyManagement + AgentManagement
{
    /// `notify`. Looks up the recipient's push token and sends the message. Never fails: problems are logged, and an
    /// invalid token is removed from the registry.
    pub async fn notify(&self, recipient: &Recipient, message: &Notification) -> NotifyOutcome {
        let token = match self.db.fetch_push_token(recipient.role, &recipient.id).await {
            Ok(Some(t)) => t.token,
            Ok(None) => {
                debug!("🔔️ {recipient} has no push token. '{}' not sent.", message.title);
                return NotifyOutcome::NoToken;
            },
            Err(e) => {
                error!("🔔️ Could not look up the push token for {recipient}. {e}");
                return NotifyOutcome::Failed;
            },
        };
        match self.push.send_push(&token, message).await {
            Ok(()) => {
                debug!("🔔️ '{}' sent to {recipient}", message.title);
                NotifyOutcome::Sent
            },
            Err(SendError::InvalidToken) => {
                info!("🔔️ The push token for {recipient} is no longer valid. Removing it.");
                if let Err(e) = self.db.clear_push_token(recipient.role, &recipient.id, &token).await {
                    error!("🔔️ Could not remove the stale token for {recipient}. {e}");
                }
                NotifyOutcome::TokenCleared
            },
            Err(e) => {
                warn!("🔔️ '{}' could not be sent to {recipient}. {e}", message.title);
                NotifyOutcome::Failed
            },
        }
    }

    pub async fn send_sms(&self, number: &str, text: &str) -> bool {
        match self.sms.send_sms(number, text).await {
            Ok(()) => true,
            Err(e) => {
                warn!("🔔️ SMS to {number} failed. {e}");
                false
            },
        }
    }

    /// Tells the wholesaler about the new order, and every agent within reach of the pickup point that a job is
    /// available. Returns the ids of the agents that were told.
    pub async fn on_order_created(&self, event: OrderCreatedEvent) -> Vec<String> {
        let order = &event.order;
        let wholesaler = Recipient::new(PartyRole::Wholesaler, order.wholesaler.id.clone());
        self.notify(&wholesaler, &order_created_notification(order)).await;
        let Some(origin) = order.origin().filter(|c| c.is_valid()) else {
            debug!("🔔️ Order {} has no valid pickup location. No agents notified.", order.order_id);
            return vec![];
        };
        let pool = match self.db.fetch_located_agents().await {
            Ok(pool) => pool,
            Err(e) => {
                error!("🔔️ Could not load agent locations for order {}. {e}", order.order_id);
                return vec![];
            },
        };
        let nearby = match self.matcher.eligible_agents(origin, &pool, self.matcher.radius_km()).await {
            Ok(nearby) => nearby,
            Err(e) => {
                warn!("🔔️ Could not match agents for order {}. {e}", order.order_id);
                return vec![];
            },
        };
        let mut notified = Vec::with_capacity(nearby.len());
        for agent in nearby {
            let recipient = Recipient::new(PartyRole::DeliveryAgent, agent.agent_id.clone());
            let message = order_available_notification(order, agent.distance_km);
            if self.notify(&recipient, &message).await == NotifyOutcome::Sent {
                notified.push(agent.agent_id);
            }
        }
        info!("🔔️ {} nearby agent(s) notified about order {}", notified.len(), order.order_id);
        notified
    }

    /// Sends the delivery code to the retailer by SMS.
    pub async fn on_delivery_code_issued(&self, event: DeliveryCodeIssuedEvent) -> bool {
        let text = code_issued_sms(&event);
        let sent = self.send_sms(&event.order.retailer.mobile, &text).await;
        if sent {
            info!("🔔️ Delivery code for order {} sent to the retailer", event.order.order_id);
        }
        sent
    }

    pub async fn on_status_changed(&self, event: OrderStatusChangedEvent) {
        for (recipient, message) in status_notifications(&event) {
            self.notify(&recipient, &message).await;
        }
    }
}

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[cfg(feature = "sqlite")]
impl NotificationDispatch<SqliteDatabase> {
    /// Wires the dispatcher into the event hooks. Each hook call runs on its own task.
    pub fn into_hooks(self) -> EventHooks {
        let dispatch = Arc::new(self);
        let mut hooks = EventHooks::default();
        let d = Arc::clone(&dispatch);
        hooks.on_order_created(move |ev| {
            let d = Arc::clone(&d);
            Box::pin(async move {
                d.on_order_created(ev).await;
            }) as HookFuture
        });
        let d = Arc::clone(&dispatch);
        hooks.on_code_issued(move |ev| {
            let d = Arc::clone(&d);
            Box::pin(async move {
                d.on_delivery_code_issued(ev).await;
            }) as HookFuture
        });
        let d = dispatch;
        hooks.on_status_changed(move |ev| {
            let d = Arc::clone(&d);
            Box::pin(async move {
                d.on_status_changed(ev).await;
            }) as HookFuture
        });
        hooks
    }
}
