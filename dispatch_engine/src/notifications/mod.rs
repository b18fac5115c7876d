//! # NotificationDispatch
//!
//! Push and SMS messages that accompany lifecycle events. Delivery is fire-and-forget: the dispatcher runs from event
//! hooks, so a failed or slow send never blocks or rolls back the transition that caused it. When the push provider
//! reports a token as invalid, the token is removed from the registry.
mod dispatch;
mod messages;

use std::{collections::BTreeMap, fmt::Display};

use async_trait::async_trait;
pub use dispatch::{NotificationDispatch, NotifyOutcome};
pub use messages::{code_issued_sms, order_available_notification, order_created_notification, status_notifications};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::PartyRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Opaque key-value payload for the client app. Push providers only accept string values.
    pub data: BTreeMap<String, String>,
}

impl Notification {
    pub fn new<T: Into<String>, B: Into<String>>(title: T, body: B) -> Self {
        Self { title: title.into(), body: body.into(), data: BTreeMap::new() }
    }

    pub fn with_data<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient {
    pub role: PartyRole,
    pub id: String,
}

impl Recipient {
    pub fn new<S: Into<String>>(role: PartyRole, id: S) -> Self {
        Self { role, id: id.into() }
    }
}

impl Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.role, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("The recipient token is invalid or has expired")]
    InvalidToken,
    #[error("Could not deliver the message. {0}")]
    Transport(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send_push(&self, token: &str, message: &Notification) -> Result<(), SendError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, number: &str, text: &str) -> Result<(), SendError>;
}

/// A sender that only logs. Used when no push or SMS provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlySender;

#[async_trait]
impl PushSender for LogOnlySender {
    async fn send_push(&self, _token: &str, message: &Notification) -> Result<(), SendError> {
        log::info!("🔔️ [push] {}: {}", message.title, message.body);
        Ok(())
    }
}

#[async_trait]
impl SmsSender for LogOnlySender {
    async fn send_sms(&self, number: &str, _text: &str) -> Result<(), SendError> {
        log::info!("🔔️ [sms to {number}] message suppressed, no SMS gateway configured");
        Ok(())
    }
}
