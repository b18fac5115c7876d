use std::time::Duration;

use async_trait::async_trait;
use dispatch_engine::notifications::{SendError, SmsSender};
use log::*;
use reqwest::Method;
use serde_json::Value;

use crate::{api::CourierClient, config::SmsConfig, data_objects::SmsRequest, CourierApiError};

/// Sends text messages through a JSON SMS gateway: `POST {url}` with `{sender, to, message}`.
#[derive(Clone)]
pub struct SmsGateway {
    url: String,
    sender_id: String,
    client: CourierClient,
}

impl std::fmt::Debug for SmsGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SmsGateway({}, sender: {})", self.url, self.sender_id)
    }
}

impl SmsGateway {
    pub fn new(config: &SmsConfig, timeout: Duration) -> Result<Self, CourierApiError> {
        let client = if config.api_key.is_empty() {
            CourierClient::new(timeout)?
        } else {
            CourierClient::with_bearer_token(timeout, config.api_key.reveal())?
        };
        Ok(Self { url: config.url.clone(), sender_id: config.sender_id.clone(), client })
    }
}

#[async_trait]
impl SmsSender for SmsGateway {
    async fn send_sms(&self, number: &str, text: &str) -> Result<(), SendError> {
        let body = SmsRequest { sender: &self.sender_id, to: number, message: text };
        self.client
            .rest_query::<Value, _>(Method::POST, &self.url, &[], Some(body))
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;
        debug!("🔔️ SMS accepted by the gateway");
        Ok(())
    }
}
