use std::time::Duration;

use async_trait::async_trait;
use dispatch_engine::notifications::{Notification, PushSender, SendError};
use log::*;
use reqwest::Method;
use serde_json::Value;

use crate::{
    api::CourierClient,
    config::FcmConfig,
    data_objects::{FcmMessage, FcmNotification, FcmRequest},
    helpers::is_invalid_token_error,
    CourierApiError,
};

/// Push notifications through the FCM HTTP v1 `messages:send` endpoint.
#[derive(Clone)]
pub struct FcmPushSender {
    url: String,
    client: CourierClient,
}

impl std::fmt::Debug for FcmPushSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FcmPushSender({})", self.url)
    }
}

impl FcmPushSender {
    pub fn new(config: &FcmConfig, timeout: Duration) -> Result<Self, CourierApiError> {
        let client = CourierClient::with_bearer_token(timeout, config.access_token.reveal())?;
        let url = format!("{}/v1/projects/{}/messages:send", config.endpoint, config.project_id);
        Ok(Self { url, client })
    }

    pub fn request_body<'a>(token: &'a str, message: &'a Notification) -> FcmRequest<'a> {
        FcmRequest {
            message: FcmMessage {
                token,
                notification: FcmNotification { title: &message.title, body: &message.body },
                data: &message.data,
            },
        }
    }
}

#[async_trait]
impl PushSender for FcmPushSender {
    async fn send_push(&self, token: &str, message: &Notification) -> Result<(), SendError> {
        let body = Self::request_body(token, message);
        match self.client.rest_query::<Value, _>(Method::POST, &self.url, &[], Some(body)).await {
            Ok(result) => {
                debug!("🔔️ FCM accepted '{}'. {}", message.title, result["name"]);
                Ok(())
            },
            Err(CourierApiError::QueryError { status, message }) if is_invalid_token_error(status, &message) => {
                debug!("🔔️ FCM rejected the registration token. {status}: {message}");
                Err(SendError::InvalidToken)
            },
            Err(e) => Err(SendError::Transport(e.to_string())),
        }
    }
}
