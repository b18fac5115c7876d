use std::time::Duration;

use log::*;
use mdg_common::{helpers::env_or_default, Secret};

pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";
pub const DEFAULT_ROUTE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";

#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub osrm_url: String,
    pub timeout: Duration,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self { osrm_url: DEFAULT_OSRM_URL.to_string(), timeout: Duration::from_millis(DEFAULT_ROUTE_TIMEOUT_MS) }
    }
}

impl RoutingConfig {
    pub fn new_from_env_or_default() -> Self {
        let osrm_url = std::env::var("MDG_OSRM_URL").unwrap_or_else(|_| {
            info!("🪛️ MDG_OSRM_URL not set, using the public demo server at {DEFAULT_OSRM_URL}");
            DEFAULT_OSRM_URL.to_string()
        });
        let timeout_ms = env_or_default("MDG_ROUTE_TIMEOUT_MS", DEFAULT_ROUTE_TIMEOUT_MS);
        Self { osrm_url: osrm_url.trim_end_matches('/').to_string(), timeout: Duration::from_millis(timeout_ms) }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FcmConfig {
    pub project_id: String,
    /// An OAuth2 bearer token for the FCM HTTP v1 API.
    pub access_token: Secret<String>,
    pub endpoint: String,
}

impl FcmConfig {
    pub fn new_from_env_or_default() -> Self {
        let project_id = std::env::var("MDG_FCM_PROJECT_ID").unwrap_or_else(|_| {
            warn!("🪛️ MDG_FCM_PROJECT_ID not set. Push notifications will only be logged.");
            String::default()
        });
        let access_token = Secret::new(std::env::var("MDG_FCM_ACCESS_TOKEN").unwrap_or_default());
        let endpoint = std::env::var("MDG_FCM_ENDPOINT").unwrap_or_else(|_| DEFAULT_FCM_ENDPOINT.to_string());
        Self { project_id, access_token, endpoint: endpoint.trim_end_matches('/').to_string() }
    }

    pub fn is_configured(&self) -> bool {
        !self.project_id.is_empty() && !self.access_token.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SmsConfig {
    pub url: String,
    pub api_key: Secret<String>,
    pub sender_id: String,
}

impl SmsConfig {
    pub fn new_from_env_or_default() -> Self {
        let url = std::env::var("MDG_SMS_URL").unwrap_or_else(|_| {
            warn!("🪛️ MDG_SMS_URL not set. SMS messages will only be logged.");
            String::default()
        });
        let api_key = Secret::new(std::env::var("MDG_SMS_API_KEY").unwrap_or_default());
        let sender_id = std::env::var("MDG_SMS_SENDER_ID").unwrap_or_else(|_| "MANDI".to_string());
        Self { url, api_key, sender_id }
    }

    pub fn is_configured(&self) -> bool {
        !self.url.is_empty()
    }
}
