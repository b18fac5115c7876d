use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

//--------------------------------------   OSRM   ---------------------------------------------------------

/// The subset of an OSRM `/route` response that the router reads.
#[derive(Debug, Clone, Deserialize)]
pub struct OsrmResponse {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub routes: Vec<OsrmRoute>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OsrmRoute {
    /// Metres
    pub distance: f64,
    /// Seconds
    pub duration: f64,
}

//--------------------------------------   FCM    ---------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct FcmRequest<'a> {
    pub message: FcmMessage<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FcmMessage<'a> {
    pub token: &'a str,
    pub notification: FcmNotification<'a>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: &'a BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FcmNotification<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FcmErrorResponse {
    pub error: FcmErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FcmErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub details: Vec<Value>,
}

impl FcmErrorBody {
    /// The `errorCode` values carried in the `FcmError` detail entries.
    pub fn error_codes(&self) -> Vec<&str> {
        self.details.iter().filter_map(|d| d.get("errorCode").and_then(Value::as_str)).collect()
    }
}

//--------------------------------------   SMS    ---------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SmsRequest<'a> {
    pub sender: &'a str,
    pub to: &'a str,
    pub message: &'a str,
}
