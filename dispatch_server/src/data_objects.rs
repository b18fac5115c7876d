use std::fmt::Display;

use dispatch_engine::db_types::{Coordinate, PartyRole};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Every successful response carries `success: true` next to its payload, so clients can branch on `success` for
/// both outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

/// Body of the accept and pickup requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub agent_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyCodeRequest {
    pub code: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationReport {
    pub lat: f64,
    pub lng: f64,
}

impl From<LocationReport> for Coordinate {
    fn from(report: LocationReport) -> Self {
        Coordinate::new(report.lat, report.lng)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushTokenRequest {
    pub role: PartyRole,
    pub party_id: String,
    pub token: String,
}
