use dispatch_engine::geo::{GeoError, RouteEstimate};

use crate::data_objects::{FcmErrorResponse, OsrmResponse};

/// Converts an OSRM response into a route estimate. Only the first (best) route is used.
pub fn route_estimate_from_osrm(response: OsrmResponse) -> Result<RouteEstimate, GeoError> {
    if response.code != "Ok" {
        let reason = response.message.unwrap_or_default();
        return Err(GeoError::RouteUnavailable(format!("Routing service replied {}. {reason}", response.code)));
    }
    let route = response
        .routes
        .first()
        .ok_or_else(|| GeoError::RouteUnavailable("Routing service returned no routes".to_string()))?;
    if !route.distance.is_finite() || !route.duration.is_finite() || route.distance < 0.0 || route.duration < 0.0 {
        return Err(GeoError::RouteUnavailable(format!(
            "Routing service returned an unusable route: {}m, {}s",
            route.distance, route.duration
        )));
    }
    Ok(RouteEstimate { distance_km: route.distance / 1000.0, duration_minutes: route.duration / 60.0 })
}

/// True if an FCM error response means the registration token will never work again, so it should be dropped.
pub fn is_invalid_token_error(status: u16, body: &str) -> bool {
    if status == 404 {
        return true;
    }
    let Ok(response) = serde_json::from_str::<FcmErrorResponse>(body) else {
        return false;
    };
    let err = response.error;
    let codes = err.error_codes();
    if codes.iter().any(|c| *c == "UNREGISTERED") {
        return true;
    }
    // INVALID_ARGUMENT is also returned for malformed payloads, so only trust it when it is about the token
    (err.status == "INVALID_ARGUMENT" || codes.iter().any(|c| *c == "INVALID_ARGUMENT"))
        && err.message.to_lowercase().contains("registration token")
}
