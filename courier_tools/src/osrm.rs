use std::time::Duration;

use async_trait::async_trait;
use dispatch_engine::{
    db_types::Coordinate,
    geo::{GeoError, RouteEstimate, RouteProvider},
};
use log::*;
use reqwest::Method;

use crate::{
    api::CourierClient,
    config::RoutingConfig,
    data_objects::OsrmResponse,
    helpers::route_estimate_from_osrm,
    CourierApiError,
};

/// Pause before the single retry of a failed lookup.
pub const RETRY_DELAY: Duration = Duration::from_millis(250);

/// Road distance and drive time from an OSRM-compatible routing service.
///
/// Each lookup is bounded by the configured timeout and is retried once, after [`RETRY_DELAY`], on transport or server
/// errors. Anything else
/// is reported as [`GeoError::RouteUnavailable`]; there is no fallback to straight-line distances.
#[derive(Clone)]
pub struct OsrmRouter {
    config: RoutingConfig,
    client: CourierClient,
}

impl std::fmt::Debug for OsrmRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OsrmRouter({})", self.config.osrm_url)
    }
}

impl OsrmRouter {
    pub fn new(config: RoutingConfig) -> Result<Self, CourierApiError> {
        let client = CourierClient::new(config.timeout)?;
        Ok(Self { config, client })
    }

    /// OSRM takes coordinates as `lng,lat` pairs.
    pub fn route_url(&self, from: &Coordinate, to: &Coordinate) -> String {
        format!("{}/route/v1/driving/{},{};{},{}", self.config.osrm_url, from.lng, from.lat, to.lng, to.lat)
    }

    async fn fetch(&self, url: &str) -> Result<RouteEstimate, CourierApiError> {
        let response =
            self.client.rest_query::<OsrmResponse, ()>(Method::GET, url, &[("overview", "false")], None).await?;
        route_estimate_from_osrm(response).map_err(|e| CourierApiError::ResponseError(e.to_string()))
    }
}

#[async_trait]
impl RouteProvider for OsrmRouter {
    fn name(&self) -> &str {
        "osrm"
    }

    async fn route(&self, from: &Coordinate, to: &Coordinate) -> Result<RouteEstimate, GeoError> {
        let url = self.route_url(from, to);
        let mut retried = false;
        loop {
            match self.fetch(&url).await {
                Ok(estimate) => {
                    trace!("🗺️ OSRM route {from} -> {to}: {estimate:?}");
                    return Ok(estimate);
                },
                Err(CourierApiError::QueryError { status, message }) if status < 500 && status != 429 => {
                    // OSRM reports unroutable queries with a 400 and a JSON body
                    let reason = serde_json::from_str::<OsrmResponse>(&message)
                        .map(|r| format!("{}. {}", r.code, r.message.unwrap_or_default()))
                        .unwrap_or(message);
                    warn!("🗺️ OSRM could not route {from} -> {to}. {reason}");
                    return Err(GeoError::RouteUnavailable(reason));
                },
                Err(e) if e.is_retryable() && !retried => {
                    warn!("🗺️ OSRM lookup {from} -> {to} failed, retrying once. {e}");
                    retried = true;
                    tokio::time::sleep(RETRY_DELAY).await;
                },
                Err(e) => {
                    warn!("🗺️ OSRM lookup {from} -> {to} failed. {e}");
                    return Err(GeoError::RouteUnavailable(e.to_string()));
                },
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Instant;

    use super::*;

    fn router(url: &str) -> OsrmRouter {
        let config = RoutingConfig { osrm_url: url.to_string(), timeout: Duration::from_millis(500) };
        OsrmRouter::new(config).unwrap()
    }

    #[test]
    fn urls_use_lng_lat_order() {
        let router = router("http://osrm.local:5000");
        let from = Coordinate::new(18.9477, 72.8343);
        let to = Coordinate::new(19.076, 72.8777);
        assert_eq!(
            router.route_url(&from, &to),
            "http://osrm.local:5000/route/v1/driving/72.8343,18.9477;72.8777,19.076"
        );
    }

    #[tokio::test]
    async fn unreachable_service_is_route_unavailable() {
        let router = router("http://127.0.0.1:9");
        let from = Coordinate::new(18.9477, 72.8343);
        let to = Coordinate::new(19.076, 72.8777);
        let started = Instant::now();
        let err = router.route(&from, &to).await.unwrap_err();
        assert!(matches!(err, GeoError::RouteUnavailable(_)), "{err}");
        // A connection refusal is retryable, so the lookup waited once before giving up
        assert!(started.elapsed() >= RETRY_DELAY, "{:?}", started.elapsed());
    }
}
