//! # GeoDistance
//!
//! Distance and travel time between two coordinates. Pricing and agent matching both go through a single
//! [`RouteProvider`] configured for the deployment, so every order is priced and matched with the same metric.
//!
//! Two providers exist:
//! * [`HaversineRouter`] computes the great-circle distance and derives a duration from an average speed.
//! * A road-network router (see the `courier_tools` crate) queries an OSRM-compatible service.
mod haversine;

use async_trait::async_trait;
pub use haversine::{haversine_km, HaversineRouter, DEFAULT_AVERAGE_SPEED_KMH, EARTH_RADIUS_KM};
use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeoError {
    #[error("Invalid location. {0}")]
    InvalidLocation(String),
    #[error("Could not calculate delivery route. {0}")]
    RouteUnavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub duration_minutes: f64,
}

#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// A short label used in logs.
    fn name(&self) -> &str;

    /// Distance and travel time from `from` to `to`. Implementations may assume both coordinates are valid.
    async fn route(&self, from: &Coordinate, to: &Coordinate) -> Result<RouteEstimate, GeoError>;
}

pub fn validate_coordinate(coord: Option<&Coordinate>, label: &str) -> Result<Coordinate, GeoError> {
    match coord {
        None => Err(GeoError::InvalidLocation(format!("The {label} location is missing."))),
        Some(c) if !c.is_valid() => Err(GeoError::InvalidLocation(format!("The {label} location {c} is not valid."))),
        Some(c) => Ok(*c),
    }
}

/// `distanceAndTime`. Checks both coordinates and then asks the provider for a route.
pub async fn distance_and_time(
    provider: &dyn RouteProvider,
    from: Option<&Coordinate>,
    to: Option<&Coordinate>,
) -> Result<RouteEstimate, GeoError> {
    let from = validate_coordinate(from, "origin")?;
    let to = validate_coordinate(to, "destination")?;
    let estimate = provider.route(&from, &to).await?;
    if !estimate.distance_km.is_finite() || !estimate.duration_minutes.is_finite() {
        warn!("🗺️ {} returned a non-finite route estimate for {from} -> {to}", provider.name());
        return Err(GeoError::RouteUnavailable("The routing service returned an unusable route.".into()));
    }
    trace!(
        "🗺️ [{}] {from} -> {to}: {:.2} km, {:.1} min",
        provider.name(),
        estimate.distance_km,
        estimate.duration_minutes
    );
    Ok(estimate)
}
