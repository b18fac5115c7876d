use async_trait::async_trait;

use super::{GeoError, RouteEstimate, RouteProvider};
use crate::db_types::Coordinate;

/// Mean earth radius (IUGG), in km.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;
pub const DEFAULT_AVERAGE_SPEED_KMH: f64 = 20.0;

/// Great-circle distance between two coordinates, in km.
pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Straight-line routing. Travel time assumes a constant average speed.
#[derive(Debug, Clone, Copy)]
pub struct HaversineRouter {
    average_speed_kmh: f64,
}

impl Default for HaversineRouter {
    fn default() -> Self {
        Self { average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH }
    }
}

impl HaversineRouter {
    /// Non-positive or non-finite speeds fall back to the default.
    pub fn new(average_speed_kmh: f64) -> Self {
        if average_speed_kmh.is_finite() && average_speed_kmh > 0.0 {
            Self { average_speed_kmh }
        } else {
            Self::default()
        }
    }

    pub fn average_speed_kmh(&self) -> f64 {
        self.average_speed_kmh
    }
}

#[async_trait]
impl RouteProvider for HaversineRouter {
    fn name(&self) -> &str {
        "haversine"
    }

    async fn route(&self, from: &Coordinate, to: &Coordinate) -> Result<RouteEstimate, GeoError> {
        let distance_km = haversine_km(from, to);
        let duration_minutes = distance_km / self.average_speed_kmh * 60.0;
        Ok(RouteEstimate { distance_km, duration_minutes })
    }
}
