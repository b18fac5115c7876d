//! # DeliveryMatcher
//!
//! Radius matching between an order's pickup point and the live locations of delivery agents. The matcher uses the
//! same [`RouteProvider`] as pricing, so an agent "within 20 km" means 20 km by the same metric that the order was
//! charged on.
use std::sync::Arc;

use futures_util::future::join_all;
use log::*;
use serde::Serialize;
use thiserror::Error;

use crate::{
    db_types::{Coordinate, DeliveryAgentProfile},
    geo::{distance_and_time, GeoError, RouteProvider},
};

pub const DEFAULT_MATCH_RADIUS_KM: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("Agent {0} has not reported a live location.")]
    NoLiveLocation(String),
    #[error("The pickup point is {distance_km:.1} km away, outside the {radius_km:.1} km radius.")]
    OutOfRange { distance_km: f64, radius_km: f64 },
    #[error("{0}")]
    Geo(#[from] GeoError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibleAgent {
    pub agent_id: String,
    pub distance_km: f64,
}

#[derive(Clone)]
pub struct DeliveryMatcher {
    router: Arc<dyn RouteProvider>,
    radius_km: f64,
}

impl std::fmt::Debug for DeliveryMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeliveryMatcher({}, {} km)", self.router.name(), self.radius_km)
    }
}

impl DeliveryMatcher {
    pub fn new(router: Arc<dyn RouteProvider>, radius_km: f64) -> Self {
        Self { router, radius_km }
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    pub fn router(&self) -> &Arc<dyn RouteProvider> {
        &self.router
    }

    /// Gates the accept and pickup transitions. Returns the agent's distance from the pickup point.
    pub async fn check_in_range(
        &self,
        origin: Option<&Coordinate>,
        agent: &DeliveryAgentProfile,
    ) -> Result<f64, MatchError> {
        let location = agent.location.as_ref().ok_or_else(|| MatchError::NoLiveLocation(agent.agent_id.clone()))?;
        let route = distance_and_time(self.router.as_ref(), origin, Some(location)).await?;
        if route.distance_km > self.radius_km {
            debug!(
                "🗺️ Agent {} is {:.2} km from the pickup point. Radius is {} km",
                agent.agent_id, route.distance_km, self.radius_km
            );
            return Err(MatchError::OutOfRange { distance_km: route.distance_km, radius_km: self.radius_km });
        }
        Ok(route.distance_km)
    }

    /// `eligibleAgents`. Agents without a live location are skipped, as are agents whose route lookup fails. The
    /// result is sorted nearest first.
    pub async fn eligible_agents(
        &self,
        origin: &Coordinate,
        pool: &[DeliveryAgentProfile],
        radius_km: f64,
    ) -> Result<Vec<EligibleAgent>, GeoError> {
        if !origin.is_valid() {
            return Err(GeoError::InvalidLocation(format!("The pickup location {origin} is not valid.")));
        }
        let lookups = pool.iter().filter_map(|agent| {
            agent.location.as_ref().map(|loc| async move {
                let result = distance_and_time(self.router.as_ref(), Some(origin), Some(loc)).await;
                (agent.agent_id.as_str(), result)
            })
        });
        let mut eligible = join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(agent_id, result)| match result {
                Ok(route) if route.distance_km <= radius_km => {
                    Some(EligibleAgent { agent_id: agent_id.to_string(), distance_km: route.distance_km })
                },
                Ok(_) => None,
                Err(e) => {
                    warn!("🗺️ Skipping agent {agent_id} for matching. {e}");
                    None
                },
            })
            .collect::<Vec<_>>();
        eligible.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        trace!("🗺️ {} of {} agents are within {radius_km} km of {origin}", eligible.len(), pool.len());
        Ok(eligible)
    }
}
