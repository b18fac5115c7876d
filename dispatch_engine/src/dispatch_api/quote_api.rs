use std::{fmt::Debug, sync::Arc};

use log::*;
use mdg_common::Rupees;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::Coordinate,
    dispatch_api::errors::DispatchError,
    geo::{distance_and_time, RouteProvider},
    pricing::PricingEngine,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub order_amount: Rupees,
    pub vehicle_tier: String,
    /// The wholesaler's location.
    #[serde(default)]
    pub origin: Option<Coordinate>,
    /// The retailer's location.
    #[serde(default)]
    pub destination: Option<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryQuote {
    pub total_delivery: Rupees,
    pub retailer_pays: Rupees,
    pub wholesaler_pays: Rupees,
    pub retailer_percent: u8,
    pub distance_km: f64,
    pub time_minutes: f64,
    /// What the retailer is charged at checkout: the order amount plus the retailer's delivery share.
    pub total_amount: Rupees,
}

/// `quoteDelivery`: GeoDistance followed by PricingEngine.
#[derive(Clone)]
pub struct DeliveryQuoter {
    router: Arc<dyn RouteProvider>,
    pricing: PricingEngine,
}

impl Debug for DeliveryQuoter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeliveryQuoter({})", self.router.name())
    }
}

impl DeliveryQuoter {
    pub fn new(router: Arc<dyn RouteProvider>, pricing: PricingEngine) -> Self {
        Self { router, pricing }
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    /// Inputs are validated before the route lookup, so a bad amount or tier never costs a routing request.
    pub async fn quote_delivery(&self, request: QuoteRequest) -> Result<DeliveryQuote, DispatchError> {
        let tier = PricingEngine::parse_tier(&request.vehicle_tier)?;
        self.pricing.validate_amount(request.order_amount)?;
        let route =
            distance_and_time(self.router.as_ref(), request.origin.as_ref(), request.destination.as_ref()).await?;
        let charges = self.pricing.quote(request.order_amount, tier, route.distance_km, route.duration_minutes)?;
        debug!(
            "🧮️ Quote for {} by {tier}: {:.2} km, {:.1} min, delivery {}",
            request.order_amount, route.distance_km, route.duration_minutes, charges.total_delivery
        );
        Ok(DeliveryQuote {
            total_delivery: charges.total_delivery,
            retailer_pays: charges.retailer_pays,
            wholesaler_pays: charges.wholesaler_pays,
            retailer_percent: charges.retailer_percent,
            distance_km: route.distance_km,
            time_minutes: route.duration_minutes,
            total_amount: request.order_amount + charges.retailer_pays,
        })
    }
}
