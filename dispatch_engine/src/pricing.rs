//! # PricingEngine
//!
//! Turns an order amount, vehicle tier and route estimate into a delivery charge and splits that charge between the
//! retailer and the wholesaler.
//!
//! ```text
//! base = 2 × km × per_km + 2 × minutes × per_minute + fixed_surcharge     (rounded up to whole rupees)
//! retailer_pays = ceil(base × retailer_percent / 100)
//! wholesaler_pays = base - retailer_pays
//! ```
//!
//! The retailer percent comes from the cost-share bands: the first band whose `up_to` is at least the order amount
//! wins. Amounts above the last band pay `high_value_retailer_percent` (0% by default, i.e. the wholesaler pays).
use log::*;
use mdg_common::Rupees;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{DeliveryCharges, VehicleTier};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("Invalid order amount. {0}")]
    InvalidAmount(String),
    #[error("Invalid vehicle tier. {0}")]
    InvalidVehicleTier(String),
    #[error("Invalid route metrics. {0}")]
    InvalidRouteMetrics(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierRate {
    pub per_km: f64,
    pub per_minute: f64,
}

impl TierRate {
    pub const fn new(per_km: f64, per_minute: f64) -> Self {
        Self { per_km, per_minute }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostShareBand {
    /// Inclusive upper bound of the order amount for this band.
    pub up_to: Rupees,
    pub retailer_percent: u8,
}

impl CostShareBand {
    pub fn new(up_to: i64, retailer_percent: u8) -> Self {
        Self { up_to: Rupees::from(up_to), retailer_percent }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    pub two_wheeler: TierRate,
    pub three_wheeler: TierRate,
    pub four_wheeler: TierRate,
    pub fixed_surcharge: f64,
    pub min_order_amount: Rupees,
    /// Sorted by `up_to`.
    pub bands: Vec<CostShareBand>,
    pub high_value_retailer_percent: u8,
}

pub const DEFAULT_TWO_WHEELER_RATE: TierRate = TierRate::new(5.0, 1.0);
pub const DEFAULT_THREE_WHEELER_RATE: TierRate = TierRate::new(8.0, 1.5);
pub const DEFAULT_FOUR_WHEELER_RATE: TierRate = TierRate::new(12.0, 2.0);
pub const DEFAULT_FIXED_SURCHARGE: f64 = 5.0;

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            two_wheeler: DEFAULT_TWO_WHEELER_RATE,
            three_wheeler: DEFAULT_THREE_WHEELER_RATE,
            four_wheeler: DEFAULT_FOUR_WHEELER_RATE,
            fixed_surcharge: DEFAULT_FIXED_SURCHARGE,
            min_order_amount: Rupees::from(1),
            bands: vec![CostShareBand::new(1000, 70), CostShareBand::new(2000, 50), CostShareBand::new(5000, 30)],
            high_value_retailer_percent: 0,
        }
    }
}

impl PricingConfig {
    pub fn rate_for(&self, tier: VehicleTier) -> TierRate {
        match tier {
            VehicleTier::TwoWheeler => self.two_wheeler,
            VehicleTier::ThreeWheeler => self.three_wheeler,
            VehicleTier::FourWheeler => self.four_wheeler,
        }
    }

    pub fn set_rate(&mut self, tier: VehicleTier, rate: TierRate) {
        match tier {
            VehicleTier::TwoWheeler => self.two_wheeler = rate,
            VehicleTier::ThreeWheeler => self.three_wheeler = rate,
            VehicleTier::FourWheeler => self.four_wheeler = rate,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(mut config: PricingConfig) -> Self {
        config.bands.sort_by_key(|b| b.up_to);
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Parses a vehicle tier name as supplied by callers.
    pub fn parse_tier(tier: &str) -> Result<VehicleTier, PricingError> {
        tier.parse::<VehicleTier>().map_err(|_| {
            PricingError::InvalidVehicleTier(format!(
                "'{tier}' is not one of {}",
                VehicleTier::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
            ))
        })
    }

    pub fn validate_amount(&self, order_amount: Rupees) -> Result<(), PricingError> {
        if !order_amount.is_positive() {
            return Err(PricingError::InvalidAmount(format!("The order amount must be positive, but was {order_amount}")));
        }
        if order_amount < self.config.min_order_amount {
            return Err(PricingError::InvalidAmount(format!(
                "The order amount {order_amount} is below the minimum of {}",
                self.config.min_order_amount
            )));
        }
        Ok(())
    }

    pub fn retailer_percent(&self, order_amount: Rupees) -> u8 {
        self.config
            .bands
            .iter()
            .find(|b| order_amount <= b.up_to)
            .map(|b| b.retailer_percent)
            .unwrap_or(self.config.high_value_retailer_percent)
            .min(100)
    }

    /// `quote`. Pure: the same inputs always give the same charges.
    pub fn quote(
        &self,
        order_amount: Rupees,
        tier: VehicleTier,
        distance_km: f64,
        duration_minutes: f64,
    ) -> Result<DeliveryCharges, PricingError> {
        self.validate_amount(order_amount)?;
        for (name, value) in [("distance", distance_km), ("duration", duration_minutes)] {
            if !value.is_finite() || value < 0.0 {
                return Err(PricingError::InvalidRouteMetrics(format!("The {name} must be a non-negative number")));
            }
        }
        let rate = self.config.rate_for(tier);
        let base = 2.0 * distance_km * rate.per_km + 2.0 * duration_minutes * rate.per_minute + self.config.fixed_surcharge;
        let total_delivery = Rupees::ceil(base).map_err(|e| PricingError::InvalidRouteMetrics(e.to_string()))?;
        let retailer_percent = self.retailer_percent(order_amount);
        let retailer_pays = total_delivery.percent_ceil(retailer_percent);
        let wholesaler_pays = total_delivery - retailer_pays;
        trace!(
            "🧮️ {tier} {distance_km:.2} km / {duration_minutes:.1} min for {order_amount}: delivery {total_delivery}, \
             retailer {retailer_percent}% = {retailer_pays}, wholesaler {wholesaler_pays}"
        );
        Ok(DeliveryCharges { total_delivery, retailer_pays, wholesaler_pays, retailer_percent })
    }
}
