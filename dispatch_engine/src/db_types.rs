use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use mdg_common::Rupees;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn random() -> Self {
        Self(format!("ord_{:016x}", rand::random::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      CartGroupId      ---------------------------------------------------------
/// Links the orders created from a single multi-item checkout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct CartGroupId(pub String);

impl CartGroupId {
    pub fn random() -> Self {
        Self(format!("cart_{:016x}", rand::random::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CartGroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// Payment has been confirmed. This is the initial state of every order.
    Paid,
    /// A delivery agent has accepted the order.
    DeliveryAccepted,
    /// The agent has collected the goods from the wholesaler.
    PickedUp,
    /// A one-time handoff code has been issued to the retailer.
    DeliveryCodeGenerated,
    /// The retailer's code was confirmed. Terminal.
    Delivered,
}

impl OrderStatusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::Paid => "paid",
            OrderStatusType::DeliveryAccepted => "delivery_accepted",
            OrderStatusType::PickedUp => "picked_up",
            OrderStatusType::DeliveryCodeGenerated => "delivery_code_generated",
            OrderStatusType::Delivered => "delivered",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(Self::Paid),
            "delivery_accepted" => Ok(Self::DeliveryAccepted),
            "picked_up" => Ok(Self::PickedUp),
            "delivery_code_generated" => Ok(Self::DeliveryCodeGenerated),
            "delivered" => Ok(Self::Delivered),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    LifecycleEvent     ---------------------------------------------------------
/// An entry type in an order's history. Every status is also an event; `CodeExpired` records the forced regression
/// from `delivery_code_generated` back to `picked_up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Paid,
    DeliveryAccepted,
    PickedUp,
    DeliveryCodeGenerated,
    Delivered,
    CodeExpired,
}

impl LifecycleEvent {
    /// The order status this event leaves the order in, if any.
    pub fn status(&self) -> Option<OrderStatusType> {
        match self {
            LifecycleEvent::Paid => Some(OrderStatusType::Paid),
            LifecycleEvent::DeliveryAccepted => Some(OrderStatusType::DeliveryAccepted),
            LifecycleEvent::PickedUp => Some(OrderStatusType::PickedUp),
            LifecycleEvent::DeliveryCodeGenerated => Some(OrderStatusType::DeliveryCodeGenerated),
            LifecycleEvent::Delivered => Some(OrderStatusType::Delivered),
            LifecycleEvent::CodeExpired => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::CodeExpired => "code_expired",
            LifecycleEvent::Paid => "paid",
            LifecycleEvent::DeliveryAccepted => "delivery_accepted",
            LifecycleEvent::PickedUp => "picked_up",
            LifecycleEvent::DeliveryCodeGenerated => "delivery_code_generated",
            LifecycleEvent::Delivered => "delivered",
        }
    }
}

impl From<OrderStatusType> for LifecycleEvent {
    fn from(status: OrderStatusType) -> Self {
        match status {
            OrderStatusType::Paid => Self::Paid,
            OrderStatusType::DeliveryAccepted => Self::DeliveryAccepted,
            OrderStatusType::PickedUp => Self::PickedUp,
            OrderStatusType::DeliveryCodeGenerated => Self::DeliveryCodeGenerated,
            OrderStatusType::Delivered => Self::Delivered,
        }
    }
}

impl Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleEvent {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code_expired" => Ok(Self::CodeExpired),
            s => s.parse::<OrderStatusType>().map(Self::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub event: LifecycleEvent,
    pub at: DateTime<Utc>,
}

//--------------------------------------      VehicleTier      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleTier {
    TwoWheeler,
    ThreeWheeler,
    FourWheeler,
}

impl VehicleTier {
    pub const ALL: [VehicleTier; 3] = [VehicleTier::TwoWheeler, VehicleTier::ThreeWheeler, VehicleTier::FourWheeler];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleTier::TwoWheeler => "two_wheeler",
            VehicleTier::ThreeWheeler => "three_wheeler",
            VehicleTier::FourWheeler => "four_wheeler",
        }
    }
}

impl Display for VehicleTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleTier {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "two_wheeler" => Ok(Self::TwoWheeler),
            "three_wheeler" => Ok(Self::ThreeWheeler),
            "four_wheeler" => Ok(Self::FourWheeler),
            _ => Err(ConversionError(format!("Unknown vehicle tier: {s}"))),
        }
    }
}

//--------------------------------------       PartyRole       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Wholesaler,
    Retailer,
    DeliveryAgent,
}

impl PartyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyRole::Wholesaler => "wholesaler",
            PartyRole::Retailer => "retailer",
            PartyRole::DeliveryAgent => "delivery_agent",
        }
    }
}

impl Display for PartyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartyRole {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wholesaler" => Ok(Self::Wholesaler),
            "retailer" => Ok(Self::Retailer),
            "delivery_agent" | "delivery_boy" => Ok(Self::DeliveryAgent),
            s => Err(ConversionError(format!("Invalid party role: {s}"))),
        }
    }
}

//--------------------------------------      Coordinate       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both components are finite and within the WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite() && self.lat.abs() <= 90.0 && self.lng.abs() <= 180.0
    }

    pub(crate) fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Some(Self { lat, lng }),
            _ => None,
        }
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}

//--------------------------------------      Snapshots        ---------------------------------------------------------
/// A copy of a wholesaler's or retailer's details, taken when the order is created. Later profile edits never touch
/// it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartySnapshot {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub location: Option<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: String,
    pub name: String,
    pub mobile: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: String,
    pub product_name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub quantity: i64,
}

//--------------------------------------    DeliveryCharges    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCharges {
    pub total_delivery: Rupees,
    pub retailer_pays: Rupees,
    pub wholesaler_pays: Rupees,
    pub retailer_percent: u8,
}

impl DeliveryCharges {
    /// The two shares are non-negative and add up to exactly the total.
    pub fn is_consistent(&self) -> bool {
        self.retailer_pays.value() >= 0
            && self.wholesaler_pays.value() >= 0
            && self.retailer_pays + self.wholesaler_pays == self.total_delivery
            && self.retailer_percent <= 100
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub payment_id: String,
    /// Position of this order within its checkout. Always zero for single-item purchases.
    pub line_no: i64,
    pub cart_group: Option<CartGroupId>,
    pub product: ProductSnapshot,
    pub wholesaler: PartySnapshot,
    pub retailer: PartySnapshot,
    pub delivery_agent: Option<AgentSnapshot>,
    pub vehicle_tier: VehicleTier,
    pub price: Rupees,
    pub charges: DeliveryCharges,
    pub total_amount: Rupees,
    pub status: OrderStatusType,
    pub history: Vec<HistoryEntry>,
    /// Only ever handed to the retailer, so it is never serialized.
    #[serde(skip_serializing, default)]
    pub delivery_code: Option<String>,
    pub delivery_code_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The pickup point, i.e. the wholesaler's location at checkout time.
    pub fn origin(&self) -> Option<&Coordinate> {
        self.wholesaler.location.as_ref()
    }

    /// When the order entered the `delivered` state, if it has.
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.history.iter().rev().find(|h| h.event == LifecycleEvent::Delivered).map(|h| h.at)
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.delivery_agent.as_ref().map(|a| a.id.as_str())
    }

    /// Checks the structural invariants that hold after every committed transition.
    pub fn check_invariants(&self) -> Result<(), String> {
        let last = self.history.last().ok_or_else(|| format!("Order {} has no history", self.order_id))?;
        if last.event.status() != Some(self.status) {
            return Err(format!("Order {} history ends in {} but status is {}", self.order_id, last.event, self.status));
        }
        if self.history.windows(2).any(|w| w[0].at > w[1].at) {
            return Err(format!("Order {} history is not in time order", self.order_id));
        }
        let has_code = self.delivery_code.is_some();
        if has_code != (self.status == OrderStatusType::DeliveryCodeGenerated) {
            return Err(format!("Order {} is {} but has_code = {has_code}", self.order_id, self.status));
        }
        if self.total_amount != self.price + self.charges.retailer_pays {
            return Err(format!("Order {} total amount does not match price + retailer share", self.order_id));
        }
        Ok(())
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub order_id: OrderId,
    /// The external payment id. Together with `line_no` it identifies the order for idempotent inserts.
    pub payment_id: String,
    pub line_no: i64,
    pub cart_group: Option<CartGroupId>,
    pub product: ProductSnapshot,
    pub wholesaler: PartySnapshot,
    pub retailer: PartySnapshot,
    pub vehicle_tier: VehicleTier,
    pub price: Rupees,
    pub charges: DeliveryCharges,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn total_amount(&self) -> Rupees {
        self.price + self.charges.retailer_pays
    }
}

//-------------------------------------- DeliveryAgentProfile  ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAgentProfile {
    pub agent_id: String,
    pub name: String,
    pub mobile: String,
    pub alternate_mobile: Option<String>,
    pub vehicle_tier: VehicleTier,
    pub vehicle_model: Option<String>,
    pub vehicle_number: Option<String>,
    /// Live location. `None` until the agent's first report.
    pub location: Option<Coordinate>,
    pub location_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryAgentProfile {
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot { id: self.agent_id.clone(), name: self.name.clone(), mobile: self.mobile.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAgentProfile {
    pub agent_id: String,
    pub name: String,
    pub mobile: String,
    #[serde(default)]
    pub alternate_mobile: Option<String>,
    pub vehicle_tier: VehicleTier,
    #[serde(default)]
    pub vehicle_model: Option<String>,
    #[serde(default)]
    pub vehicle_number: Option<String>,
}

//--------------------------------------     PartyProfile      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyProfile {
    pub role: PartyRole,
    pub party_id: String,
    pub name: String,
    pub mobile: String,
    pub location: Option<Coordinate>,
    pub updated_at: DateTime<Utc>,
}

impl PartyProfile {
    pub fn snapshot(&self) -> PartySnapshot {
        PartySnapshot {
            id: self.party_id.clone(),
            name: self.name.clone(),
            mobile: self.mobile.clone(),
            location: self.location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPartyProfile {
    pub role: PartyRole,
    pub party_id: String,
    pub name: String,
    pub mobile: String,
    #[serde(default)]
    pub location: Option<Coordinate>,
}

//--------------------------------------       PushToken       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushToken {
    pub role: PartyRole,
    pub party_id: String,
    pub token: String,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn parse_or_log<T: FromStr<Err = ConversionError>>(value: &str) -> Result<T, ConversionError> {
    value.parse::<T>().map_err(|e| {
        error!("🗃️ Stored value could not be parsed. {e}");
        e
    })
}
