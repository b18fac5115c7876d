use mdg_common::Rupees;
use serde::{Deserialize, Serialize};

use crate::db_types::{DeliveryCharges, Order, PartySnapshot};

/// A payment the gateway has confirmed. `payment_id` is opaque and doubles as the idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub payment_id: String,
    #[serde(default)]
    pub metadata: PaymentMetadata,
}

/// Everything captured at checkout. All fields are optional on the wire so that missing data is reported as
/// incomplete order data rather than as a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentMetadata {
    #[serde(default)]
    pub purchase: Option<Purchase>,
    #[serde(default)]
    pub retailer: Option<PartySnapshot>,
    /// The default wholesaler for every line item.
    #[serde(default)]
    pub wholesaler: Option<PartySnapshot>,
    #[serde(default)]
    pub vehicle_tier: Option<String>,
    /// The charges quoted at checkout. Cart orders all carry the same breakdown, since one trip serves the cart.
    #[serde(default)]
    pub charges: Option<DeliveryCharges>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Purchase {
    Single { item: LineItem },
    Cart { items: Vec<LineItem> },
}

impl Purchase {
    pub fn items(&self) -> &[LineItem] {
        match self {
            Purchase::Single { item } => std::slice::from_ref(item),
            Purchase::Cart { items } => items,
        }
    }

    pub fn items_mut(&mut self) -> &mut [LineItem] {
        match self {
            Purchase::Single { item } => std::slice::from_mut(item),
            Purchase::Cart { items } => items,
        }
    }

    pub fn is_cart(&self) -> bool {
        matches!(self, Purchase::Cart { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub price: Rupees,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    /// Overrides the payment's default wholesaler for this item.
    #[serde(default)]
    pub wholesaler: Option<PartySnapshot>,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", content = "orders", rename_all = "snake_case")]
pub enum PaymentIntakeResult {
    Created(Vec<Order>),
    /// The payment had already been processed. These are the orders it created the first time.
    Duplicate(Vec<Order>),
}

impl PaymentIntakeResult {
    pub fn orders(&self) -> &[Order] {
        match self {
            PaymentIntakeResult::Created(orders) | PaymentIntakeResult::Duplicate(orders) => orders,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, PaymentIntakeResult::Duplicate(_))
    }
}
