use std::{fmt::Debug, sync::Arc};

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{
        CartGroupId,
        DeliveryCharges,
        NewOrder,
        OrderId,
        PartyRole,
        PartySnapshot,
        ProductSnapshot,
        VehicleTier,
    },
    dispatch_api::{
        errors::DispatchError,
        payment_objects::{LineItem, PaymentConfirmation, PaymentIntakeResult, PaymentMetadata},
    },
    events::{EventProducers, OrderCreatedEvent},
    helpers::{Clock, SystemClock},
    traits::{DispatchDatabase, InsertOrderResult, PartyManagement},
};

/// `PaymentIntakeApi` turns confirmed payments into `paid` orders.
pub struct PaymentIntakeApi<B> {
    db: B,
    producers: EventProducers,
    clock: Arc<dyn Clock>,
}

impl<B> Debug for PaymentIntakeApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentIntakeApi")
    }
}

impl<B> PaymentIntakeApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<B> PaymentIntakeApi<B>
where B: DispatchDatabase
{
    /// `onPaymentConfirmed`.
    ///
    /// A single-item purchase creates one order. A cart creates one order per line item; the orders share the payment
    /// id, a cart group id, and the same delivery charge breakdown.
    ///
    /// Payment events arrive at least once, so a payment id that has already been processed returns
    /// [`PaymentIntakeResult::Duplicate`] with the orders created the first time. Incomplete metadata is rejected
    /// before anything is written. Snapshot fields the checkout left out (a party's location, name or mobile) are taken
    /// from the stored wholesaler and retailer profiles.
    pub async fn on_payment_confirmed(&self, mut event: PaymentConfirmation) -> Result<PaymentIntakeResult, DispatchError> {
        let payment_id = event.payment_id.trim().to_string();
        if payment_id.is_empty() {
            return Err(DispatchError::IncompleteOrderData("The payment id is missing".into()));
        }
        let existing = self.db.fetch_orders_for_payment(&payment_id).await?;
        if !existing.is_empty() {
            info!("💰️ Payment {payment_id} has already been processed. Ignoring the duplicate event.");
            return Ok(PaymentIntakeResult::Duplicate(existing));
        }
        self.fill_from_profiles(&mut event.metadata).await?;
        let new_orders = build_orders(&payment_id, event, self.clock.now())?;
        let count = new_orders.len();
        match self.db.insert_orders_for_payment(&payment_id, new_orders).await? {
            InsertOrderResult::Inserted(orders) => {
                info!("💰️ Payment {payment_id} confirmed. {count} order(s) created.");
                for order in &orders {
                    self.producers.publish_order_created(OrderCreatedEvent::new(order.clone())).await;
                }
                Ok(PaymentIntakeResult::Created(orders))
            },
            InsertOrderResult::AlreadyExists(orders) => {
                info!("💰️ Payment {payment_id} was processed concurrently. Ignoring the duplicate event.");
                Ok(PaymentIntakeResult::Duplicate(orders))
            },
        }
    }

    async fn fill_from_profiles(&self, metadata: &mut PaymentMetadata) -> Result<(), DispatchError> {
        if let Some(retailer) = metadata.retailer.as_mut() {
            self.fill_party(PartyRole::Retailer, retailer).await?;
        }
        if let Some(wholesaler) = metadata.wholesaler.as_mut() {
            self.fill_party(PartyRole::Wholesaler, wholesaler).await?;
        }
        if let Some(purchase) = metadata.purchase.as_mut() {
            for item in purchase.items_mut() {
                if let Some(wholesaler) = item.wholesaler.as_mut() {
                    self.fill_party(PartyRole::Wholesaler, wholesaler).await?;
                }
            }
        }
        Ok(())
    }

    /// The snapshot wins wherever it has a value.
    async fn fill_party(&self, role: PartyRole, party: &mut PartySnapshot) -> Result<(), DispatchError> {
        let party_id = party.id.trim().to_string();
        let complete = party.location.is_some() && !party.name.trim().is_empty() && !party.mobile.trim().is_empty();
        if complete || party_id.is_empty() {
            return Ok(());
        }
        let Some(profile) = self.db.fetch_party(role, &party_id).await? else {
            debug!("💰️ {role} {party_id} has no stored profile to complete the checkout snapshot");
            return Ok(());
        };
        if party.location.is_none() {
            party.location = profile.location;
        }
        if party.name.trim().is_empty() {
            party.name = profile.name;
        }
        if party.mobile.trim().is_empty() {
            party.mobile = profile.mobile;
        }
        debug!("💰️ Completed the {role} {party_id} snapshot from the stored profile");
        Ok(())
    }
}

fn incomplete<S: Into<String>>(reason: S) -> DispatchError {
    DispatchError::IncompleteOrderData(reason.into())
}

fn check_party(party: Option<PartySnapshot>, label: &str) -> Result<PartySnapshot, DispatchError> {
    let party = party.ok_or_else(|| incomplete(format!("The {label} is missing")))?;
    if party.id.trim().is_empty() {
        return Err(incomplete(format!("The {label} id is missing")));
    }
    if let Some(loc) = &party.location {
        if !loc.is_valid() {
            return Err(incomplete(format!("The {label} location {loc} is not valid")));
        }
    }
    Ok(party)
}

fn check_product(item: &LineItem, line_no: usize) -> Result<ProductSnapshot, DispatchError> {
    let product_id = item
        .product_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| incomplete(format!("Line {line_no} has no product reference")))?;
    if !item.price.is_positive() {
        return Err(incomplete(format!("Line {line_no} has a non-positive price of {}", item.price)));
    }
    if item.quantity < 1 {
        return Err(incomplete(format!("Line {line_no} has a quantity of {}", item.quantity)));
    }
    Ok(ProductSnapshot {
        product_id: product_id.to_string(),
        product_name: item.product_name.clone().unwrap_or_else(|| product_id.to_string()),
        image: item.image.clone(),
        quantity: item.quantity,
    })
}

/// Validates the metadata and lays out the orders to insert. Pure, so nothing is persisted if any part is invalid.
fn build_orders(
    payment_id: &str,
    event: PaymentConfirmation,
    now: DateTime<Utc>,
) -> Result<Vec<NewOrder>, DispatchError> {
    let metadata = event.metadata;
    let purchase = metadata.purchase.ok_or_else(|| incomplete("The purchase details are missing"))?;
    let retailer = check_party(metadata.retailer, "retailer")?;
    let charges: DeliveryCharges = metadata.charges.ok_or_else(|| incomplete("The delivery charges are missing"))?;
    if !charges.is_consistent() {
        return Err(incomplete(format!(
            "The delivery shares {} + {} do not add up to {}",
            charges.retailer_pays, charges.wholesaler_pays, charges.total_delivery
        )));
    }
    let vehicle_tier = match metadata.vehicle_tier.as_deref() {
        Some(tier) => tier.parse::<VehicleTier>().map_err(|e| incomplete(e.to_string()))?,
        None => return Err(incomplete("The vehicle tier is missing")),
    };
    let items = purchase.items();
    if items.is_empty() {
        return Err(incomplete("The cart is empty"));
    }
    let cart_group = purchase.is_cart().then(CartGroupId::random);
    items
        .iter()
        .enumerate()
        .map(|(line_no, item)| {
            let product = check_product(item, line_no)?;
            let wholesaler = check_party(item.wholesaler.clone().or_else(|| metadata.wholesaler.clone()), "wholesaler")?;
            Ok(NewOrder {
                order_id: OrderId::random(),
                payment_id: payment_id.to_string(),
                line_no: line_no as i64,
                cart_group: cart_group.clone(),
                product,
                wholesaler,
                retailer: retailer.clone(),
                vehicle_tier,
                price: item.price,
                charges,
                created_at: now,
            })
        })
        .collect()
}
