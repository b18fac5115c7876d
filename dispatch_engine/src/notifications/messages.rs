use crate::{
    db_types::{Order, OrderStatusType, PartyRole},
    events::{DeliveryCodeIssuedEvent, OrderStatusChangedEvent},
    notifications::{Notification, Recipient},
};

fn message(order: &Order, title: &str, body: String) -> Notification {
    Notification::new(title, body).with_data("orderId", order.order_id.as_str()).with_data("status", order.status.as_str())
}

/// Sent to the wholesaler when a paid order is created.
pub fn order_created_notification(order: &Order) -> Notification {
    message(
        order,
        "💰 New Paid Order",
        format!("₹{} order received for {}", order.price.value(), order.product.product_name),
    )
}

/// Sent to every agent within the matching radius of a new order's pickup point.
pub fn order_available_notification(order: &Order, distance_km: f64) -> Notification {
    message(
        order,
        "📦 New Order Available",
        format!(
            "{} from {} is ready for pickup {distance_km:.1} km away. Delivery pays ₹{}",
            order.product.product_name,
            order.wholesaler.name,
            order.charges.total_delivery.value()
        ),
    )
    .with_data("distanceKm", format!("{distance_km:.1}"))
}

/// The SMS that carries a delivery code to the retailer.
pub fn code_issued_sms(event: &DeliveryCodeIssuedEvent) -> String {
    let (agent_name, agent_mobile) =
        event.order.delivery_agent.as_ref().map(|a| (a.name.as_str(), a.mobile.as_str())).unwrap_or(("your courier", "-"));
    format!(
        "Your delivery code for {} is {}. Share it with {agent_name} ({agent_mobile}) only when you receive your order. \
         Valid until {} UTC.",
        event.order.product.product_name,
        event.code,
        event.expires_at.format("%H:%M")
    )
}

/// The push messages that follow a status change. Most transitions inform the retailer. Delivery also informs the
/// wholesaler, and an expired code tells the agent to issue a new one.
pub fn status_notifications(event: &OrderStatusChangedEvent) -> Vec<(Recipient, Notification)> {
    let order = &event.order;
    let retailer = Recipient::new(PartyRole::Retailer, order.retailer.id.clone());
    let product = order.product.product_name.as_str();
    let agent_name = order.delivery_agent.as_ref().map(|a| a.name.as_str()).unwrap_or("A delivery partner");
    match (event.previous, order.status) {
        (_, OrderStatusType::DeliveryAccepted) => vec![(
            retailer,
            message(order, "🛵 Delivery Partner Assigned", format!("{agent_name} will deliver your {product}")),
        )],
        (OrderStatusType::DeliveryCodeGenerated, OrderStatusType::PickedUp) => {
            let agent = order.agent_id().map(|id| Recipient::new(PartyRole::DeliveryAgent, id));
            agent
                .map(|agent| {
                    let body = format!("The delivery code for {product} expired. Generate a new code at the door.");
                    (agent, message(order, "⏰ Delivery Code Expired", body))
                })
                .into_iter()
                .collect()
        },
        (_, OrderStatusType::PickedUp) => vec![(
            retailer,
            message(order, "📦 Order Picked Up", format!("{agent_name} has picked up your {product}")),
        )],
        (_, OrderStatusType::Delivered) => {
            let wholesaler = Recipient::new(PartyRole::Wholesaler, order.wholesaler.id.clone());
            vec![
                (retailer, message(order, "✅ Order Delivered", format!("Your {product} has been delivered"))),
                (
                    wholesaler,
                    message(order, "✅ Order Delivered", format!("{product} was delivered to {}", order.retailer.name)),
                ),
            ]
        },
        _ => vec![],
    }
}
