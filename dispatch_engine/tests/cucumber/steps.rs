use chrono::Duration;
use cucumber::{given, then, when};
use dispatch_engine::{
    db_types::{LifecycleEvent, OrderStatusType, PartyRole, VehicleTier},
    PricingEngine,
    Purchase,
};
use mdg_common::Rupees;

use crate::{
    cucumber::{world::error_kind, DeliveryWorld},
    support::fixtures::{line_item, north_of, payment, ORIGIN},
};

#[given(expr = "agent '{word}' is {float} km north of the pickup point")]
async fn agent_north_of_pickup(world: &mut DeliveryWorld, agent_id: String, km: f64) {
    world.system().agent_at(&agent_id, north_of(&ORIGIN, km)).await;
}

#[when(expr = "payment [{word}] confirms a single item for {int} rupees")]
async fn single_item_payment(world: &mut DeliveryWorld, payment_id: String, price: i64) {
    let event = payment(&payment_id, Purchase::Single { item: line_item("atta10kg", price) });
    confirm(world, payment_id, event).await;
}

#[when(expr = "payment [{word}] confirms a cart of {int} items")]
async fn cart_payment(world: &mut DeliveryWorld, payment_id: String, count: i64) {
    let items = (1..=count).map(|i| line_item(&format!("sku{i}"), 100 * i)).collect();
    confirm(world, payment_id, payment("", Purchase::Cart { items })).await;
}

#[when(expr = "payment [{word}] confirms without a retailer")]
async fn payment_without_retailer(world: &mut DeliveryWorld, payment_id: String) {
    let mut event = payment(&payment_id, Purchase::Single { item: line_item("atta10kg", 300) });
    event.metadata.retailer = None;
    confirm(world, payment_id, event).await;
}

async fn confirm(world: &mut DeliveryWorld, payment_id: String, mut event: dispatch_engine::PaymentConfirmation) {
    event.payment_id = payment_id.clone();
    let result = world.system().intake.on_payment_confirmed(event).await;
    if let Some(result) = world.record(result) {
        let ids = result.orders().iter().map(|o| o.order_id.clone()).collect();
        world.orders.insert(payment_id, ids);
    }
}

#[when(expr = "agent '{word}' accepts the order for payment [{word}]")]
async fn accept(world: &mut DeliveryWorld, agent_id: String, payment_id: String) {
    let order_id = world.order_id(&payment_id);
    let result = world.system().lifecycle.accept_order(&order_id, &agent_id).await;
    world.record(result);
}

#[when(expr = "agent '{word}' picks up the order for payment [{word}]")]
async fn pickup(world: &mut DeliveryWorld, agent_id: String, payment_id: String) {
    let order_id = world.order_id(&payment_id);
    let result = world.system().lifecycle.pickup_order(&order_id, &agent_id).await;
    world.record(result);
}

#[when(expr = "a delivery code is generated for payment [{word}]")]
async fn generate_code(world: &mut DeliveryWorld, payment_id: String) {
    let order_id = world.order_id(&payment_id);
    let result = world.system().lifecycle.generate_delivery_code(&order_id).await;
    if let Some(issued) = world.record(result) {
        world.codes.insert(order_id, issued.code);
    }
}

#[when(expr = "the retailer enters the delivery code for payment [{word}]")]
async fn enter_code(world: &mut DeliveryWorld, payment_id: String) {
    let order_id = world.order_id(&payment_id);
    let code = world.codes.get(&order_id).cloned().expect("No code has been issued for this order");
    let result = world.system().lifecycle.verify_delivery_code(&order_id, &code).await;
    world.record(result);
}

#[when(expr = "the retailer enters code {string} for payment [{word}]")]
async fn enter_given_code(world: &mut DeliveryWorld, code: String, payment_id: String) {
    let order_id = world.order_id(&payment_id);
    let result = world.system().lifecycle.verify_delivery_code(&order_id, &code).await;
    world.record(result);
}

#[when(expr = "{int} minutes pass")]
async fn minutes_pass(world: &mut DeliveryWorld, minutes: i64) {
    world.system().clock.advance(Duration::minutes(minutes));
}

#[when("the code expiry sweep runs")]
async fn run_sweep(world: &mut DeliveryWorld) {
    let result = world.system().lifecycle.expire_stale_codes().await;
    world.record(result);
}

#[when(expr = "I price a {int} rupee order on a {word} over {float} km and {float} minutes")]
async fn price_order(world: &mut DeliveryWorld, amount: i64, tier: String, km: f64, minutes: f64) {
    let tier = tier.parse::<VehicleTier>().expect("Unknown vehicle tier");
    let charges = PricingEngine::default().quote(Rupees::from(amount), tier, km, minutes).expect("Pricing failed");
    world.quote = Some(charges);
}

#[then(expr = "the order for payment [{word}] is {word}")]
async fn check_status(world: &mut DeliveryWorld, payment_id: String, status: String) {
    let order = world.order(&payment_id).await;
    let expected = status.parse::<OrderStatusType>().expect("Unknown order status");
    assert_eq!(order.status, expected, "Status is incorrect");
    order.check_invariants().expect("Order invariants do not hold");
}

#[then(expr = "the order for payment [{word}] is assigned to '{word}'")]
async fn check_agent(world: &mut DeliveryWorld, payment_id: String, agent_id: String) {
    let order = world.order(&payment_id).await;
    assert_eq!(order.agent_id(), Some(agent_id.as_str()));
}

#[then(expr = "the order for payment [{word}] has no delivery code")]
async fn check_no_code(world: &mut DeliveryWorld, payment_id: String) {
    let order = world.order(&payment_id).await;
    assert!(order.delivery_code.is_none(), "Order still holds a delivery code");
    assert!(order.delivery_code_time.is_none(), "Order still holds a delivery code time");
}

#[then(expr = "the history of the order for payment [{word}] is {string}")]
async fn check_history(world: &mut DeliveryWorld, payment_id: String, history: String) {
    let order = world.order(&payment_id).await;
    let expected = history
        .split(',')
        .map(|e| e.trim().parse::<LifecycleEvent>().expect("Unknown lifecycle event"))
        .collect::<Vec<_>>();
    let actual = order.history.iter().map(|h| h.event).collect::<Vec<_>>();
    assert_eq!(actual, expected, "History is incorrect");
}

#[then(expr = "the request fails with {word}")]
async fn check_failure(world: &mut DeliveryWorld, kind: String) {
    let err = world.last_error.as_ref().expect("The last request succeeded");
    assert_eq!(error_kind(err), kind, "Unexpected error: {err}");
}

#[then("the request succeeds")]
async fn check_success(world: &mut DeliveryWorld) {
    if let Some(err) = &world.last_error {
        panic!("The last request failed: {err}");
    }
}

#[then(expr = "payment [{word}] has {int} orders sharing one cart group")]
async fn check_cart(world: &mut DeliveryWorld, payment_id: String, count: usize) {
    let query = &world.system().query;
    let mut orders = Vec::new();
    for id in world.orders.get(&payment_id).expect("No orders for payment") {
        orders.push(query.fetch_order(id).await.expect("Error fetching order"));
    }
    assert_eq!(orders.len(), count);
    let group = orders[0].cart_group.clone();
    assert!(group.is_some(), "Cart orders have no group id");
    assert!(orders.iter().all(|o| o.cart_group == group && o.payment_id == payment_id));
    assert!(orders.iter().all(|o| o.charges == orders[0].charges));
}

#[then(expr = "the {word} has {int} active orders")]
async fn check_active(world: &mut DeliveryWorld, role: String, count: usize) {
    let (role, key) = match role.as_str() {
        "retailer" => (PartyRole::Retailer, "retailer1"),
        "wholesaler" => (PartyRole::Wholesaler, "wholesaler1"),
        r => panic!("Unknown party {r}"),
    };
    let orders = world.system().query.list_active_orders(role, key).await.expect("Error listing orders");
    assert_eq!(orders.len(), count);
}

#[then(expr = "the delivery costs {int} rupees, of which the retailer pays {int} \\({int}%\\)")]
async fn check_quote(world: &mut DeliveryWorld, total: i64, retailer: i64, percent: u8) {
    let quote = world.quote.expect("No price was calculated");
    assert_eq!(quote.total_delivery, Rupees::from(total));
    assert_eq!(quote.retailer_pays, Rupees::from(retailer));
    assert_eq!(quote.retailer_percent, percent);
    assert_eq!(quote.retailer_pays + quote.wholesaler_pays, quote.total_delivery);
}
