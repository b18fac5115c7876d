use actix_web::{
    body::MessageBody,
    dev::ServiceResponse,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::{DateTime, Duration, Utc};
use dispatch_engine::db_types::{
    Coordinate,
    DeliveryCharges,
    HistoryEntry,
    LifecycleEvent,
    Order,
    OrderId,
    OrderStatusType,
    PartySnapshot,
    ProductSnapshot,
    VehicleTier,
};
use mdg_common::Rupees;

pub async fn get_request(req: TestRequest, configure: impl FnOnce(&mut ServiceConfig)) -> (StatusCode, String) {
    let app = test::init_service(App::new().configure(configure)).await;
    let res = test::call_service(&app, req.to_request()).await;
    into_parts(res)
}

pub fn into_parts<B: MessageBody>(res: ServiceResponse<B>) -> (StatusCode, String) {
    let status = res.status();
    let body = res.into_body().try_into_bytes().map(|b| String::from_utf8_lossy(&b).to_string()).unwrap_or_default();
    (status, body)
}

pub fn order_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-01T09:30:00Z").map(|t| t.with_timezone(&Utc)).unwrap()
}

fn party(id: &str, lat: f64) -> PartySnapshot {
    PartySnapshot {
        id: id.to_string(),
        name: format!("{id} traders"),
        mobile: "9820012345".to_string(),
        location: Some(Coordinate { lat, lng: 72.8343 }),
    }
}

/// A single-item order in the `paid` state, created at [`order_time`].
pub fn paid_order(order_id: &str) -> Order {
    Order {
        id: 1,
        order_id: OrderId::from(order_id),
        payment_id: "pay_1".to_string(),
        line_no: 0,
        cart_group: None,
        product: ProductSnapshot {
            product_id: "rice25kg".to_string(),
            product_name: "Basmati rice 25kg".to_string(),
            image: None,
            quantity: 1,
        },
        wholesaler: party("wholesaler1", 18.9477),
        retailer: party("retailer1", 18.9837),
        delivery_agent: None,
        vehicle_tier: VehicleTier::TwoWheeler,
        price: Rupees::from(300),
        charges: DeliveryCharges {
            total_delivery: Rupees::from(95),
            retailer_pays: Rupees::from(67),
            wholesaler_pays: Rupees::from(28),
            retailer_percent: 70,
        },
        total_amount: Rupees::from(367),
        status: OrderStatusType::Paid,
        history: vec![HistoryEntry { event: LifecycleEvent::Paid, at: order_time() }],
        delivery_code: None,
        delivery_code_time: None,
        created_at: order_time(),
        updated_at: order_time(),
    }
}

/// An order that was delivered `minutes_ago` minutes before now.
pub fn delivered_order(order_id: &str, minutes_ago: i64) -> Order {
    let mut order = paid_order(order_id);
    let delivered_at = Utc::now() - Duration::minutes(minutes_ago);
    order.status = OrderStatusType::Delivered;
    order.history.push(HistoryEntry { event: LifecycleEvent::Delivered, at: delivered_at });
    order.updated_at = delivered_at;
    order
}
