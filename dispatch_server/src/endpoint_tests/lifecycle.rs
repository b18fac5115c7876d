use std::sync::Arc;

use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use dispatch_engine::{
    db_types::{OrderId, OrderStatusType},
    events::EventProducers,
    geo::HaversineRouter,
    matcher::DEFAULT_MATCH_RADIUS_KM,
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    DeliveryMatcher,
    DispatchRules,
    OrderLifecycleApi,
    OrderManagement,
    PaymentConfirmation,
    PaymentIntakeApi,
    ProfileApi,
    SqliteDatabase,
};
use serde_json::{json, Value};

use super::helpers::into_parts;
use crate::routes::{
    AcceptOrderRoute,
    AgentLocationRoute,
    AvailableOrdersRoute,
    DeliveryCodeRoute,
    PartyByIdRoute,
    PickupOrderRoute,
    RegisterAgentRoute,
    RegisterPartyRoute,
    VerifyCodeRoute,
};

fn payment(payment_id: &str) -> PaymentConfirmation {
    let event = json!({
        "payment_id": payment_id,
        "metadata": {
            "purchase": {
                "type": "single",
                "item": { "product_id": "rice25kg", "product_name": "Basmati rice 25kg", "price": 300, "quantity": 1 }
            },
            "retailer": {
                "id": "retailer1", "name": "Sai Kirana", "mobile": "9820000001",
                "location": { "lat": 18.9837, "lng": 72.8343 }
            },
            "wholesaler": {
                "id": "wholesaler1", "name": "Crawford Grains", "mobile": "9820000002",
                "location": { "lat": 18.9477, "lng": 72.8343 }
            },
            "vehicle_tier": "two_wheeler",
            "charges": { "total_delivery": 95, "retailer_pays": 67, "wholesaler_pays": 28, "retailer_percent": 70 }
        }
    });
    serde_json::from_value(event).expect("Invalid payment confirmation")
}

fn agent(agent_id: &str) -> Value {
    json!({ "agent_id": agent_id, "name": format!("Agent {agent_id}"), "mobile": "9000000001", "vehicle_tier": "two_wheeler" })
}

fn data(body: &str) -> Value {
    let mut response: Value = serde_json::from_str(body).expect("Response is not JSON");
    assert_eq!(response["success"], true, "{body}");
    response["data"].take()
}

/// Flips every digit, so the result is never the code it was given.
fn wrong_code(code: &str) -> String {
    code.chars().map(|c| c.to_digit(10).map(|d| char::from(b'0' + ((d + 5) % 10) as u8)).unwrap_or('0')).collect()
}

#[actix_web::test]
async fn delivery_lifecycle_over_http() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let matcher = DeliveryMatcher::new(Arc::new(HaversineRouter::default()), DEFAULT_MATCH_RADIUS_KM);
    let lifecycle = OrderLifecycleApi::new(db.clone(), EventProducers::default(), matcher, DispatchRules::default());
    let profiles = ProfileApi::new(db.clone());
    let intake = PaymentIntakeApi::new(db.clone(), EventProducers::default());
    let created = intake.on_payment_confirmed(payment("pay_http_1")).await.expect("Error creating order");
    let order_id = created.orders()[0].order_id.clone();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(lifecycle))
            .app_data(web::Data::new(profiles))
            .service(RegisterAgentRoute::<SqliteDatabase>::new())
            .service(AgentLocationRoute::<SqliteDatabase>::new())
            .service(AvailableOrdersRoute::<SqliteDatabase>::new())
            .service(AcceptOrderRoute::<SqliteDatabase>::new())
            .service(PickupOrderRoute::<SqliteDatabase>::new())
            .service(DeliveryCodeRoute::<SqliteDatabase>::new())
            .service(VerifyCodeRoute::<SqliteDatabase>::new()),
    )
    .await;

    macro_rules! call {
        ($req:expr) => {
            into_parts(test::call_service(&app, $req.to_request()).await)
        };
    }

    // An agent without a profile cannot take the order
    let (status, _) = call!(TestRequest::post()
        .uri(&format!("/orders/{}/accept", order_id.as_str()))
        .set_json(json!({ "agent_id": "agent1" })));
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    for agent_id in ["agent1", "agent2"] {
        let (status, body) = call!(TestRequest::post().uri("/agents").set_json(agent(agent_id)));
        assert_eq!(status, StatusCode::OK, "{body}");
        let (status, body) = call!(TestRequest::post()
            .uri(&format!("/agents/{agent_id}/location"))
            .set_json(json!({ "lat": 18.96, "lng": 72.8343 })));
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (status, body) = call!(TestRequest::get().uri("/agents/agent1/available_orders"));
    assert_eq!(status, StatusCode::OK);
    let available = data(&body);
    assert!(available.as_array().unwrap().iter().any(|o| o["order_id"] == order_id.as_str()), "{body}");

    let (status, body) = call!(TestRequest::post()
        .uri(&format!("/orders/{}/accept", order_id.as_str()))
        .set_json(json!({ "agent_id": "agent1" })));
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = data(&body);
    assert_eq!(order["status"], "delivery_accepted");
    assert_eq!(order["delivery_agent"]["id"], "agent1");

    // Only the agent that accepted the order may pick it up
    let (status, _) = call!(TestRequest::post()
        .uri(&format!("/orders/{}/pickup", order_id.as_str()))
        .set_json(json!({ "agent_id": "agent2" })));
    assert_eq!(status, StatusCode::CONFLICT);

    // No code before pickup
    let (status, _) = call!(TestRequest::post().uri(&format!("/orders/{}/delivery_code", order_id.as_str())));
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call!(TestRequest::post()
        .uri(&format!("/orders/{}/pickup", order_id.as_str()))
        .set_json(json!({ "agent_id": "agent1" })));
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = call!(TestRequest::post().uri(&format!("/orders/{}/delivery_code", order_id.as_str())));
    assert_eq!(status, StatusCode::OK, "{body}");
    let issued = data(&body);
    assert_eq!(issued["order"]["status"], "delivery_code_generated");
    assert!(issued["expires_at"].is_string());
    assert!(issued.get("code").is_none());
    assert!(issued["order"].get("delivery_code").is_none());

    let stored = db.fetch_order(&order_id).await.unwrap().expect("Order disappeared");
    let code = stored.delivery_code.expect("No delivery code was stored");

    let (status, body) = call!(TestRequest::post()
        .uri(&format!("/orders/{}/verify", order_id.as_str()))
        .set_json(json!({ "code": wrong_code(&code) })));
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (status, body) = call!(TestRequest::post()
        .uri(&format!("/orders/{}/verify", order_id.as_str()))
        .set_json(json!({ "code": code })));
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = data(&body);
    assert_eq!(order["status"], "delivered");

    // Delivered is terminal
    let (status, _) = call!(TestRequest::post()
        .uri(&format!("/orders/{}/verify", order_id.as_str()))
        .set_json(json!({ "code": code })));
    assert_eq!(status, StatusCode::CONFLICT);

    let stored = db.fetch_order(&order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatusType::Delivered);
    drop_database(&url).await;
}

#[actix_web::test]
async fn unknown_order_is_not_found() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let matcher = DeliveryMatcher::new(Arc::new(HaversineRouter::default()), DEFAULT_MATCH_RADIUS_KM);
    let lifecycle = OrderLifecycleApi::new(db.clone(), EventProducers::default(), matcher, DispatchRules::default());
    let app = test::init_service(
        App::new().app_data(web::Data::new(lifecycle)).service(PickupOrderRoute::<SqliteDatabase>::new()),
    )
    .await;
    let order_id = OrderId::from("ord_missing");
    let req = TestRequest::post()
        .uri(&format!("/orders/{}/pickup", order_id.as_str()))
        .set_json(json!({ "agent_id": "agent1" }));
    let (status, body) = into_parts(test::call_service(&app, req.to_request()).await);
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"success":false,"message":"Order #ord_missing does not exist."}"#);
    drop_database(&url).await;
}

#[actix_web::test]
async fn party_profiles_over_http() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(ProfileApi::new(db.clone())))
            .service(RegisterPartyRoute::<SqliteDatabase>::new())
            .service(PartyByIdRoute::<SqliteDatabase>::new()),
    )
    .await;
    let profile = json!({
        "role": "retailer", "party_id": "retailer1", "name": "Sai Kirana", "mobile": "9820000001",
        "location": { "lat": 18.9837, "lng": 72.8343 }
    });
    let req = TestRequest::post().uri("/parties").set_json(profile);
    let (status, body) = into_parts(test::call_service(&app, req.to_request()).await);
    assert_eq!(status, StatusCode::OK, "{body}");

    let req = TestRequest::get().uri("/parties/retailer/retailer1");
    let (status, body) = into_parts(test::call_service(&app, req.to_request()).await);
    assert_eq!(status, StatusCode::OK, "{body}");
    let party = data(&body);
    assert_eq!(party["name"], "Sai Kirana");
    let lat = party["location"]["lat"].as_f64().unwrap();
    assert!((lat - 18.9837).abs() < 1e-9, "{lat}");

    // Profiles are keyed by role as well as id
    let req = TestRequest::get().uri("/parties/wholesaler/retailer1");
    let (status, body) = into_parts(test::call_service(&app, req.to_request()).await);
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    drop_database(&url).await;
}
