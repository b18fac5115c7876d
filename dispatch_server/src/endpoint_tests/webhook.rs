use actix_web::{
    dev::{Service, ServiceResponse},
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    App,
};
use dispatch_engine::{
    events::EventProducers,
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    PaymentIntakeApi,
    SqliteDatabase,
};
use mdg_common::Secret;
use serde_json::{json, Value};

use super::helpers::into_parts;
use crate::{
    config::PAYMENT_SIGNATURE_HEADER,
    helpers::calculate_hmac,
    middleware::HmacMiddlewareFactory,
    routes::PaymentConfirmedRoute,
};

const SECRET: &str = "webhook-secret";

fn cart_payment(payment_id: &str) -> Value {
    let item = |sku: &str, price: i64| json!({ "product_id": sku, "product_name": sku, "price": price, "quantity": 1 });
    json!({
        "payment_id": payment_id,
        "metadata": {
            "purchase": { "type": "cart", "items": [item("atta10kg", 450), item("dal5kg", 380)] },
            "retailer": {
                "id": "retailer1", "name": "Sai Kirana", "mobile": "9820000001",
                "location": { "lat": 18.9837, "lng": 72.8343 }
            },
            "wholesaler": {
                "id": "wholesaler1", "name": "Crawford Grains", "mobile": "9820000002",
                "location": { "lat": 18.9477, "lng": 72.8343 }
            },
            "vehicle_tier": "three_wheeler",
            "charges": { "total_delivery": 120, "retailer_pays": 84, "wholesaler_pays": 36, "retailer_percent": 70 }
        }
    })
}

/// Runs the request and turns middleware rejections into their HTTP response, as the server would.
async fn call<S, B>(app: &S, req: TestRequest) -> (StatusCode, String)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: actix_web::body::MessageBody,
{
    match test::try_call_service(app, req.to_request()).await {
        Ok(res) => into_parts(res),
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}

fn signed(body: &Value, secret: &str) -> TestRequest {
    let bytes = serde_json::to_vec(body).unwrap();
    let signature = calculate_hmac(secret, &bytes);
    TestRequest::post()
        .uri("/webhook/payment_confirmed")
        .insert_header(("Content-Type", "application/json"))
        .insert_header((PAYMENT_SIGNATURE_HEADER, signature))
        .set_payload(bytes)
}

macro_rules! webhook_app {
    ($db:expr, $secret:expr) => {
        test::init_service(
            App::new().service(
                web::scope("/webhook")
                    .app_data(web::Data::new(PaymentIntakeApi::new($db.clone(), EventProducers::default())))
                    .wrap(HmacMiddlewareFactory::new(PAYMENT_SIGNATURE_HEADER, Secret::new($secret.to_string()), true))
                    .service(PaymentConfirmedRoute::<SqliteDatabase>::new()),
            ),
        )
        .await
    };
}

#[actix_web::test]
async fn unsigned_payments_are_rejected() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let app = webhook_app!(db, SECRET);
    let req = TestRequest::post().uri("/webhook/payment_confirmed").set_json(cart_payment("pay_1"));
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "No HMAC signature found.");

    let (status, body) = call(&app, signed(&cart_payment("pay_1"), "not-the-secret")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Invalid HMAC signature.");
    drop_database(&url).await;
}

#[actix_web::test]
async fn empty_secret_rejects_everything() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let app = webhook_app!(db, "");
    let (status, _) = call(&app, signed(&cart_payment("pay_1"), "")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    drop_database(&url).await;
}

#[actix_web::test]
async fn payment_creates_one_order_per_cart_line() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let app = webhook_app!(db, SECRET);
    let (status, body) = call(&app, signed(&cart_payment("pay_cart_1"), SECRET)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["success"], true);
    let result = &response["data"];
    assert_eq!(result["result"], "created");
    let orders = result["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o["status"] == "paid" && o["payment_id"] == "pay_cart_1"));
    assert!(orders[0]["cart_group"].is_string());
    assert_eq!(orders[0]["cart_group"], orders[1]["cart_group"]);
    assert_ne!(orders[0]["order_id"], orders[1]["order_id"]);

    // The payment provider retries. No new orders are created.
    let (status, body) = call(&app, signed(&cart_payment("pay_cart_1"), SECRET)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: Value = serde_json::from_str(&body).unwrap();
    let repeat = &response["data"];
    assert_eq!(repeat["result"], "duplicate");
    let mut first = orders.iter().map(|o| o["order_id"].clone()).collect::<Vec<_>>();
    let mut second = repeat["orders"].as_array().unwrap().iter().map(|o| o["order_id"].clone()).collect::<Vec<_>>();
    first.sort_by_key(|v| v.to_string());
    second.sort_by_key(|v| v.to_string());
    assert_eq!(first, second);
    drop_database(&url).await;
}

#[actix_web::test]
async fn incomplete_payment_metadata() {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    let app = webhook_app!(db, SECRET);
    let mut payment = cart_payment("pay_2");
    payment["metadata"].as_object_mut().unwrap().remove("retailer");
    let (status, body) = call(&app, signed(&payment, SECRET)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert!(body.contains(r#""success":false"#), "{body}");
    drop_database(&url).await;
}
