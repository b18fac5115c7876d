use actix_web::{http::StatusCode, test::TestRequest, web};
use chrono::Duration;
use dispatch_engine::{
    db_types::{Order, OrderStatusType},
    OrderQueryApi,
};
use serde_json::Value;

use super::{
    helpers::{delivered_order, get_request, paid_order},
    mocks::MockOrderStore,
};
use crate::{
    data_objects::ApiResponse,
    routes::{ActiveOrdersRoute, OrderByIdRoute},
};

fn configure(store: MockOrderStore) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let api = OrderQueryApi::new(store, Duration::minutes(10));
        cfg.app_data(web::Data::new(api))
            .service(OrderByIdRoute::<MockOrderStore>::new())
            .service(ActiveOrdersRoute::<MockOrderStore>::new());
    }
}

#[actix_web::test]
async fn fetch_existing_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order().withf(|id| id.0 == "ord_1").times(1).returning(|_| Ok(Some(paid_order("ord_1"))));
    let req = TestRequest::get().uri("/order/ord_1");
    let (status, body) = get_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let response: ApiResponse<Order> = serde_json::from_str(&body).expect("Response is not an order");
    assert!(response.success);
    let order = response.data;
    assert_eq!(order.order_id.as_str(), "ord_1");
    assert_eq!(order.status, OrderStatusType::Paid);
    assert_eq!(order.charges, paid_order("ord_1").charges);
}

#[actix_web::test]
async fn fetch_missing_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order().times(1).returning(|_| Ok(None));
    let req = TestRequest::get().uri("/order/ord_1");
    let (status, body) = get_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"success":false,"message":"Order #ord_1 does not exist."}"#);
}

#[actix_web::test]
async fn delivery_code_is_never_returned() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order().returning(|_| {
        let mut order = paid_order("ord_1");
        order.delivery_code = Some("4711".to_string());
        Ok(Some(order))
    });
    let req = TestRequest::get().uri("/order/ord_1");
    let (status, body) = get_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("4711"), "Delivery code leaked: {body}");
}

#[actix_web::test]
async fn active_orders_for_retailer() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store
        .expect_search_orders()
        .withf(|q| q.retailer.as_deref() == Some("9820012345") && q.wholesaler_id.is_none())
        .times(1)
        .returning(|_| Ok(vec![paid_order("ord_1"), delivered_order("ord_2", 5), delivered_order("ord_3", 60)]));
    let req = TestRequest::get().uri("/orders/retailer/9820012345");
    let (status, body) = get_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["success"], true);
    let ids = response["data"].as_array().unwrap().iter().map(|o| o["order_id"].as_str().unwrap()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["ord_1", "ord_2"]);
}

#[actix_web::test]
async fn active_orders_for_wholesaler() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store
        .expect_search_orders()
        .withf(|q| q.wholesaler_id.as_deref() == Some("wholesaler1") && q.retailer.is_none())
        .times(1)
        .returning(|_| Ok(vec![]));
    let req = TestRequest::get().uri("/orders/wholesaler/wholesaler1");
    let (status, body) = get_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"data":[]}"#);
}

#[actix_web::test]
async fn active_orders_for_unknown_role() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_search_orders().never();
    let req = TestRequest::get().uri("/orders/landlord/1234");
    let (status, body) = get_request(req, configure(store)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains(r#""success":false"#), "{body}");
}
