use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
    time::Duration,
};

use dispatch_engine::{
    db_types::{Coordinate, NewPartyProfile, OrderStatusType, PartyRole, PartySnapshot},
    events::{EventHandlers, EventHooks},
    DispatchError,
    OrderManagement,
    Purchase,
};
use log::*;
use mdg_common::Rupees;

use crate::support::fixtures::{charges, line_item, party, payment, TestSystem};

mod support;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

fn cart(n: usize) -> Purchase {
    let items = (1..=n).map(|i| line_item(&format!("sku{i}"), 100 * i as i64)).collect();
    Purchase::Cart { items }
}

#[tokio::test]
async fn cart_creates_one_order_per_line() {
    let sys = TestSystem::new().await;
    let result = sys.intake.on_payment_confirmed(payment("pay_cart", cart(3))).await.unwrap();
    assert!(!result.is_duplicate());
    let orders = result.orders();
    assert_eq!(orders.len(), 3);
    let group = orders[0].cart_group.clone().expect("Cart orders must have a group id");
    for (i, order) in orders.iter().enumerate() {
        assert_eq!(order.payment_id, "pay_cart");
        assert_eq!(order.line_no, i as i64);
        assert_eq!(order.cart_group.as_ref(), Some(&group));
        assert_eq!(order.charges, charges());
        assert_eq!(order.status, OrderStatusType::Paid);
        assert_eq!(order.total_amount, order.price + Rupees::from(67));
        order.check_invariants().unwrap();
    }
    let stored = sys.db.fetch_orders_for_payment("pay_cart").await.unwrap();
    assert_eq!(stored, orders.to_vec());
    sys.tear_down().await;
}

#[tokio::test]
async fn repeated_confirmation_is_a_no_op() {
    let sys = TestSystem::new().await;
    let first = sys.intake.on_payment_confirmed(payment("pay_dup", cart(2))).await.unwrap();
    let second = sys.intake.on_payment_confirmed(payment("pay_dup", cart(2))).await.unwrap();
    assert!(!first.is_duplicate());
    assert!(second.is_duplicate());
    assert_eq!(first.orders(), second.orders());
    assert_eq!(sys.db.fetch_orders_for_payment("pay_dup").await.unwrap().len(), 2);
    sys.tear_down().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_confirmations_create_orders_once() {
    let sys = TestSystem::new().await;
    let (a, b) = tokio::join!(
        sys.intake.on_payment_confirmed(payment("pay_race", cart(3))),
        sys.intake.on_payment_confirmed(payment("pay_race", cart(3)))
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!([a.is_duplicate(), b.is_duplicate()].iter().filter(|d| !**d).count(), 1);
    let ids = |r: &dispatch_engine::PaymentIntakeResult| r.orders().iter().map(|o| o.order_id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&a), ids(&b));
    assert_eq!(sys.db.fetch_orders_for_payment("pay_race").await.unwrap().len(), 3);
    sys.tear_down().await;
}

#[tokio::test]
async fn incomplete_metadata_persists_nothing() {
    let sys = TestSystem::new().await;
    let mut event = payment("pay_incomplete", cart(2));
    event.metadata.retailer = None;
    let err = sys.intake.on_payment_confirmed(event).await.unwrap_err();
    assert!(matches!(err, DispatchError::IncompleteOrderData(_)), "{err}");

    let mut event = payment("pay_incomplete", cart(2));
    if let Some(Purchase::Cart { items }) = event.metadata.purchase.as_mut() {
        items[1].product_id = None;
    }
    let err = sys.intake.on_payment_confirmed(event).await.unwrap_err();
    assert!(matches!(err, DispatchError::IncompleteOrderData(_)), "{err}");
    assert!(sys.db.fetch_orders_for_payment("pay_incomplete").await.unwrap().is_empty());

    // A corrected event for the same payment still goes through
    let result = sys.intake.on_payment_confirmed(payment("pay_incomplete", cart(2))).await.unwrap();
    assert!(!result.is_duplicate());
    assert_eq!(result.orders().len(), 2);
    sys.tear_down().await;
}

#[tokio::test]
async fn line_items_can_name_their_own_wholesaler() {
    let sys = TestSystem::new().await;
    let mut event = payment("pay_multi", cart(2));
    if let Some(Purchase::Cart { items }) = event.metadata.purchase.as_mut() {
        items[1].wholesaler = Some(party("wholesaler2", None));
    }
    let result = sys.intake.on_payment_confirmed(event).await.unwrap();
    let wholesalers = result.orders().iter().map(|o| o.wholesaler.id.as_str()).collect::<Vec<_>>();
    assert_eq!(wholesalers, vec!["wholesaler1", "wholesaler2"]);
    sys.tear_down().await;
}

#[tokio::test]
async fn order_created_hook_fires_once_per_order() {
    let event = HookCalled::default();
    let event_copy = event.clone();
    let mut hooks = EventHooks::default();
    hooks.on_order_created(move |ev| {
        info!("🪝️ order created: {}", ev.order.order_id);
        event_copy.called();
        Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(16, hooks);
    let sys = TestSystem::with_producers(handlers.producers()).await;
    handlers.start_handlers().await;

    sys.intake.on_payment_confirmed(payment("pay_hook", cart(3))).await.unwrap();
    sys.intake.on_payment_confirmed(payment("pay_hook", cart(3))).await.unwrap();
    sys.intake.on_payment_confirmed(payment("pay_hook2", Purchase::Single { item: line_item("dal", 250) })).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(event.count(), 4);
    sys.tear_down().await;
}

#[tokio::test]
async fn stored_profiles_complete_the_checkout_snapshot() {
    let sys = TestSystem::new().await;
    let shop = Coordinate::new(18.9837, 72.8343);
    sys.profiles
        .register_party(NewPartyProfile {
            role: PartyRole::Retailer,
            party_id: "retailer1".to_string(),
            name: "Sai Kirana".to_string(),
            mobile: "9820000001".to_string(),
            location: Some(shop),
        })
        .await
        .unwrap();
    let mut event = payment("pay_profile", Purchase::Single { item: line_item("atta10kg", 300) });
    event.metadata.retailer = Some(PartySnapshot {
        id: "retailer1".to_string(),
        name: String::new(),
        mobile: String::new(),
        location: None,
    });
    let result = sys.intake.on_payment_confirmed(event).await.unwrap();
    let order = &result.orders()[0];
    assert_eq!(order.retailer.location, Some(shop));
    assert_eq!(order.retailer.name, "Sai Kirana");
    assert_eq!(order.retailer.mobile, "9820000001");

    // The checkout's own values are never overwritten
    let mut event = payment("pay_profile_2", Purchase::Single { item: line_item("atta10kg", 300) });
    let own = party("retailer1", None);
    event.metadata.retailer = Some(own.clone());
    let result = sys.intake.on_payment_confirmed(event).await.unwrap();
    let order = &result.orders()[0];
    assert_eq!(order.retailer.name, own.name);
    assert_eq!(order.retailer.mobile, own.mobile);
    assert_eq!(order.retailer.location, Some(shop));
    sys.tear_down().await;
}

#[tokio::test]
async fn unknown_party_keeps_the_snapshot_as_sent() {
    let sys = TestSystem::new().await;
    let mut event = payment("pay_no_profile", Purchase::Single { item: line_item("atta10kg", 300) });
    event.metadata.retailer = Some(party("walk_in", None));
    let result = sys.intake.on_payment_confirmed(event).await.unwrap();
    assert_eq!(result.orders()[0].retailer.location, None);
    assert_eq!(result.orders()[0].retailer.id, "walk_in");
    sys.tear_down().await;
}
