use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dispatch_engine::{
    db_types::{Coordinate, DeliveryAgentProfile, DeliveryCharges, NewAgentProfile, Order, PartySnapshot, VehicleTier},
    events::EventProducers,
    geo::HaversineRouter,
    helpers::{Clock, ManualClock},
    matcher::DEFAULT_MATCH_RADIUS_KM,
    notifications::{Notification, PushSender, SendError, SmsSender},
    DeliveryMatcher,
    DispatchRules,
    LineItem,
    OrderLifecycleApi,
    OrderQueryApi,
    PaymentConfirmation,
    PaymentIntakeApi,
    PaymentMetadata,
    ProfileApi,
    Purchase,
    SqliteDatabase,
};
use mdg_common::Rupees;

use super::prepare_env::{prepare_test_env, random_db_path, tear_down};

/// Crawford Market, Mumbai. The pickup point for most fixtures.
pub const ORIGIN: Coordinate = Coordinate { lat: 18.9477, lng: 72.8343 };

/// A point `km` kilometres due north of `origin`, by great-circle distance.
pub fn north_of(origin: &Coordinate, km: f64) -> Coordinate {
    Coordinate::new(origin.lat + km / 111.195, origin.lng)
}

pub fn party(id: &str, location: Option<Coordinate>) -> PartySnapshot {
    PartySnapshot { id: id.to_string(), name: format!("{id} traders"), mobile: format!("98200{:05}", id.len()), location }
}

pub fn line_item(product_id: &str, price: i64) -> LineItem {
    LineItem {
        product_id: Some(product_id.to_string()),
        product_name: Some(format!("Product {product_id}")),
        image: None,
        price: Rupees::from(price),
        quantity: 1,
        wholesaler: None,
    }
}

/// 70% of a ₹95 delivery, as priced for a ₹300 two-wheeler order.
pub fn charges() -> DeliveryCharges {
    DeliveryCharges {
        total_delivery: Rupees::from(95),
        retailer_pays: Rupees::from(67),
        wholesaler_pays: Rupees::from(28),
        retailer_percent: 70,
    }
}

pub fn payment(payment_id: &str, purchase: Purchase) -> PaymentConfirmation {
    PaymentConfirmation {
        payment_id: payment_id.to_string(),
        metadata: PaymentMetadata {
            purchase: Some(purchase),
            retailer: Some(party("retailer1", Some(north_of(&ORIGIN, 4.0)))),
            wholesaler: Some(party("wholesaler1", Some(ORIGIN))),
            vehicle_tier: Some("two_wheeler".to_string()),
            charges: Some(charges()),
        },
    }
}

pub fn new_agent(agent_id: &str) -> NewAgentProfile {
    NewAgentProfile {
        agent_id: agent_id.to_string(),
        name: format!("Agent {agent_id}"),
        mobile: "9000000001".to_string(),
        alternate_mobile: None,
        vehicle_tier: VehicleTier::TwoWheeler,
        vehicle_model: Some("Activa".to_string()),
        vehicle_number: Some("MH01AB1234".to_string()),
    }
}

/// All the engine APIs over one fresh database, sharing a manual clock.
#[derive(Debug)]
pub struct TestSystem {
    pub db: SqliteDatabase,
    pub clock: ManualClock,
    pub lifecycle: OrderLifecycleApi<SqliteDatabase>,
    pub intake: PaymentIntakeApi<SqliteDatabase>,
    pub query: OrderQueryApi<SqliteDatabase>,
    pub profiles: ProfileApi<SqliteDatabase>,
}

impl TestSystem {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        let db = prepare_test_env(&random_db_path()).await;
        Self::from_db(db, producers)
    }

    pub fn from_db(db: SqliteDatabase, producers: EventProducers) -> Self {
        let clock = ManualClock::new(start_time());
        let rules = DispatchRules::default();
        let lifecycle = OrderLifecycleApi::new(db.clone(), producers.clone(), matcher(), rules)
            .with_clock(Arc::new(clock.clone()));
        let intake = PaymentIntakeApi::new(db.clone(), producers).with_clock(Arc::new(clock.clone()));
        let query =
            OrderQueryApi::new(db.clone(), rules.delivered_visibility).with_clock(Arc::new(clock.clone()));
        let profiles = ProfileApi::new(db.clone()).with_clock(Arc::new(clock.clone()));
        Self { db, clock, lifecycle, intake, query, profiles }
    }

    /// A single-item order from `wholesaler1` at [`ORIGIN`], in the `paid` state.
    pub async fn paid_order(&self, payment_id: &str) -> Order {
        let result = self
            .intake
            .on_payment_confirmed(payment(payment_id, Purchase::Single { item: line_item("rice25kg", 300) }))
            .await
            .expect("Error processing payment");
        assert!(!result.is_duplicate(), "Payment {payment_id} was already processed");
        result.orders()[0].clone()
    }

    pub async fn agent_at(&self, agent_id: &str, location: Coordinate) -> DeliveryAgentProfile {
        self.profiles.register_agent(new_agent(agent_id)).await.expect("Error registering agent");
        self.profiles.report_agent_location(agent_id, location).await.expect("Error reporting location")
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn tear_down(self) {
        tear_down(self.db).await;
    }
}

pub fn matcher() -> DeliveryMatcher {
    DeliveryMatcher::new(Arc::new(HaversineRouter::default()), DEFAULT_MATCH_RADIUS_KM)
}

pub fn start_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-01T09:30:00Z").map(|t| t.with_timezone(&Utc)).unwrap()
}

/// Push and SMS sender that records everything it is asked to send. Tokens in `rejected` are reported as invalid.
#[derive(Clone, Default)]
pub struct RecordingSender {
    pub pushes: Arc<Mutex<Vec<(String, Notification)>>>,
    pub texts: Arc<Mutex<Vec<(String, String)>>>,
    pub rejected: Arc<Mutex<HashSet<String>>>,
}

impl RecordingSender {
    pub fn reject_token(&self, token: &str) {
        self.rejected.lock().unwrap().insert(token.to_string());
    }

    pub fn pushes(&self) -> Vec<(String, Notification)> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<(String, String)> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushSender for RecordingSender {
    async fn send_push(&self, token: &str, message: &Notification) -> Result<(), SendError> {
        if self.rejected.lock().unwrap().contains(token) {
            return Err(SendError::InvalidToken);
        }
        self.pushes.lock().unwrap().push((token.to_string(), message.clone()));
        Ok(())
    }
}

#[async_trait]
impl SmsSender for RecordingSender {
    async fn send_sms(&self, number: &str, text: &str) -> Result<(), SendError> {
        self.texts.lock().unwrap().push((number.to_string(), text.to_string()));
        Ok(())
    }
}
