use std::collections::HashMap;

use cucumber::World;
use dispatch_engine::{
    db_types::{DeliveryCharges, Order, OrderId},
    DispatchError,
};

use crate::support::fixtures::TestSystem;

#[derive(Debug, Default, World)]
pub struct DeliveryWorld {
    pub system: Option<TestSystem>,
    /// Orders created in the scenario, keyed by payment id. Cart orders are in line order.
    pub orders: HashMap<String, Vec<OrderId>>,
    /// The most recent delivery code for each order.
    pub codes: HashMap<OrderId, String>,
    pub last_error: Option<DispatchError>,
    pub quote: Option<DeliveryCharges>,
}

impl DeliveryWorld {
    pub fn system(&self) -> &TestSystem {
        self.system.as_ref().expect("The system has not been set up. Start with 'Given a fresh install'")
    }

    pub fn order_id(&self, payment_id: &str) -> OrderId {
        self.orders
            .get(payment_id)
            .and_then(|ids| ids.first())
            .cloned()
            .unwrap_or_else(|| panic!("No order was created for payment {payment_id}"))
    }

    pub async fn order(&self, payment_id: &str) -> Order {
        let order_id = self.order_id(payment_id);
        self.system().query.fetch_order(&order_id).await.expect("Error fetching order")
    }

    /// Records the outcome of an operation so that a later step can check it.
    pub fn record<T>(&mut self, result: Result<T, DispatchError>) -> Option<T> {
        match result {
            Ok(v) => {
                self.last_error = None;
                Some(v)
            },
            Err(e) => {
                self.last_error = Some(e);
                None
            },
        }
    }
}

pub fn error_kind(err: &DispatchError) -> &'static str {
    match err {
        DispatchError::InvalidState { .. } => "InvalidState",
        DispatchError::OrderNotFound(_) => "OrderNotFound",
        DispatchError::AgentProfileMissing(_) => "AgentProfileMissing",
        DispatchError::AgentNotAssigned(_) => "AgentNotAssigned",
        DispatchError::OutOfRange { .. } => "OutOfRange",
        DispatchError::Geo(_) => "GeoError",
        DispatchError::Pricing(_) => "PricingError",
        DispatchError::WrongCode(_) => "WrongCode",
        DispatchError::CodeExpired(_) => "CodeExpired",
        DispatchError::IncompleteOrderData(_) => "IncompleteOrderData",
        DispatchError::InvalidRequest(_) => "InvalidRequest",
        DispatchError::DatabaseError(_) => "DatabaseError",
    }
}
