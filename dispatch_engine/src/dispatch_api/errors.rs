use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType},
    geo::GeoError,
    matcher::MatchError,
    pricing::PricingError,
    traits::StoreError,
};

#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("Order {order_id} is {status}, so it cannot be {action}.")]
    InvalidState { order_id: OrderId, status: OrderStatusType, action: String },
    #[error("Order {0} does not exist.")]
    OrderNotFound(OrderId),
    #[error("Delivery agent profile problem. {0}")]
    AgentProfileMissing(String),
    #[error("No delivery agent has been assigned to order {0}.")]
    AgentNotAssigned(OrderId),
    #[error("The pickup point is {distance_km:.1} km away, outside the {radius_km:.1} km delivery radius.")]
    OutOfRange { distance_km: f64, radius_km: f64 },
    #[error("{0}")]
    Geo(#[from] GeoError),
    #[error("{0}")]
    Pricing(#[from] PricingError),
    #[error("The delivery code for order {0} is incorrect.")]
    WrongCode(OrderId),
    #[error("The delivery code for order {0} has expired. A new code must be generated.")]
    CodeExpired(OrderId),
    #[error("Incomplete order data. {0}")]
    IncompleteOrderData(String),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    DatabaseError(#[from] StoreError),
}

impl DispatchError {
    pub fn invalid_state<S: Into<String>>(order_id: &OrderId, status: OrderStatusType, action: S) -> Self {
        Self::InvalidState { order_id: order_id.clone(), status, action: action.into() }
    }
}

impl From<MatchError> for DispatchError {
    fn from(e: MatchError) -> Self {
        match e {
            MatchError::NoLiveLocation(agent_id) => {
                Self::AgentProfileMissing(format!("Agent {agent_id} has not reported a live location."))
            },
            MatchError::OutOfRange { distance_km, radius_km } => Self::OutOfRange { distance_km, radius_km },
            MatchError::Geo(e) => Self::Geo(e),
        }
    }
}
