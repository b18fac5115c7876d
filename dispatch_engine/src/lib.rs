//! Mandi delivery dispatch engine
//!
//! The dispatch engine is the core of a wholesaler / retailer / delivery agent marketplace. Once a payment is confirmed
//! it owns the order: pricing the delivery, finding agents nearby, and moving the order through its delivery states up
//! to the one-time-code handoff at the retailer's door.
//!
//! The library is divided into these main sections:
//! 1. Storage ([`mod@traits`] and [`mod@sqlite`]). The APIs are generic over the traits in `traits`; `SqliteDatabase`
//!    is the bundled backend. The data types shared with backends live in [`mod@db_types`].
//! 2. The algorithms: [`mod@geo`] (distance and travel time), [`mod@pricing`] (delivery charges and the
//!    retailer/wholesaler split) and [`mod@matcher`] (radius matching of agents).
//! 3. The public API ([`mod@dispatch_api`]): order lifecycle, payment intake, quotes, read-side views and profiles.
//! 4. [`mod@notifications`], which reacts to the engine's events (see [`mod@events`]) with push and SMS messages.
pub mod db_types;
pub mod dispatch_api;
pub mod events;
pub mod geo;
pub mod helpers;
pub mod matcher;
pub mod notifications;
pub mod pricing;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use dispatch_api::{
    errors::DispatchError,
    lifecycle_api::{IssuedDeliveryCode, OrderLifecycleApi},
    order_query_api::OrderQueryApi,
    payment_intake_api::PaymentIntakeApi,
    payment_objects::{LineItem, PaymentConfirmation, PaymentIntakeResult, PaymentMetadata, Purchase},
    profile_api::ProfileApi,
    quote_api::{DeliveryQuote, DeliveryQuoter, QuoteRequest},
    rules::DispatchRules,
};
pub use matcher::{DeliveryMatcher, EligibleAgent, MatchError};
pub use notifications::NotificationDispatch;
pub use pricing::{PricingConfig, PricingEngine, PricingError};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    AgentManagement,
    DispatchDatabase,
    InsertOrderResult,
    OrderManagement,
    PartyManagement,
    StoreError,
};
