//! # Storage contracts
//!
//! This module defines the behaviour that a storage *backend* must expose to the dispatch engine. The engine APIs are
//! generic over these traits, so the lifecycle rules never depend on a particular database.
//!
//! * [`OrderManagement`] is the read side: fetching and searching orders. The query APIs only need this trait.
//! * [`AgentManagement`] stores delivery agent profiles and their live locations.
//! * [`PartyManagement`] stores wholesaler and retailer profiles and the push token registry.
//! * [`DispatchDatabase`] is the highest level of behaviour: idempotent order creation and the atomic, status-guarded
//!   transitions that drive the order lifecycle.
//!
//! Backends must guarantee that [`DispatchDatabase::apply_transition`] is a single atomic compare-and-swap on the
//! order status, with the history entries written in the same transaction.
mod agent_management;
mod data_objects;
mod dispatch_database;
mod order_management;
mod party_management;

pub use agent_management::AgentManagement;
pub use data_objects::{InsertOrderResult, OrderQueryFilter, StatusTransition};
pub use dispatch_database::DispatchDatabase;
pub use order_management::{OrderManagement, StoreError};
pub use party_management::PartyManagement;
