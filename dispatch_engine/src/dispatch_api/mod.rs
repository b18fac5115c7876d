//! # Dispatch engine public API
//!
//! The `dispatch_api` module exposes the programmatic API of the engine. Each API is a small struct that wraps a
//! storage backend and only asks for the backend traits it actually needs.
//!
//! * [`lifecycle_api`] drives orders through acceptance, pickup, code issue and verification, and runs the expiry
//!   sweep.
//! * [`order_query_api`] provides the read-side views (`listActiveOrders`, single order lookups).
//! * [`payment_intake_api`] turns confirmed payments into orders, idempotently.
//! * [`quote_api`] prices a delivery before checkout.
//! * [`profile_api`] maintains agent and party profiles, live locations and push tokens.
//!
//! # API usage
//!
//! ```rust,ignore
//! use dispatch_engine::{OrderQueryApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/mdg.db", 5).await?;
//! let api = OrderQueryApi::new(db, chrono::Duration::minutes(10));
//! let orders = api.list_active_orders(PartyRole::Retailer, "9876543210").await?;
//! ```
pub mod errors;
pub mod lifecycle_api;
pub mod order_query_api;
pub mod payment_intake_api;
pub mod payment_objects;
pub mod profile_api;
pub mod quote_api;
pub mod rules;
