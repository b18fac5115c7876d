//! # Mandi delivery gateway server
//! This crate hosts the HTTP surface of the delivery gateway. It is responsible for:
//! * Receiving payment confirmations from the payment gateway and turning them into orders.
//! * Exposing the delivery lifecycle to the agent and retailer apps: quotes, accept, pickup, code issue and
//!   verification.
//! * Maintaining agent locations, party profiles and the push token registry.
//! * Running the periodic delivery code expiry sweep.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: The lifecycle, query and profile routes. See [routes](routes/index.html).
//! * `/webhook/payment_confirmed`: The payment gateway webhook. Requests are signed with HMAC-SHA256 when checks are
//!   enabled.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;

pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
