//! Clients for the services the dispatch engine consumes but does not own:
//! * [`OsrmRouter`], a road-network [`RouteProvider`](dispatch_engine::geo::RouteProvider) backed by an OSRM-compatible
//!   routing service.
//! * [`FcmPushSender`], a [`PushSender`](dispatch_engine::notifications::PushSender) for the FCM HTTP v1 API.
//! * [`SmsGateway`], an [`SmsSender`](dispatch_engine::notifications::SmsSender) for a JSON SMS gateway.
mod api;
mod config;
mod error;
mod fcm;
mod helpers;
mod osrm;
mod sms;

mod data_objects;

pub use api::CourierClient;
pub use config::{FcmConfig, RoutingConfig, SmsConfig};
pub use data_objects::{FcmErrorResponse, OsrmResponse, OsrmRoute};
pub use error::CourierApiError;
pub use fcm::FcmPushSender;
pub use helpers::{is_invalid_token_error, route_estimate_from_osrm};
pub use osrm::OsrmRouter;
pub use sms::SmsGateway;
