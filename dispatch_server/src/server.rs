use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use courier_tools::{FcmPushSender, OsrmRouter, SmsGateway};
use dispatch_engine::{
    events::{EventHandlers, EventProducers},
    geo::{HaversineRouter, RouteProvider},
    notifications::{LogOnlySender, NotificationDispatch, PushSender, SmsSender},
    DeliveryMatcher,
    DeliveryQuoter,
    OrderLifecycleApi,
    OrderQueryApi,
    PaymentIntakeApi,
    PricingEngine,
    ProfileApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    config::{RoutingMode, ServerConfig, PAYMENT_SIGNATURE_HEADER},
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    middleware::HmacMiddlewareFactory,
    routes::{
        health,
        quote,
        AcceptOrderRoute,
        ActiveOrdersRoute,
        AgentByIdRoute,
        AgentLocationRoute,
        AvailableOrdersRoute,
        DeliveryCodeRoute,
        OrderByIdRoute,
        PartyByIdRoute,
        PaymentConfirmedRoute,
        PickupOrderRoute,
        RegisterAgentRoute,
        RegisterPartyRoute,
        SavePushTokenRoute,
        VerifyCodeRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 64;
const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let router = build_route_provider(&config)?;
    let matcher = DeliveryMatcher::new(router.clone(), config.match_radius_km);
    let notifier = NotificationDispatch::new(db.clone(), push_sender(&config)?, sms_sender(&config)?, matcher.clone());
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, notifier.into_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let sweeper = OrderLifecycleApi::new(db.clone(), producers.clone(), matcher.clone(), config.rules);
    let _worker = start_expiry_worker(sweeper, config.expiry_sweep_interval);
    let srv = create_server_instance(config, db, producers, router)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    router: Arc<dyn RouteProvider>,
) -> Result<Server, ServerError> {
    let matcher = DeliveryMatcher::new(router.clone(), config.match_radius_km);
    let quoter = DeliveryQuoter::new(router, PricingEngine::new(config.pricing.clone()));
    let srv = HttpServer::new(move || {
        let lifecycle_api =
            OrderLifecycleApi::new(db.clone(), producers.clone(), matcher.clone(), config.rules);
        let query_api = OrderQueryApi::new(db.clone(), config.rules.delivered_visibility);
        let intake_api = PaymentIntakeApi::new(db.clone(), producers.clone());
        let profile_api = ProfileApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mdg::access_log"))
            .app_data(web::Data::new(lifecycle_api))
            .app_data(web::Data::new(query_api))
            .app_data(web::Data::new(profile_api))
            .app_data(web::Data::new(quoter.clone()));
        let api_scope = web::scope("/api")
            .service(quote)
            .service(AcceptOrderRoute::<SqliteDatabase>::new())
            .service(PickupOrderRoute::<SqliteDatabase>::new())
            .service(DeliveryCodeRoute::<SqliteDatabase>::new())
            .service(VerifyCodeRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(ActiveOrdersRoute::<SqliteDatabase>::new())
            .service(AvailableOrdersRoute::<SqliteDatabase>::new())
            .service(RegisterAgentRoute::<SqliteDatabase>::new())
            .service(AgentByIdRoute::<SqliteDatabase>::new())
            .service(AgentLocationRoute::<SqliteDatabase>::new())
            .service(RegisterPartyRoute::<SqliteDatabase>::new())
            .service(PartyByIdRoute::<SqliteDatabase>::new())
            .service(SavePushTokenRoute::<SqliteDatabase>::new());
        let hmac = HmacMiddlewareFactory::new(
            PAYMENT_SIGNATURE_HEADER,
            config.payment_webhook.hmac_secret.clone(),
            config.payment_webhook.hmac_checks,
        );
        let webhook_scope = web::scope("/webhook")
            .app_data(web::Data::new(intake_api))
            .wrap(hmac)
            .service(PaymentConfirmedRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// The one distance metric used for both pricing and matching.
pub fn build_route_provider(config: &ServerConfig) -> Result<Arc<dyn RouteProvider>, ServerError> {
    match config.routing {
        RoutingMode::Haversine => {
            info!("🗺️ Using straight-line distances at {} km/h", config.average_speed_kmh);
            Ok(Arc::new(HaversineRouter::new(config.average_speed_kmh)))
        },
        RoutingMode::Osrm => {
            info!("🗺️ Using road distances from {}", config.osrm.osrm_url);
            let router = OsrmRouter::new(config.osrm.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
            Ok(Arc::new(router))
        },
    }
}

fn push_sender(config: &ServerConfig) -> Result<Arc<dyn PushSender>, ServerError> {
    if config.fcm.is_configured() {
        let sender = FcmPushSender::new(&config.fcm, NOTIFICATION_TIMEOUT)
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Arc::new(sender))
    } else {
        warn!("🔔️ FCM is not configured. Push notifications will only be logged.");
        Ok(Arc::new(LogOnlySender))
    }
}

fn sms_sender(config: &ServerConfig) -> Result<Arc<dyn SmsSender>, ServerError> {
    if config.sms.is_configured() {
        let sender =
            SmsGateway::new(&config.sms, NOTIFICATION_TIMEOUT).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Arc::new(sender))
    } else {
        warn!("🔔️ No SMS gateway is configured. Delivery codes will not reach retailers.");
        Ok(Arc::new(LogOnlySender))
    }
}
