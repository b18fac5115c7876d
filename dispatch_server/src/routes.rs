//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every storage and routing call is therefore awaited, never blocked
//! on.
//!
//! | Route | Operation |
//! |---|---|
//! | `GET /health` | liveness |
//! | `POST /api/quote` | quote a delivery |
//! | `POST /api/orders/{order_id}/accept` | accept an order |
//! | `POST /api/orders/{order_id}/pickup` | pick up an order |
//! | `POST /api/orders/{order_id}/delivery_code` | issue a delivery code |
//! | `POST /api/orders/{order_id}/verify` | verify a delivery code |
//! | `GET /api/order/{order_id}` | fetch one order |
//! | `GET /api/orders/{role}/{party_key}` | active orders for a party |
//! | `GET /api/agents/{agent_id}/available_orders` | orders an agent can take |
//! | `POST /api/agents`, `GET /api/agents/{agent_id}` | agent profiles |
//! | `POST /api/agents/{agent_id}/location` | live location report |
//! | `POST /api/parties`, `GET /api/parties/{role}/{party_id}` | wholesaler and retailer profiles |
//! | `POST /api/push_tokens` | register a push token |
//! | `POST /webhook/payment_confirmed` | payment confirmation |
use std::str::FromStr;

use actix_web::{get, post, web, HttpResponse, Responder};
use dispatch_engine::{
    db_types::{NewAgentProfile, NewPartyProfile, OrderId, PartyRole},
    DeliveryQuoter,
    DispatchDatabase,
    OrderLifecycleApi,
    OrderManagement,
    OrderQueryApi,
    PaymentConfirmation,
    PaymentIntakeApi,
    ProfileApi,
    QuoteRequest,
};
use log::*;

use crate::{
    data_objects::{AgentRequest, ApiResponse, JsonResponse, LocationReport, PushTokenRequest, VerifyCodeRequest},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $bound:path) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>); }
        paste::paste! {
            impl<B> [<$name:camel Route>]<B> {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self {
                    Self(core::marker::PhantomData::<fn() -> B>)
                }
            }
        }
        paste::paste! {
            impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
            where B: $bound + 'static
            {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name::<B>);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Quote  ----------------------------------------------------
/// `quoteDelivery`. Prices a delivery from the wholesaler's location to the retailer's before checkout.
#[post("/quote")]
pub async fn quote(
    body: web::Json<QuoteRequest>,
    quoter: web::Data<DeliveryQuoter>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ Quote request for {} by {}", request.order_amount, request.vehicle_tier);
    let quote = quoter.quote_delivery(request).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(quote)))
}

//----------------------------------------------   Lifecycle  ----------------------------------------------------
route!(accept_order => Post "/orders/{order_id}/accept" impl DispatchDatabase);
pub async fn accept_order<B: DispatchDatabase>(
    path: web::Path<String>,
    body: web::Json<AgentRequest>,
    api: web::Data<OrderLifecycleApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ Agent {} wants to accept order {order_id}", body.agent_id);
    let order = api.accept_order(&order_id, &body.agent_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(order)))
}

route!(pickup_order => Post "/orders/{order_id}/pickup" impl DispatchDatabase);
pub async fn pickup_order<B: DispatchDatabase>(
    path: web::Path<String>,
    body: web::Json<AgentRequest>,
    api: web::Data<OrderLifecycleApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ Agent {} is picking up order {order_id}", body.agent_id);
    let order = api.pickup_order(&order_id, &body.agent_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(order)))
}

route!(delivery_code => Post "/orders/{order_id}/delivery_code" impl DispatchDatabase);
/// Issues a new delivery code. The code goes to the retailer by SMS only; the response carries the order and the
/// code's expiry time.
pub async fn delivery_code<B: DispatchDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderLifecycleApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ Delivery code requested for order {order_id}");
    let issued = api.generate_delivery_code(&order_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(issued)))
}

route!(verify_code => Post "/orders/{order_id}/verify" impl DispatchDatabase);
pub async fn verify_code<B: DispatchDatabase>(
    path: web::Path<String>,
    body: web::Json<VerifyCodeRequest>,
    api: web::Data<OrderLifecycleApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ Verifying delivery code for order {order_id}");
    let order = api.verify_delivery_code(&order_id, &body.code).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(order)))
}

route!(available_orders => Get "/agents/{agent_id}/available_orders" impl DispatchDatabase);
pub async fn available_orders<B: DispatchDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderLifecycleApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let agent_id = path.into_inner();
    trace!("💻️ Available orders requested by agent {agent_id}");
    let orders = api.list_available_orders(&agent_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(orders)))
}

//----------------------------------------------   Queries  ----------------------------------------------------
route!(order_by_id => Get "/order/{order_id}" impl OrderManagement);
pub async fn order_by_id<B: OrderManagement>(
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    trace!("💻️ Fetching order {order_id}");
    let order = api.fetch_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(order)))
}

route!(active_orders => Get "/orders/{role}/{party_key}" impl OrderManagement);
/// `listActiveOrders`. `party_key` is the party's id; retailers may also be looked up by mobile number.
pub async fn active_orders<B: OrderManagement>(
    path: web::Path<(String, String)>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (role, party_key) = path.into_inner();
    let role = PartyRole::from_str(&role).map_err(|e| ServerError::InvalidRequestPath(e.to_string()))?;
    trace!("💻️ Active orders requested for {role} {party_key}");
    let orders = api.list_active_orders(role, &party_key).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(orders)))
}

//----------------------------------------------   Profiles  ----------------------------------------------------
route!(register_agent => Post "/agents" impl DispatchDatabase);
pub async fn register_agent<B: DispatchDatabase>(
    body: web::Json<NewAgentProfile>,
    api: web::Data<ProfileApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let profile = api.register_agent(body.into_inner()).await?;
    debug!("💻️ Agent {} registered", profile.agent_id);
    Ok(HttpResponse::Ok().json(ApiResponse::ok(profile)))
}

route!(agent_by_id => Get "/agents/{agent_id}" impl DispatchDatabase);
pub async fn agent_by_id<B: DispatchDatabase>(
    path: web::Path<String>,
    api: web::Data<ProfileApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let profile = api.fetch_agent(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(profile)))
}

route!(agent_location => Post "/agents/{agent_id}/location" impl DispatchDatabase);
pub async fn agent_location<B: DispatchDatabase>(
    path: web::Path<String>,
    body: web::Json<LocationReport>,
    api: web::Data<ProfileApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let agent_id = path.into_inner();
    let profile = api.report_agent_location(&agent_id, body.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(profile)))
}

route!(register_party => Post "/parties" impl DispatchDatabase);
pub async fn register_party<B: DispatchDatabase>(
    body: web::Json<NewPartyProfile>,
    api: web::Data<ProfileApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let profile = api.register_party(body.into_inner()).await?;
    debug!("💻️ {} {} registered", profile.role, profile.party_id);
    Ok(HttpResponse::Ok().json(ApiResponse::ok(profile)))
}

route!(party_by_id => Get "/parties/{role}/{party_id}" impl DispatchDatabase);
pub async fn party_by_id<B: DispatchDatabase>(
    path: web::Path<(String, String)>,
    api: web::Data<ProfileApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (role, party_id) = path.into_inner();
    let role = PartyRole::from_str(&role).map_err(|e| ServerError::InvalidRequestPath(e.to_string()))?;
    let profile = api
        .fetch_party(role, &party_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No profile for {role} {party_id}")))?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(profile)))
}

route!(save_push_token => Post "/push_tokens" impl DispatchDatabase);
pub async fn save_push_token<B: DispatchDatabase>(
    body: web::Json<PushTokenRequest>,
    api: web::Data<ProfileApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let PushTokenRequest { role, party_id, token } = body.into_inner();
    api.save_push_token(role, &party_id, &token).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Token saved")))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(payment_confirmed => Post "/payment_confirmed" impl DispatchDatabase);
/// `onPaymentConfirmed`. Safe to call more than once for the same payment: repeats return the orders created the
/// first time with a `duplicate` result.
pub async fn payment_confirmed<B: DispatchDatabase>(
    body: web::Json<PaymentConfirmation>,
    api: web::Data<PaymentIntakeApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let event = body.into_inner();
    info!("💻️ Payment confirmation received for {}", event.payment_id);
    let result = api.on_payment_confirmed(event).await.map_err(|e| {
        warn!("💻️ Payment confirmation could not be processed. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(result)))
}
