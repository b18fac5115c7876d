//! HMAC middleware for Actix Web.
//!
//! The payment gateway signs each webhook call with HMAC-SHA256 over the raw request body, using the shared
//! `MDG_PAYMENT_HMAC_SECRET`. The base64 signature arrives in the `X-Payment-Signature` header.
//!
//! Wrap the webhook scope with [`HmacMiddlewareFactory`] to reject calls whose signature is missing or wrong. The body is
//! buffered for the check and handed on to the route untouched.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorForbidden},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use mdg_common::Secret;
use thiserror::Error;

use crate::helpers::verify_hmac;

pub struct HmacMiddlewareFactory {
    hmac_header: String,
    key: Secret<String>,
    // When false every call is let through unchecked
    enabled: bool,
}

impl HmacMiddlewareFactory {
    pub fn new(hmac_header: &str, key: Secret<String>, enabled: bool) -> Self {
        HmacMiddlewareFactory { hmac_header: hmac_header.into(), key, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = HmacMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HmacMiddlewareService {
            hmac_header: self.hmac_header.clone(),
            key: self.key.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct HmacMiddlewareService<S> {
    hmac_header: String,
    key: Secret<String>,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for HmacMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let key = self.key.clone();
        let hmac_header = self.hmac_header.clone();
        let enabled = self.enabled;
        Box::pin(async move {
            if !enabled {
                trace!("🔐️ Webhook signature checks are disabled");
                return service.call(req).await;
            }
            let body = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Could not read the webhook body. {e}");
                ErrorBadRequest("Failed to extract request data.")
            })?;
            let signature = req.headers().get(&hmac_header).and_then(|v| v.to_str().ok());
            if let Err(rejection) = check_signature(key.reveal(), signature, &body) {
                warn!("🔐️ Webhook call to {} rejected. {rejection}", req.path());
                return Err(ErrorForbidden(rejection.to_string()));
            }
            trace!("🔐️ Webhook signature is valid");
            req.set_payload(bytes_to_payload(body));
            service.call(req).await
        })
    }
}

/// Why a webhook call was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Webhook signatures cannot be checked.")]
    NoSecret,
    #[error("No HMAC signature found.")]
    MissingSignature,
    #[error("Invalid HMAC signature.")]
    BadSignature,
}

/// An empty secret rejects every call rather than accepting unsigned ones.
pub fn check_signature(secret: &str, signature: Option<&str>, body: &[u8]) -> Result<(), Rejection> {
    if secret.is_empty() {
        return Err(Rejection::NoSecret);
    }
    let signature = signature.ok_or(Rejection::MissingSignature)?;
    if verify_hmac(secret, body, signature) {
        Ok(())
    } else {
        Err(Rejection::BadSignature)
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
