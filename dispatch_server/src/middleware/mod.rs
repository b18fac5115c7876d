mod hmac;

pub use hmac::{check_signature, HmacMiddlewareFactory, HmacMiddlewareService, Rejection};
