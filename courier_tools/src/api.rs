use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::CourierApiError;

/// A thin JSON client shared by the routing, push and SMS integrations.
#[derive(Clone)]
pub struct CourierClient {
    client: Arc<Client>,
}

impl CourierClient {
    pub fn new(timeout: Duration) -> Result<Self, CourierApiError> {
        Self::with_headers(timeout, HeaderMap::new())
    }

    /// A client that sends `Authorization: Bearer {token}` with every request.
    pub fn with_bearer_token(timeout: Duration, token: &str) -> Result<Self, CourierApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let val = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| CourierApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        Self::with_headers(timeout, headers)
    }

    pub fn with_headers(timeout: Duration, mut headers: HeaderMap) -> Result<Self, CourierApiError> {
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| CourierApiError::Initialization(e.to_string()))?;
        Ok(Self { client: Arc::new(client) })
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, CourierApiError> {
        trace!("Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| CourierApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| CourierApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| CourierApiError::ResponseError(e.to_string()))?;
            Err(CourierApiError::QueryError { status, message })
        }
    }
}
