use thiserror::Error;

#[derive(Debug, Error)]
pub enum CourierApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Request could not be sent: {0}")]
    RequestError(String),
    #[error("Invalid response: {0}")]
    ResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl CourierApiError {
    /// Transport failures and server-side errors are worth one more attempt. Client errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            CourierApiError::RequestError(_) | CourierApiError::ResponseError(_) => true,
            CourierApiError::QueryError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
