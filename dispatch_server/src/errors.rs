use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use dispatch_engine::{geo::GeoError, DispatchError};
use log::error;
use thiserror::Error;

use crate::data_objects::JsonResponse;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    Dispatch(#[from] DispatchError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Dispatch(e) => match e {
                DispatchError::InvalidState { .. } => StatusCode::CONFLICT,
                DispatchError::AgentNotAssigned(_) => StatusCode::CONFLICT,
                DispatchError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                DispatchError::AgentProfileMissing(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DispatchError::OutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                DispatchError::WrongCode(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DispatchError::CodeExpired(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DispatchError::IncompleteOrderData(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DispatchError::Geo(GeoError::InvalidLocation(_)) => StatusCode::BAD_REQUEST,
                DispatchError::Geo(GeoError::RouteUnavailable(_)) => StatusCode::BAD_GATEWAY,
                DispatchError::Pricing(_) => StatusCode::BAD_REQUEST,
                DispatchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                DispatchError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("💻️ {self}");
        }
        HttpResponse::build(status).insert_header(ContentType::json()).json(JsonResponse::failure(self))
    }
}
