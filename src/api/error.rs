use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::api::models::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Unknown visitor")]
    UnknownVisitor,

    #[error("Failed to record session")]
    Session,

    #[error("Failed to process query")]
    Query,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownVisitor => StatusCode::NOT_FOUND,
            ApiError::Session | ApiError::Query => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}
