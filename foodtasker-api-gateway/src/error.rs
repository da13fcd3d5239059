use axum::extract::rejection::{FormRejection, PathRejection, QueryRejection};
use axum::{http::StatusCode, response::Json};
use foodtasker_order_service::error::{Conflict, ServiceError};
use foodtasker_order_service::models::Role;
use serde_json::json;
use tracing::error;

use crate::identity::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Unauthorized(#[from] AuthError),
    #[error("This endpoint requires a {0} account")]
    Forbidden(Role),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Conflict(Conflict),
    #[error("Service unavailable")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => ApiError::BadRequest(msg),
            ServiceError::Conflict(conflict) => ApiError::Conflict(conflict),
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::Store(e) => ApiError::ServiceUnavailable(e.to_string()),
        }
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(detail) => {
                error!(detail = %detail, "storage failure");
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        let body = Json(json!({
            "status": "failed",
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
