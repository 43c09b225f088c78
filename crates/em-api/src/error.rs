//! Maps `AppError` onto the HTTP surface. Every handled failure becomes a
//! structured `{status:"failed", message}` body; internals are redacted in
//! release builds.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use em_core::error::AppError;

#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            AppError::NotFound(_, _) => StatusCode::NOT_FOUND,
            AppError::Gone(_) => StatusCode::GONE,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::CapacityExceeded(_)
            | AppError::InvalidInput(_)
            | AppError::RenewalLimitExceeded => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match &self.0 {
            AppError::Internal(detail) => {
                log::error!("internal error surfaced to client: {detail}");
                if cfg!(debug_assertions) {
                    self.0.to_string()
                } else {
                    "internal service error".to_string()
                }
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "status": "failed", "message": message }))
    }
}
