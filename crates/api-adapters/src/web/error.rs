//! Translation of domain errors into HTTP responses.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::AppError;

use crate::dto::ErrorBody;

/// Wrapper that lets handlers return `AppError` through `?`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self(error)
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            AppError::NotFound(..) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let body = match self.0 {
            AppError::ValidationError(errors) => ErrorBody {
                error: kind,
                message: "Invalid input.".to_string(),
                fields: errors.fields().to_vec(),
            },
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                ErrorBody {
                    error: kind,
                    message: "internal server error".to_string(),
                    fields: Vec::new(),
                }
            }
            other => ErrorBody {
                error: kind,
                message: other.to_string(),
                fields: Vec::new(),
            },
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
