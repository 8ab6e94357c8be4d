use analytics::AnalyticsError;
use api_client::error::ApiError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_types::{ActionResult, CoreError};
use database::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Auth service error: {0}")]
    Auth(#[from] ApiError),
    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error(transparent)]
    Validation(#[from] CoreError),
    #[error("You must be signed in.")]
    Unauthenticated,
    #[error("Your session has expired. Please sign in again.")]
    SessionExpired,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Converts our custom `AppError` into the `{ success: false, error }` envelope.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(DbError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, format!("{} not found", what))
            }
            AppError::Database(DbError::Validation(e)) | AppError::Validation(e) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            AppError::Database(DbError::Conflict(message)) => (StatusCode::CONFLICT, message),
            AppError::Database(db_err) => {
                tracing::error!(error = ?db_err, "Database error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal database error occurred".to_string(),
                )
            }
            AppError::Auth(ApiError::Rejected(code, message)) => {
                let status = if code == 401 || code == 403 {
                    StatusCode::UNAUTHORIZED
                } else {
                    StatusCode::BAD_REQUEST
                };
                (status, message)
            }
            AppError::Auth(api_err) => {
                tracing::error!(error = ?api_err, "Auth service error.");
                (
                    StatusCode::BAD_GATEWAY,
                    "The authentication service is unavailable. Please try again.".to_string(),
                )
            }
            AppError::Analytics(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            e @ (AppError::Unauthenticated | AppError::SessionExpired) => {
                (StatusCode::UNAUTHORIZED, e.to_string())
            }
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AppError::Internal(detail) => {
                tracing::error!(%detail, "Internal error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again.".to_string(),
                )
            }
        };

        let body = Json(ActionResult::<()>::err(error_message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn domain_errors_map_to_client_statuses() {
        assert_eq!(status_of(DbError::not_found("Entry").into()), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(DbError::Validation(CoreError::invalid("x", "bad")).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(DbError::Conflict("dup".into()).into()), StatusCode::CONFLICT);
        assert_eq!(status_of(AppError::Unauthenticated), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn upstream_failures_do_not_leak_details() {
        let err: AppError = ApiError::Upstream(503, "pg connection refused".into()).into();
        assert_eq!(status_of(err), StatusCode::BAD_GATEWAY);
        let rejected: AppError = ApiError::Rejected(400, "Invalid login credentials".into()).into();
        assert_eq!(status_of(rejected), StatusCode::BAD_REQUEST);
    }
}
