use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::result::DatabaseErrorKind;
use serde::Serialize;
use utoipa::ToSchema;

/// Message shown when the database cannot be reached.
const DB_UNAVAILABLE_MESSAGE: &str =
    "Layanan basis data sedang tidak tersedia, silakan coba beberapa saat lagi";

/// Envelope returned to clients on failure.
///
/// `status` is `"fail"` for client errors and `"error"` for server errors.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    pub status: String,
    pub data: Vec<FieldError>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Application-level error type that converts into an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub field: String,
    pub message: String,
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn new(status: StatusCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            field: field.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, field, message)
    }

    pub fn unauthorized(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, field, message)
    }

    pub fn forbidden(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, field, message)
    }

    pub fn not_found(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, field, message)
    }

    pub fn conflict(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, field, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "server", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "server", message)
    }

    pub fn validation(details: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            field: "body".to_string(),
            message: "Validation failed".to_string(),
            details: Some(details),
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status == StatusCode::CONFLICT
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status.as_u16(), self.field, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.status.is_server_error() {
            "error"
        } else {
            "fail"
        };
        let data = self.details.unwrap_or_else(|| {
            vec![FieldError {
                field: self.field,
                message: self.message,
            }]
        });
        let body = ApiErrorBody {
            status: status.to_string(),
            data,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info) => {
                tracing::warn!(constraint = ?info.constraint_name(), "unique violation");
                Self::conflict("database", "Record already exists")
            }
            diesel::result::Error::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
                tracing::error!(?err, "database connection closed");
                Self::unavailable(DB_UNAVAILABLE_MESSAGE)
            }
            other => {
                tracing::error!(err = ?other, "database error");
                Self::internal("An internal error occurred")
            }
        }
    }
}

impl From<diesel_async::pooled_connection::deadpool::PoolError> for ApiError {
    fn from(err: diesel_async::pooled_connection::deadpool::PoolError) -> Self {
        use diesel_async::pooled_connection::deadpool::PoolError;
        use diesel_async::pooled_connection::PoolError as BackendError;

        match err {
            PoolError::Backend(BackendError::QueryError(e)) => Self::from(e),
            PoolError::Backend(BackendError::ConnectionError(e)) => {
                tracing::error!(err = ?e, "database unreachable");
                Self::unavailable(DB_UNAVAILABLE_MESSAGE)
            }
            PoolError::Timeout(kind) => {
                tracing::error!(?kind, "database pool timeout");
                Self::unavailable(DB_UNAVAILABLE_MESSAGE)
            }
            PoolError::Closed => {
                tracing::error!("database pool closed");
                Self::unavailable(DB_UNAVAILABLE_MESSAGE)
            }
            other => {
                tracing::error!(err = ?other, "pool error");
                Self::internal("An internal error occurred")
            }
        }
    }
}
