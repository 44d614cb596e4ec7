use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

/// Stable machine-readable error codes carried in every error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    UserAlreadyExists,
    UserNotFound,
    IncorrectPassword,
    Unauthorized,
    Forbidden,
    EventNotFound,
    BookingNotFound,
    NotEnoughTicket,
    EventIsInThePast,
    InsufficientTicketCount,
    ValidationError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UserAlreadyExists => "USER_ALREADY_EXISTS",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::IncorrectPassword => "INCORRECT_PASSWORD",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::EventNotFound => "EVENT_NOT_FOUND",
            ErrorCode::BookingNotFound => "BOOKING_NOT_FOUND",
            ErrorCode::NotEnoughTicket => "NOT_ENOUGH_TICKET",
            ErrorCode::EventIsInThePast => "EVENT_IS_IN_THE_PAST",
            ErrorCode::InsufficientTicketCount => "INSUFFICIENT_TICKET_COUNT",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// Domain error taxonomy, mapped to transport status codes at the boundary.
///
/// Any error raised inside a database transaction aborts that transaction;
/// callers bubble these with `?` and the dropped transaction rolls back.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest {
        code: ErrorCode,
        message: String,
        details: Option<Value>,
    },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("{message}")]
    NotFound { code: ErrorCode, message: String },

    #[error("{message}")]
    Conflict { code: ErrorCode, message: String },

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        ApiError::BadRequest {
            code: ErrorCode::ValidationError,
            message: "Invalid request body".to_string(),
            details: serde_json::to_value(&errors).ok(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden {
            message: message.into(),
        }
    }

    pub fn not_found(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::BadRequest { code, .. }
            | ApiError::NotFound { code, .. }
            | ApiError::Conflict { code, .. } => *code,
            ApiError::Unauthorized { .. } => ErrorCode::Unauthorized,
            ApiError::Forbidden { .. } => ErrorCode::Forbidden,
            ApiError::Database(_) | ApiError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    message: String,
    error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Internal details are logged here and never reach the client.
        let public_message = match &self {
            ApiError::Database(err) => {
                error!(error = ?err, "database error");
                "An internal error occurred".to_string()
            }
            ApiError::Internal(msg) => {
                error!(message = %msg, "internal error");
                "An internal error occurred".to_string()
            }
            other => {
                error!(error = ?other, status = %status, "request failed");
                other.to_string()
            }
        };

        let details = match self {
            ApiError::BadRequest { details, .. } => details,
            _ => None,
        };

        let body = ErrorBody {
            message: public_message,
            error_code: code.as_str(),
            errors: details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn conflict_maps_to_409_with_code() {
        let err = ApiError::conflict(ErrorCode::NotEnoughTicket, "Not enough tickets available");
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["errorCode"], "NOT_ENOUGH_TICKET");
        assert_eq!(body["message"], "Not enough tickets available");
    }

    #[tokio::test]
    async fn database_error_is_not_leaked() {
        let err = ApiError::Database(sqlx::Error::PoolTimedOut);
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["errorCode"], "INTERNAL_ERROR");
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn not_found_carries_domain_code() {
        let err = ApiError::not_found(ErrorCode::EventNotFound, "Event not found");
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errorCode"], "EVENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn validation_error_carries_detail_map() {
        let mut errors = ValidationErrors::new();
        errors.add("ticketCount", validator::ValidationError::new("range"));
        let (status, body) = body_json(ApiError::validation(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorCode"], "VALIDATION_ERROR");
        assert!(body["errors"]["ticketCount"].is_array());
    }
}
