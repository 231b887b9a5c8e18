use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tonic::{Code, Status};

pub type Result<T> = std::result::Result<T, AccountError>;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("email already exists")]
    DuplicateEmail,

    #[error("account not found")]
    NotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("no fields to update")]
    NoFieldsToUpdate,

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("operation cancelled")]
    Cancelled,

    #[error("database error: {0}")]
    Database(String),

    #[error("internal server error: {0}")]
    Internal(String),
}

impl AccountError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AccountError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Message safe to hand to callers. Backend detail never leaves the process.
    pub fn public_message(&self) -> String {
        match self {
            AccountError::Database(_) | AccountError::Internal(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            AccountError::Validation { .. } | AccountError::NoFieldsToUpdate => {
                StatusCode::BAD_REQUEST
            }
            AccountError::DuplicateEmail => StatusCode::CONFLICT,
            AccountError::NotFound => StatusCode::NOT_FOUND,
            AccountError::InvalidCredentials | AccountError::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            AccountError::Forbidden => StatusCode::FORBIDDEN,
            AccountError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            AccountError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            AccountError::Database(_) | AccountError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Convert to gRPC Status for wire protocol
    pub fn to_status(&self) -> Status {
        let code = match self {
            AccountError::Validation { .. } | AccountError::NoFieldsToUpdate => {
                Code::InvalidArgument
            }
            AccountError::DuplicateEmail => Code::AlreadyExists,
            AccountError::NotFound => Code::NotFound,
            AccountError::InvalidCredentials | AccountError::Unauthenticated => {
                Code::Unauthenticated
            }
            AccountError::Forbidden => Code::PermissionDenied,
            AccountError::DeadlineExceeded => Code::DeadlineExceeded,
            AccountError::Cancelled => Code::Cancelled,
            AccountError::Database(_) | AccountError::Internal(_) => Code::Internal,
        };
        Status::new(code, self.public_message())
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let mut body = serde_json::json!({ "error": self.public_message() });
        if let AccountError::Validation { field, .. } = &self {
            body["field"] = serde_json::Value::from(*field);
        }
        (status, Json(body)).into_response()
    }
}

// Conversions from external error types
impl From<sqlx::Error> for AccountError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AccountError::NotFound,
            other => {
                tracing::error!(error = %other, "Database error");
                AccountError::Database(other.to_string())
            }
        }
    }
}

impl From<crypto_core::HashError> for AccountError {
    fn from(err: crypto_core::HashError) -> Self {
        tracing::error!(error = %err, "Credential hashing error");
        AccountError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AccountError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!(error = %err, "Blocking task failed");
        AccountError::Internal(err.to_string())
    }
}

// gRPC Status conversion
impl From<AccountError> for Status {
    fn from(err: AccountError) -> Self {
        err.to_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        use AccountError as E;

        let cases = [
            (E::validation("email", "bad"), Code::InvalidArgument, StatusCode::BAD_REQUEST),
            (E::NoFieldsToUpdate, Code::InvalidArgument, StatusCode::BAD_REQUEST),
            (E::DuplicateEmail, Code::AlreadyExists, StatusCode::CONFLICT),
            (E::NotFound, Code::NotFound, StatusCode::NOT_FOUND),
            (E::InvalidCredentials, Code::Unauthenticated, StatusCode::UNAUTHORIZED),
            (E::Unauthenticated, Code::Unauthenticated, StatusCode::UNAUTHORIZED),
            (E::Forbidden, Code::PermissionDenied, StatusCode::FORBIDDEN),
            (E::DeadlineExceeded, Code::DeadlineExceeded, StatusCode::GATEWAY_TIMEOUT),
            (E::Cancelled, Code::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (err, code, http) in cases {
            assert_eq!(err.to_status().code(), code, "{err}");
            assert_eq!(err.http_status(), http, "{err}");
        }
    }

    #[test]
    fn test_internal_details_not_leaked() {
        let err = AccountError::Database("connection refused at 10.0.0.3:5432".into());
        let status = err.to_status();

        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "internal server error");
        assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_message_names_field() {
        let err = AccountError::validation("password", "must be at least 8 characters");
        assert_eq!(err.to_status().message(), "invalid password: must be at least 8 characters");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            AccountError::from(sqlx::Error::RowNotFound),
            AccountError::NotFound
        ));
    }
}
