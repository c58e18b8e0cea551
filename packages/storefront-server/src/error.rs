use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use storefront_storage::{ErrorKind, StorageError};
use thiserror::Error;
use tracing::{error, warn};

use crate::config::ConfigError;
use crate::forms::FormErrors;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Body, query or path that could not be decoded
    #[error("{message}")]
    BadRequest { status: StatusCode, message: String },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid form data: {0}")]
    InvalidForm(FormErrors),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Payment provider error: {0}")]
    Payment(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn payment<E: std::fmt::Display>(e: E) -> Self {
        Self::Payment(e.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::Storage(e) => e.kind.as_str(),
            ServerError::BadRequest { .. } => "bad_request",
            ServerError::Unauthorized | ServerError::InvalidCredentials => "unauthorized",
            ServerError::InvalidForm(_) | ServerError::EmptyCart => "validation",
            ServerError::InvalidStateTransition { .. } => "conflict",
            ServerError::Payment(_) => "payment",
            ServerError::Config(_) => "config",
            ServerError::Yaml(_) => "yaml",
            ServerError::Io(_) => "io",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Storage(e) => match e.kind {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::BadRequest { status, .. } => *status,
            ServerError::Unauthorized | ServerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServerError::InvalidForm(_) | ServerError::EmptyCart => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServerError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            ServerError::Payment(_) => StatusCode::BAD_GATEWAY,
            ServerError::Config(_) | ServerError::Yaml(_) | ServerError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<FormErrors> for ServerError {
    fn from(errors: FormErrors) -> Self {
        ServerError::InvalidForm(errors)
    }
}

macro_rules! impl_from_rejection {
    ($($rejection:ty),+) => {
        $(
            impl From<$rejection> for ServerError {
                fn from(rejection: $rejection) -> Self {
                    ServerError::BadRequest {
                        status: rejection.status(),
                        message: rejection.body_text(),
                    }
                }
            }
        )+
    };
}

impl_from_rejection!(JsonRejection, QueryRejection, PathRejection);

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("{} ({})", self, status);
        } else {
            warn!("Rejected request: {} ({})", self, status);
        }

        // Internal details stay in the log
        let message = match &self {
            ServerError::Storage(e) if status.is_server_error() => {
                format!("Storage failure ({})", e.kind.as_str())
            }
            ServerError::InvalidForm(_) => "Invalid form data".to_string(),
            other => other.to_string(),
        };

        let body = match self {
            ServerError::InvalidForm(fields) => json!({
                "error": message,
                "kind": "validation",
                "fields": fields,
            }),
            other => json!({
                "error": message,
                "kind": other.kind(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_status_mapping() {
        let cases = [
            (StorageError::not_found("Product", 1), StatusCode::NOT_FOUND),
            (StorageError::conflict("locked"), StatusCode::CONFLICT),
            (
                StorageError::validation("bad action"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                StorageError::database("disk I/O"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (storage, status) in cases {
            assert_eq!(ServerError::from(storage).status(), status);
        }
    }

    #[test]
    fn test_server_status_mapping() {
        assert_eq!(ServerError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ServerError::EmptyCart.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            ServerError::payment("timeout").status(),
            StatusCode::BAD_GATEWAY
        );
        let transition = ServerError::InvalidStateTransition {
            from: "paid".to_string(),
            to: "open".to_string(),
        };
        assert_eq!(transition.status(), StatusCode::CONFLICT);
        assert_eq!(transition.to_string(), "Invalid state transition: paid -> open");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(
            ServerError::from(StorageError::not_found("Category", "x")).kind(),
            "not_found"
        );
        assert_eq!(ServerError::InvalidCredentials.kind(), "unauthorized");
        assert_eq!(ServerError::InvalidForm(FormErrors::new()).kind(), "validation");
    }

    #[test]
    fn test_bad_request_status() {
        let err = ServerError::BadRequest {
            status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
            message: "Expected request with `Content-Type: application/json`".to_string(),
        };
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(err.kind(), "bad_request");
    }
}
