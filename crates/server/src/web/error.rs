//! API error taxonomy and the JSON body extractor

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    /// Anything unexpected; only `public` reaches the client
    #[error("{label}: {source}")]
    Internal {
        label: &'static str,
        public: &'static str,
        source: anyhow::Error,
    },
}

impl ApiError {
    /// Wrap a failure as a generic 500, tagged with `label` in the error log
    pub fn internal(label: &'static str) -> impl FnOnce(anyhow::Error) -> ApiError {
        Self::internal_with(label, "Internal server error")
    }

    /// Same as [`ApiError::internal`] with a specific client-facing message
    pub fn internal_with(
        label: &'static str,
        public: &'static str,
    ) -> impl FnOnce(anyhow::Error) -> ApiError {
        move |source| ApiError::Internal {
            label,
            public,
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<accounts::ValidationError> for ApiError {
    fn from(e: accounts::ValidationError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<tasks::ValidationError> for ApiError {
    fn from(e: tasks::ValidationError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<accounts::SessionError> for ApiError {
    fn from(e: accounts::SessionError) -> Self {
        match e {
            accounts::SessionError::Missing => ApiError::Unauthorized("Unauthorized".to_string()),
            accounts::SessionError::Expired | accounts::SessionError::Invalid => {
                ApiError::Unauthorized(e.to_string())
            }
            accounts::SessionError::Signing(_) => ApiError::Internal {
                label: "Session signing error",
                public: "Internal server error",
                source: e.into(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// Details of an internal error, attached to the response so the outer
/// error-log middleware can persist them
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub message: String,
    pub error: String,
    pub stack: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            ApiError::Internal {
                label,
                public,
                source,
            } => {
                error!("{}: {:#}", label, source);

                let mut response = (
                    status,
                    Json(ErrorBody {
                        success: false,
                        message: public,
                    }),
                )
                    .into_response();

                response.extensions_mut().insert(ErrorRecord {
                    message: label.to_string(),
                    error: format!("{:#}", source),
                    stack: format!("{:?}", source),
                });
                response
            }
            other => {
                let message = other.to_string();
                (
                    status,
                    Json(ErrorBody {
                        success: false,
                        message: &message,
                    }),
                )
                    .into_response()
            }
        }
    }
}

/// `Json<T>` whose rejections use the API error envelope
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::internal("Label")(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_carries_record() {
        let err = ApiError::internal("Add task Error")(anyhow!("disk on fire").context("Failed to create task"));
        let response = err.into_response();

        let record = response.extensions().get::<ErrorRecord>().unwrap();
        assert_eq!(record.message, "Add task Error");
        assert!(record.error.contains("Failed to create task"));
        assert!(record.error.contains("disk on fire"));
    }

    #[test]
    fn test_client_errors_carry_no_record() {
        let response = ApiError::NotFound("Task not found".into()).into_response();
        assert!(response.extensions().get::<ErrorRecord>().is_none());
    }

    #[test]
    fn test_session_errors_are_unauthorized() {
        for e in [
            accounts::SessionError::Missing,
            accounts::SessionError::Expired,
            accounts::SessionError::Invalid,
        ] {
            assert_eq!(ApiError::from(e).status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_validation_messages() {
        let err: ApiError = tasks::ValidationError::MissingField.into();
        assert_eq!(err.to_string(), "Missing required field");

        let err: ApiError = accounts::ValidationError::PasswordTooShort.into();
        assert_eq!(err.to_string(), "Password must be at least 6 characters");
    }
}
