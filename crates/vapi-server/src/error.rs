//! HTTP error rendering
//!
//! Every failure leaves the server as `{code, message}` JSON.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use vapi_core::VapiError;

/// Error returned by HTTP handlers
#[derive(Debug)]
pub enum ApiError {
    /// Core operation failed
    Core(VapiError),
    /// Tenant headers missing
    Unauthorized(String),
    /// Request body or query could not be decoded
    BadRequest(String),
}

impl ApiError {
    /// Create bad-request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::Core(VapiError::not_found(what))
    }

    /// HTTP status and machine-readable code
    #[must_use]
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Core(err) => {
                let status = match err {
                    VapiError::InvalidSpec(_) | VapiError::Validation(_) => StatusCode::BAD_REQUEST,
                    VapiError::NotFound(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.code())
            }
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Core(err) => match err {
                VapiError::InvalidSpec(invalid) => invalid.reason.clone(),
                other => other.to_string(),
            },
            Self::Unauthorized(message) | Self::BadRequest(message) => message.clone(),
        }
    }
}

impl From<VapiError> for ApiError {
    fn from(err: VapiError) -> Self {
        Self::Core(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        }
        let body = serde_json::json!({ "code": code, "message": message });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vapi_store::InvalidSpecError;

    #[test]
    fn statuses() {
        assert_eq!(
            ApiError::from(VapiError::from(InvalidSpecError::new("x"))).status(),
            (StatusCode::BAD_REQUEST, "invalid_spec")
        );
        assert_eq!(
            ApiError::not_found("sandbox 1").status(),
            (StatusCode::NOT_FOUND, "not_found")
        );
        assert_eq!(
            ApiError::Unauthorized("missing".into()).status(),
            (StatusCode::UNAUTHORIZED, "unauthorized")
        );
        assert_eq!(
            ApiError::bad_request("bad json").status(),
            (StatusCode::BAD_REQUEST, "validation_error")
        );
    }

    #[test]
    fn invalid_spec_message_is_the_bare_reason() {
        let err = ApiError::from(VapiError::from(InvalidSpecError::new("'paths' must be an object")));
        assert_eq!(err.message(), "'paths' must be an object");
    }
}
