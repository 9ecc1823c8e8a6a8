//! API error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.into(),
        }
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::GATEWAY_TIMEOUT,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "type": match self.status {
                    StatusCode::BAD_REQUEST => "invalid_request_error",
                    StatusCode::NOT_FOUND => "not_found_error",
                    StatusCode::SERVICE_UNAVAILABLE => "capability_unavailable_error",
                    StatusCode::GATEWAY_TIMEOUT => "timeout_error",
                    _ => "server_error",
                },
                "code": self.status.as_str()
            }
        }));
        (self.status, body).into_response()
    }
}

impl From<verba_core::Error> for ApiError {
    fn from(err: verba_core::Error) -> Self {
        match &err {
            verba_core::Error::UnknownCapability(_) => ApiError::not_found(err.to_string()),
            verba_core::Error::Config(_) => ApiError::bad_request(err.to_string()),
            // A failed build is terminal for the process: the capability is
            // unavailable, not merely erroring on this request.
            verba_core::Error::ConstructionFailed { .. } => ApiError::unavailable(err.to_string()),
            verba_core::Error::Timeout { .. } => ApiError::timeout(err.to_string()),
            verba_core::Error::InvocationFailed { .. } => ApiError::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verba_core::{Capability, Error};

    #[test]
    fn maps_the_error_taxonomy_onto_status_codes() {
        let cases = [
            (
                Error::UnknownCapability(Capability::Sentiment),
                StatusCode::NOT_FOUND,
            ),
            (
                Error::ConstructionFailed {
                    capability: Capability::Sentiment,
                    cause: "x".into(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                Error::Timeout {
                    capability: Capability::Sentiment,
                    waited_ms: 1,
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                Error::InvocationFailed {
                    capability: Capability::Sentiment,
                    cause: "x".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (Error::Config("x".into()), StatusCode::BAD_REQUEST),
        ];

        for (err, expected) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status, expected);
        }
    }
}
