//! Error types for the registry gateway.

use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Result type alias for the registry gateway
pub type Result<T> = std::result::Result<T, Error>;

/// Registry gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Identifier missing or malformed, record absent, or the entitlement
    /// check failed. All of these collapse into one kind so a caller cannot
    /// distinguish "does not exist" from "exists but not yours to see".
    #[error("Not Found")]
    NotFound,

    /// Unexpected failure in a collaborator (catalog, token signing), with an
    /// optional operator-facing message.
    #[error("{}", .0.as_deref().unwrap_or("Bad Gateway"))]
    BadGateway(Option<String>),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a bad-gateway error with a custom message
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::BadGateway(Some(message.into()))
    }

    /// HTTP status and body text for the externally visible outcome.
    ///
    /// `NotFound` and `BadGateway(None)` render the canonical reason phrase;
    /// a custom bad-gateway message passes through. Startup-class errors that
    /// escape into a request path render a generic 500 body, never their
    /// internal detail.
    #[must_use]
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            Self::BadGateway(Some(message)) => (StatusCode::BAD_GATEWAY, message.clone()),
            Self::BadGateway(None) => (StatusCode::BAD_GATEWAY, "Bad Gateway".to_string()),
            Self::Config(_) | Self::Io(_) | Self::Json(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            ),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_renders_default_status_text() {
        let (status, message) = Error::NotFound.status_and_message();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(message, "Not Found");
    }

    #[test]
    fn bad_gateway_without_message_renders_default_status_text() {
        let (status, message) = Error::BadGateway(None).status_and_message();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(message, "Bad Gateway");
    }

    #[test]
    fn bad_gateway_custom_message_passes_through() {
        let (status, message) = Error::bad_gateway("Foo Error").status_and_message();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(message, "Foo Error");
    }

    #[test]
    fn startup_errors_never_leak_detail_to_clients() {
        let (status, message) =
            Error::Config("secret path /etc/gw.yaml".to_string()).status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal Server Error");
    }

    #[test]
    fn display_uses_custom_message_when_present() {
        assert_eq!(Error::bad_gateway("Foo Error").to_string(), "Foo Error");
        assert_eq!(Error::BadGateway(None).to_string(), "Bad Gateway");
    }
}
