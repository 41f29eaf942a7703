//! Error types for the PrivX connector.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.
//! Remote SDK/transport failures are wrapped here so callers never depend on `reqwest` error
//! shapes directly.

use std::num::ParseIntError;

use thiserror::Error;

/// Result type alias using `ConnectorError`.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Top-level connector error type.
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Remote API error: {0}")]
    RemoteApi(#[from] ApiError),

    #[error("Page token error: {0}")]
    PageToken(#[from] PageTokenError),

    #[error("{operation}: only users can be assigned roles (principal {principal_type}:{principal_id})")]
    InvalidPrincipalType {
        operation: &'static str,
        principal_type: String,
        principal_id: String,
    },

    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Operation canceled")]
    Canceled,

    #[error("Pagination loop detected for {resource_type}: token {token:?} returned unchanged")]
    PaginationLoop {
        resource_type: String,
        token: String,
    },
}

/// Credential and token exchange errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token exchange failed: HTTP {status}")]
    TokenExchangeStatus { status: u16, body: String },

    #[error("Token exchange failed: {0}")]
    TokenExchangeNetwork(#[source] reqwest::Error),

    #[error("Failed to parse token response: {0}")]
    TokenResponseInvalid(String),
}

/// Errors from list/grant/revoke calls against the role store.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{call} failed: HTTP {status}")]
    Status {
        call: String,
        status: u16,
        body: String,
    },

    #[error("{call} failed: {source}")]
    Network {
        call: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{call} returned an unreadable response: {message}")]
    Decode { call: String, message: String },
}

/// Malformed continuation token.
#[derive(Error, Debug)]
#[error("invalid page token {token:?}: {source}")]
pub struct PageTokenError {
    pub token: String,
    #[source]
    pub source: ParseIntError,
}

impl ConnectorError {
    /// Returns true if this error should stop the whole sync rather than one resource type.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Canceled)
    }

    /// Returns a short operator-facing message.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Auth(AuthError::TokenExchangeStatus { status: 401, .. }) => {
                "PrivX rejected the client credentials. Check the API and OAuth client settings."
            }
            Self::Auth(_) => "Could not obtain a PrivX access token.",
            Self::RemoteApi(ApiError::Status { status: 401, .. }) => {
                "Access token was rejected by PrivX."
            }
            Self::RemoteApi(ApiError::Status { status: 403, .. }) => {
                "The API client lacks permission for this operation."
            }
            Self::RemoteApi(ApiError::Network { .. }) => "Network error. Check the PrivX base URL.",
            Self::RemoteApi(_) => "Unexpected response from PrivX.",
            Self::PageToken(_) => "Invalid page token.",
            Self::InvalidResource(_) => "PrivX returned an entity that cannot be mapped.",
            Self::InvalidPrincipalType { .. } => "Only users can be assigned roles.",
            Self::Canceled => "The operation was canceled.",
            Self::PaginationLoop { .. } => "PrivX returned the same page twice.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: u16) -> ConnectorError {
        ApiError::Status {
            call: "list roles".into(),
            status,
            body: String::new(),
        }
        .into()
    }

    #[test]
    fn test_is_fatal() {
        let err = ConnectorError::Auth(AuthError::TokenExchangeStatus {
            status: 401,
            body: String::new(),
        });
        assert!(err.is_fatal());
        assert!(ConnectorError::Canceled.is_fatal());
        assert!(!status_error(500).is_fatal());
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            status_error(403).user_message(),
            "The API client lacks permission for this operation."
        );
        assert_eq!(status_error(502).user_message(), "Unexpected response from PrivX.");
    }

    #[test]
    fn test_display_carries_call_context() {
        let err = ApiError::Status {
            call: "list members of role r1".into(),
            status: 404,
            body: "not found".into(),
        };
        assert_eq!(err.to_string(), "list members of role r1 failed: HTTP 404");
    }

    #[test]
    fn test_invalid_principal_display() {
        let err = ConnectorError::InvalidPrincipalType {
            operation: "grant",
            principal_type: "role".into(),
            principal_id: "r9".into(),
        };
        assert!(err.to_string().contains("role:r9"));
    }
}
