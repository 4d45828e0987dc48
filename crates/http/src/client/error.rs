//! Client error types

use super::persistence::SessionError;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Refused before dispatch because a logout is under way
    #[error("Request cancelled due to logout")]
    CancelledByLogout,

    /// An operation needs a logged-in user and there is none
    #[error("Not logged in")]
    NotLoggedIn,

    /// Server configuration could not be fetched
    #[error("Server configuration unavailable: {0}")]
    ConfigUnavailable(String),

    /// Local session storage failed
    #[error("Session storage error: {0}")]
    Session(#[from] SessionError),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// True for the logout cancellation, which UI code should not report as a failure
    pub const fn is_cancelled_by_logout(&self) -> bool {
        matches!(self, Self::CancelledByLogout)
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthenticationFailed(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::BadRequest(_) => Some(400),
            Self::ServerError { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Why a reissue round trip failed. Always fatal to the session.
#[derive(Debug, Error)]
pub enum ReissueError {
    /// No stored session to build the request from
    #[error("No session to reissue")]
    NoSession,

    /// Stored session lacks a refresh token
    #[error("Stored session has no refresh token")]
    MissingRefreshToken,

    /// Stored session could not be read
    #[error("Cannot read stored session: {0}")]
    Session(#[from] SessionError),

    /// Token lifetime unknown because the server configuration is unavailable
    #[error("Server configuration unavailable: {0}")]
    Config(String),

    /// Request body could not be built
    #[error("Could not encode reissue request: {0}")]
    Encode(String),

    /// Network failure during reissue
    #[error("Reissue request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Backend refused the reissue
    #[error("Reissue rejected with {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Backend answered without `token.accessToken`
    #[error("Malformed reissue response: {0}")]
    MalformedResponse(String),

    /// Refused before dispatch because a logout is under way
    #[error("Reissue cancelled due to logout")]
    Cancelled,
}
