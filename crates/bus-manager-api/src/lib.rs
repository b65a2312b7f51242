//! Bus Manager API - Game Backend Client
//!
//! This library provides the headless half of the Bus Manager client: the
//! wire data model, a typed REST client for the game API, and the session
//! store carrying the (token, user) pair across the process.
//!
//! # Architecture
//!
//! - **[`types`]**: serde data model matching the backend JSON
//! - **[`session::Session`]**: in-memory session state behind one shared handle
//! - **[`client::ApiClient`]**: async REST client with bearer auth and
//!   uniform 401 handling (any unauthorized response clears the session)
//!
//! Nothing in this crate touches a UI; everything is unit-testable.

pub mod client;
pub mod session;
pub mod types;

pub use client::ApiClient;
pub use session::{Session, SharedSession};

/// Error types for API operations
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server rejected the credentials or the token expired.
    /// By the time this surfaces the session has already been cleared.
    #[error("not authenticated")]
    Unauthorized,

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid API base URL: {0}")]
    BaseUrl(String),
}

impl ApiError {
    /// True for a 404, used by the dashboard to distinguish "no company yet"
    /// from a real failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        let err = ApiError::Status {
            status: 404,
            message: "company not found".to_string(),
        };
        assert!(err.is_not_found());

        let err = ApiError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        assert!(!err.is_not_found());
        assert!(!ApiError::Unauthorized.is_not_found());
    }

    #[test]
    fn test_status_display_uses_message() {
        let err = ApiError::Status {
            status: 409,
            message: "User with this email or username already exists".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "User with this email or username already exists"
        );
    }
}
