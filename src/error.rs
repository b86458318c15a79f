//! Error types for WebAuth Bot
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for WebAuth Bot
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("WebAuth rejected the supplied credentials")]
    InvalidCredentials,

    #[error("Login page is missing the expected form field: {field}")]
    MissingFormField { field: String },

    #[error("Redirect chain exceeded {max_hops} hops")]
    RedirectLoopExceeded { max_hops: usize },

    #[error("Still redirected to WebAuth after logging in: {url}")]
    ReauthenticationFailed { url: String },

    #[error("Malformed WebAuth redirect: {message}")]
    MalformedRedirect { message: String },

    #[error("Unexpected login response with status {status}")]
    UnexpectedLoginResponse { status: u16 },

    #[error("No auth token in WebAuth redirect to {url}")]
    TokenMissing { url: String },

    #[error("Concurrent WebAuth login failed: {message}")]
    LoginFailed { message: String },

    #[error("Credential field '{field}' must not be empty")]
    EmptyCredential { field: &'static str },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing form field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingFormField {
            field: field.into(),
        }
    }

    /// Create a malformed redirect error
    pub fn malformed_redirect(message: impl Into<String>) -> Self {
        Self::MalformedRedirect {
            message: message.into(),
        }
    }

    /// Create a re-authentication failure for the given URL
    pub fn reauthentication_failed(url: impl Into<String>) -> Self {
        Self::ReauthenticationFailed { url: url.into() }
    }

    /// Create a missing token error for the given URL
    pub fn token_missing(url: impl Into<String>) -> Self {
        Self::TokenMissing { url: url.into() }
    }

    /// The error handed to requests that waited on a login which failed
    /// with `self`. Transport and parse errors cannot be cloned, so they
    /// are reported as `LoginFailed` with their message.
    pub(crate) fn for_waiter(&self) -> Self {
        match self {
            Error::InvalidCredentials => Error::InvalidCredentials,
            Error::MissingFormField { field } => Error::missing_field(field.clone()),
            Error::RedirectLoopExceeded { max_hops } => Error::RedirectLoopExceeded {
                max_hops: *max_hops,
            },
            Error::MalformedRedirect { message } => Error::malformed_redirect(message.clone()),
            Error::UnexpectedLoginResponse { status } => {
                Error::UnexpectedLoginResponse { status: *status }
            }
            Error::LoginFailed { message } => Error::LoginFailed {
                message: message.clone(),
            },
            other => Error::LoginFailed {
                message: other.to_string(),
            },
        }
    }

    /// Check if this error is an authentication outcome rather than a
    /// plumbing failure (network, parsing, configuration)
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Error::InvalidCredentials
                | Error::MissingFormField { .. }
                | Error::RedirectLoopExceeded { .. }
                | Error::ReauthenticationFailed { .. }
                | Error::MalformedRedirect { .. }
                | Error::UnexpectedLoginResponse { .. }
                | Error::TokenMissing { .. }
                | Error::LoginFailed { .. }
        )
    }
}

/// Result type alias for WebAuth Bot
pub type Result<T> = std::result::Result<T, Error>;
