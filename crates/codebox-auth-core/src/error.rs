//! Auth errors

use thiserror::Error;

/// Token verification failure.
///
/// Callers outside this crate only act on pass/fail; the variant is kept
/// for logging and tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Wrong segment count, bad base64, or a payload that is not a JSON object
    #[error("token verification failed: malformed token ({0})")]
    Malformed(String),

    /// Recomputed signature does not match
    #[error("token verification failed: invalid signature")]
    InvalidSignature,

    /// `exp` is missing or not in the future
    #[error("token verification failed: token expired")]
    Expired,
}

impl TokenError {
    /// Short code for structured logs
    pub fn kind_code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "MALFORMED_TOKEN",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Expired => "TOKEN_EXPIRED",
        }
    }
}

/// Admission failures surfaced to the HTTP layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Authentication was attempted and failed
    #[error("{0}")]
    Unauthorized(String),

    /// The caller's current state is not allowed by site policy
    #[error("{0}")]
    Forbidden(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::Configuration(_) => 500,
        }
    }

    /// Short code for structured logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Human-readable reason for the response body
    pub fn detail(&self) -> &str {
        match self {
            Self::Unauthorized(msg) | Self::Forbidden(msg) => msg,
            Self::Configuration(_) => "internal error",
        }
    }
}
