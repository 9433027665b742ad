//! Configuration types for the admission layer

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::token::DEFAULT_TOKEN_TTL;

/// Site setting consulted on every share-upload decision.
///
/// Implementations are read fresh per request and must not cache on the
/// caller's behalf.
pub trait UploadPolicy: Send + Sync {
    /// Whether unauthenticated guests may upload
    fn open_upload(&self) -> bool;
}

impl UploadPolicy for bool {
    fn open_upload(&self) -> bool {
        *self
    }
}

/// Mutable site settings shared across request handlers.
///
/// Only the open-upload flag can change at runtime; the admin secret lives
/// in [`AuthConfig`] and is fixed for the process lifetime.
#[derive(Debug)]
pub struct RuntimeSettings {
    open_upload: AtomicBool,
}

impl RuntimeSettings {
    pub fn new(open_upload: bool) -> Self {
        Self {
            open_upload: AtomicBool::new(open_upload),
        }
    }

    /// Toggle guest uploads
    pub fn set_open_upload(&self, enabled: bool) {
        tracing::info!(enabled, "open upload setting changed");
        self.open_upload.store(enabled, Ordering::SeqCst);
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::new(true)
    }
}

impl UploadPolicy for RuntimeSettings {
    fn open_upload(&self) -> bool {
        self.open_upload.load(Ordering::SeqCst)
    }
}

/// Admission layer configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Shared admin secret: HMAC key for tokens and fallback upload password
    pub admin_token: String,
    /// Lifetime of tokens issued at login
    pub token_ttl: Duration,
    /// Initial open-upload setting
    pub open_upload: bool,
}

impl AuthConfig {
    /// Environment variable holding the admin secret
    pub const ADMIN_TOKEN_VAR: &'static str = "ADMIN_TOKEN";
    /// Environment variable overriding the token lifetime
    pub const TOKEN_TTL_VAR: &'static str = "TOKEN_TTL_SECS";
    /// Environment variable for the initial open-upload setting
    pub const OPEN_UPLOAD_VAR: &'static str = "OPEN_UPLOAD";

    /// Create a config with the default 30-day TTL and guest uploads on
    pub fn new(admin_token: impl Into<String>) -> Self {
        Self {
            admin_token: admin_token.into(),
            token_ttl: DEFAULT_TOKEN_TTL,
            open_upload: true,
        }
    }

    /// Set token lifetime
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set initial open-upload value
    pub fn with_open_upload(mut self, enabled: bool) -> Self {
        self.open_upload = enabled;
        self
    }

    /// Load configuration from the process environment, reading `.env` first
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let admin_token =
            lookup(Self::ADMIN_TOKEN_VAR).ok_or(ConfigError::Missing(Self::ADMIN_TOKEN_VAR))?;

        let ttl_secs: u64 = lookup(Self::TOKEN_TTL_VAR)
            .map(|v| v.trim().parse::<u64>())
            .transpose()
            .map_err(|_| ConfigError::Invalid(Self::TOKEN_TTL_VAR))?
            .unwrap_or(DEFAULT_TOKEN_TTL.as_secs());

        let open_upload = lookup(Self::OPEN_UPLOAD_VAR)
            .map(|v| parse_flag(&v).ok_or(ConfigError::Invalid(Self::OPEN_UPLOAD_VAR)))
            .transpose()?
            .unwrap_or(true);

        let config = Self::new(admin_token)
            .with_token_ttl(Duration::from_secs(ttl_secs))
            .with_open_upload(open_upload);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.admin_token.is_empty() {
            return Err(ConfigError::Invalid("ADMIN_TOKEN must not be empty"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_token", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("open_upload", &self.open_upload)
            .finish()
    }
}

/// Accepts the spellings settings pages commonly store for booleans
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
