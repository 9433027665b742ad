//! Codebox Auth Core - admission logic for admin and share-upload routes
//!
//! Signed admin tokens, the open-upload policy, and the password fallback
//! combined into one admission decision per request.

pub mod access;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod token;

pub use access::{bearer_token, AccessResolver, RouteKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthConfig, ConfigError, RuntimeSettings, UploadPolicy};
pub use crypto::{constant_time_eq, constant_time_str_eq, HmacKey, HmacKeyError};
pub use error::*;
pub use token::{Claims, SignedToken, TokenCodec, DEFAULT_TOKEN_TTL};
