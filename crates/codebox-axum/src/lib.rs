//! Codebox Axum Integration
//!
//! Axum extractors that put the admission rules of `codebox-auth-core` in
//! front of admin and share-upload handlers.
//!
//! # Extractors
//!
//! - [`AdminRequired`] - admin routes; share routes also admit guests while open upload is on
//! - [`ShareChunkRequired`] - chunked uploads, password via `X-Admin-Password`
//! - [`authorize_share_upload`] - plain uploads, password via the `password` form field
//! - [`Fresh`] - a new service instance per request
//!
//! # Quick Start
//!
//! ```ignore
//! use axum::{routing::post, Router};
//! use codebox_auth_core::{AccessResolver, AuthConfig};
//! use codebox_axum::AdminRequired;
//!
//! let config = AuthConfig::from_env()?;
//! let (resolver, settings) = AccessResolver::from_config(&config)?;
//!
//! let app = Router::new()
//!     .route("/admin/config", post(|AdminRequired(_): AdminRequired| async { "ok" }))
//!     .with_state(resolver);
//! ```

pub mod error;
pub mod extractors;
pub mod services;

pub use error::GuardRejection;
pub use extractors::{authorize_share_upload, AdminRequired, ShareChunkRequired};
pub use services::Fresh;
