//! Axum extractors for admin and share-upload admission.
//!
//! The [`AccessResolver`] is taken from router state via [`FromRef`], so any
//! state that can hand one out works.
//!
//! # Usage
//!
//! ```ignore
//! use codebox_axum::{AdminRequired, ShareChunkRequired};
//!
//! // 401 unless the caller holds an admin token
//! async fn list_files(AdminRequired(_): AdminRequired) -> &'static str {
//!     "files"
//! }
//!
//! // Admin token or X-Admin-Password, unless guest uploads are open
//! async fn chunk_init(_: ShareChunkRequired) -> &'static str {
//!     "ready"
//! }
//! ```

use std::ops::Deref;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts, OriginalUri};
use axum::http::header::{self, HeaderName};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use codebox_auth_core::AccessResolver;

use crate::error::GuardRejection;

/// Read a header as UTF-8; anything else counts as absent.
fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn admin_password_header() -> HeaderName {
    HeaderName::from_static("x-admin-password")
}

/// Extractor for admin routes.
///
/// Holds whether the caller is an admin. On routes under `/share/` a guest
/// is let through while open upload is on (403 otherwise); everywhere else
/// the caller must be an admin (401).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminRequired(pub bool);

impl Deref for AdminRequired {
    type Target = bool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminRequired
where
    AccessResolver: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let resolver = AccessResolver::from_ref(state);
        let bearer = header_str(&parts.headers, &header::AUTHORIZATION);

        // Nested routers see a stripped path; classify on the full one
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.path(), |uri| uri.0.path());

        Ok(Self(resolver.admin_guard(bearer, path)?))
    }
}

/// Extractor for chunked upload routes.
///
/// The fallback password is read from the `X-Admin-Password` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareChunkRequired;

#[async_trait]
impl<S> FromRequestParts<S> for ShareChunkRequired
where
    AccessResolver: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let resolver = AccessResolver::from_ref(state);
        let bearer = header_str(&parts.headers, &header::AUTHORIZATION);
        let password = header_str(&parts.headers, &admin_password_header());

        resolver.share_chunk_guard(bearer, password)?;
        Ok(Self)
    }
}

/// Admission check for plain uploads.
///
/// Upload handlers consume the request body themselves, so they call this
/// with the `password` form field once the form is parsed.
pub fn authorize_share_upload(
    resolver: &AccessResolver,
    headers: &HeaderMap,
    form_password: Option<&str>,
) -> Result<(), GuardRejection> {
    let bearer = header_str(headers, &header::AUTHORIZATION);
    resolver.share_upload_guard(bearer, form_password)?;
    Ok(())
}
