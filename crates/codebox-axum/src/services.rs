//! Per-request service instances.
//!
//! Handlers receive their file, config and local-file services through
//! [`Fresh`], which builds a new value for every request with no
//! initialization arguments.

use std::convert::Infallible;
use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Extractor yielding a freshly constructed `T` for each request.
///
/// # Example
///
/// ```ignore
/// async fn list(AdminRequired(_): AdminRequired, files: Fresh<FileService>) -> Json<Vec<String>> {
///     Json(files.list().await)
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Fresh<T>(pub T);

impl<T> Fresh<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Fresh<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Fresh<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for Fresh<T>
where
    S: Send + Sync,
    T: Default + Send,
{
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(T::default()))
    }
}
