//! The abstract `(request) -> response` capability.
//!
//! A transport owns the actual I/O. The pipeline never looks inside it; it
//! only classifies what comes back. Wrappers such as `RetryTransport` are
//! transports themselves, so they compose freely.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
///
/// Non-2xx statuses are data, not errors: return them as an `HttpResponse`.
/// Report cancellation with `Cancelled` (or `NetworkError::Cancelled`) so the
/// pipeline can tell it apart from ordinary failures.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError> {
        (**self).send(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError> {
        (**self).send(request).await
    }
}
