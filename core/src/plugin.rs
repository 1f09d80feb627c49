//! Hooks into the request lifecycle.
//!
//! Plugins run in declaration order. `prepare` may mutate the outgoing
//! request (auth headers, logging, URL tweaks); `did_receive` observes the
//! terminal outcome of every call exactly once.

use async_trait::async_trait;

use crate::error::{BoxError, NetworkError};
use crate::http::{Headers, HttpRequest, HttpResponse};

/// Outcome handed to `Plugin::did_receive`.
pub type ReceiveResult<'a> = Result<&'a HttpResponse, &'a NetworkError>;

#[async_trait]
pub trait Plugin: Send + Sync {
    /// Called before dispatch. An `Err` stops the chain; it surfaces as the
    /// wrapped `NetworkError` if it is one, otherwise as `Transport`.
    async fn prepare(&self, request: &mut HttpRequest) -> Result<(), BoxError> {
        let _ = request;
        Ok(())
    }

    /// Called once per call with the final request. An `Err` is logged and
    /// does not change what the caller sees.
    async fn did_receive(
        &self,
        result: ReceiveResult<'_>,
        request: &HttpRequest,
    ) -> Result<(), BoxError> {
        let _ = (result, request);
        Ok(())
    }
}

/// Sets default headers on requests that do not already carry them.
#[derive(Debug, Clone, Default)]
pub struct HeadersPlugin {
    defaults: Headers,
}

impl HeadersPlugin {
    pub fn new(defaults: Headers) -> Self {
        Self { defaults }
    }
}

#[async_trait]
impl Plugin for HeadersPlugin {
    async fn prepare(&self, request: &mut HttpRequest) -> Result<(), BoxError> {
        for (name, value) in self.defaults.iter() {
            if !request.headers.contains(name) {
                request.headers.set(name, value);
            }
        }
        Ok(())
    }
}
