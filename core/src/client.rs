//! The request pipeline: build, prepare, dispatch, classify, decode, notify.
//!
//! # Design
//! `Client` carries all of its collaborators by construction and holds no
//! mutable state, so one value can be cloned and shared across tasks. Each
//! call runs serially: plugins' `prepare` in declaration order, one
//! transport call (the transport may retry internally), then `did_receive`
//! in the same order. Every terminal outcome notifies each plugin exactly
//! once, except a cancellation observed before dispatch.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::builder::{JsonEncoder, RequestBuilder};
use crate::config::NetworkConfig;
use crate::endpoint::Endpoint;
use crate::error::{ErrorPayload, NetworkError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::logger::LoggerPlugin;
use crate::plugin::{HeadersPlugin, Plugin, ReceiveResult};
use crate::retry::RetryTransport;
use crate::transport::Transport;

/// HTTP client that builds requests from `Endpoint` values, runs them
/// through plugins and a transport, and decodes JSON responses.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    builder: RequestBuilder,
    plugins: Arc<[Arc<dyn Plugin>]>,
}

/// Step-by-step construction of a `Client`.
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    builder: RequestBuilder,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl ClientBuilder {
    pub fn encoder(mut self, encoder: JsonEncoder) -> Self {
        self.builder = RequestBuilder::new(encoder);
        self
    }

    /// Appends a plugin; plugins run in the order they are added.
    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn shared_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn build(self) -> Client {
        Client {
            transport: self.transport,
            builder: self.builder,
            plugins: self.plugins.into(),
        }
    }
}

/// Why the prepare chain stopped.
enum PrepareError {
    Cancelled,
    Plugin(NetworkError),
}

impl Client {
    /// Client with the default builder and no plugins.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::builder(transport).build()
    }

    pub fn builder(transport: impl Transport + 'static) -> ClientBuilder {
        ClientBuilder {
            transport: Arc::new(transport),
            builder: RequestBuilder::default(),
            plugins: Vec::new(),
        }
    }

    /// Composes a client from configuration.
    ///
    /// The transport is wrapped in a `RetryTransport` when retries are
    /// configured; default headers and logging become plugins, in that order.
    pub fn from_config(config: &NetworkConfig, transport: impl Transport + 'static) -> Self {
        let transport: Arc<dyn Transport> = match config.retry_policy() {
            Some(policy) => Arc::new(RetryTransport::new(transport, policy)),
            None => Arc::new(transport),
        };

        let mut builder = ClientBuilder {
            transport,
            builder: RequestBuilder::new(config.json),
            plugins: Vec::new(),
        };
        let defaults = config.default_headers();
        if !defaults.is_empty() {
            builder = builder.plugin(HeadersPlugin::new(defaults));
        }
        if let Some(level) = config.log_level.filter(|level| level.is_enabled()) {
            builder = builder.plugin(LoggerPlugin::new(level));
        }
        builder.build()
    }

    /// Sends `endpoint` and decodes the 2xx body as `T`.
    ///
    /// Bodies are always decoded as JSON with `serde_json`. Key casing,
    /// date formats and defaults are configured on `T` through serde
    /// attributes (`rename_all`, `with`, `default`), not on the client.
    pub async fn request<T, E>(&self, endpoint: &E) -> Result<T, NetworkError>
    where
        T: DeserializeOwned,
        E: Endpoint + ?Sized,
    {
        self.execute(endpoint, None).await
    }

    /// Like `request`, but `token` cancels the call with `NetworkError::Cancelled`.
    pub async fn request_with_cancellation<T, E>(
        &self,
        endpoint: &E,
        token: &CancellationToken,
    ) -> Result<T, NetworkError>
    where
        T: DeserializeOwned,
        E: Endpoint + ?Sized,
    {
        self.execute(endpoint, Some(token)).await
    }

    async fn execute<T, E>(
        &self,
        endpoint: &E,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, NetworkError>
    where
        T: DeserializeOwned,
        E: Endpoint + ?Sized,
    {
        let mut request = match self.builder.build(endpoint) {
            Ok(request) => request,
            Err(err) => {
                let request = HttpRequest::new(HttpMethod::Get, endpoint.base_url());
                return self.fail(NetworkError::InvalidRequest(err), &request).await;
            }
        };

        match self.prepare(&mut request, cancel).await {
            Ok(()) => {}
            Err(PrepareError::Cancelled) => {
                debug!(url = %request.url, "request cancelled before dispatch");
                return Err(NetworkError::Cancelled);
            }
            Err(PrepareError::Plugin(err)) => return self.fail(err, &request).await,
        }

        debug!(method = %request.method, url = %request.url, "dispatching request");
        let response = match self.dispatch(&request, cancel).await {
            Ok(response) => response,
            Err(err) => return self.fail(err, &request).await,
        };

        if !response.is_success() {
            let payload = serde_json::from_slice::<ErrorPayload>(&response.body).ok();
            let err = NetworkError::Http {
                status: response.status,
                payload,
                body: response.body,
            };
            return self.fail(err, &request).await;
        }

        match serde_json::from_slice::<T>(&response.body) {
            Ok(value) => {
                self.notify(Ok(&response), &request).await;
                Ok(value)
            }
            Err(err) => self.fail(NetworkError::Decoding(err), &request).await,
        }
    }

    async fn prepare(
        &self,
        request: &mut HttpRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), PrepareError> {
        for plugin in self.plugins.iter() {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(PrepareError::Cancelled);
            }
            let outcome = match cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(PrepareError::Cancelled),
                    outcome = plugin.prepare(request) => outcome,
                },
                None => plugin.prepare(request).await,
            };
            outcome.map_err(|err| PrepareError::Plugin(NetworkError::classify(err)))?;
        }
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(PrepareError::Cancelled);
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        request: &HttpRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<HttpResponse, NetworkError> {
        let outcome = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(NetworkError::Cancelled),
                outcome = self.transport.send(request) => outcome,
            },
            None => self.transport.send(request).await,
        };
        outcome.map_err(NetworkError::classify)
    }

    async fn fail<T>(&self, err: NetworkError, request: &HttpRequest) -> Result<T, NetworkError> {
        debug!(url = %request.url, kind = %err.kind(), "request failed");
        self.notify(Err(&err), request).await;
        Err(err)
    }

    async fn notify(&self, result: ReceiveResult<'_>, request: &HttpRequest) {
        for plugin in self.plugins.iter() {
            if let Err(err) = plugin.did_receive(result, request).await {
                warn!(url = %request.url, error = %err, "plugin failed to observe response");
            }
        }
    }
}
