//! Typed HTTP API client core.
//!
//! # Overview
//! Turns a declarative `Endpoint` into an `HttpRequest`, threads it through
//! an ordered list of `Plugin`s, dispatches it over a pluggable `Transport`,
//! classifies the outcome into a `NetworkError` and decodes 2xx bodies into
//! the type chosen at the call site.
//!
//! # Design
//! - `Client` is immutable after construction and cheap to clone; it holds
//!   its transport, builder and plugins and nothing else.
//! - Transports, plugins and token providers are traits. `RetryTransport`
//!   wraps any transport, so retries stay invisible to the pipeline.
//! - Every call notifies each plugin exactly once with its terminal outcome,
//!   including build failures and plugin errors.
//! - `UreqTransport` (feature `ureq`) is the stock network transport; tests
//!   use the stub transports from `courier-mocks`.

pub mod auth;
pub mod builder;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod logger;
pub mod plugin;
pub mod redaction;
pub mod retry;
pub mod stream;
pub mod transport;
#[cfg(feature = "ureq")]
pub mod ureq_transport;

pub use auth::{AuthPlugin, TokenProvider};
pub use builder::{BuildError, JsonEncoder, RequestBuilder};
pub use client::{Client, ClientBuilder};
pub use config::{ConfigError, NetworkConfig, RetrySettings};
pub use endpoint::{BasicEndpoint, Endpoint, JsonBody, Task};
pub use error::{BoxError, Cancelled, ErrorKind, ErrorPayload, NetworkError};
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse, ParseMethodError};
pub use logger::{LogLevel, LogSink, LoggerPlugin, TracingSink};
pub use plugin::{HeadersPlugin, Plugin, ReceiveResult};
pub use retry::{RetryPolicy, RetryTransport};
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use ureq_transport::UreqTransport;

pub use tokio_util::sync::CancellationToken;
pub use url::Url;
