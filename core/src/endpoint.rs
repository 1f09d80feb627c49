//! Declarative description of one API call.
//!
//! # Design
//! An `Endpoint` only answers questions (base URL, path, method, headers,
//! task, timeout); it never performs work. Callers usually implement it on a
//! small enum, one variant per call, and pick the response type at the call
//! site. `BasicEndpoint` covers the ad-hoc case.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::builder::JsonEncoder;
use crate::config::NetworkConfig;
use crate::http::{HttpMethod, DEFAULT_TIMEOUT};

/// Describes an API endpoint: URL, method, optional headers, body or query.
pub trait Endpoint {
    fn base_url(&self) -> Url;

    /// Appended to `base_url` as a path component. Empty means `base_url` itself.
    fn path(&self) -> String;

    fn method(&self) -> HttpMethod;

    fn headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn task(&self) -> Task {
        Task::Plain
    }

    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }
}

impl<E: Endpoint + ?Sized> Endpoint for &E {
    fn base_url(&self) -> Url {
        (**self).base_url()
    }

    fn path(&self) -> String {
        (**self).path()
    }

    fn method(&self) -> HttpMethod {
        (**self).method()
    }

    fn headers(&self) -> Vec<(String, String)> {
        (**self).headers()
    }

    fn task(&self) -> Task {
        (**self).task()
    }

    fn timeout(&self) -> Duration {
        (**self).timeout()
    }
}

/// Body or query shape of an endpoint.
#[derive(Debug, Clone, Default)]
pub enum Task {
    /// No body, no extra query.
    #[default]
    Plain,
    /// Appended after any query already present in the URL, order and
    /// duplicates preserved.
    Query(Vec<(String, String)>),
    /// Opaque body bytes. No `Content-Type` is set.
    RawBytes(Vec<u8>),
    /// JSON body. The builder sets `Content-Type: application/json`.
    Encoded(JsonBody),
}

impl Task {
    /// Query task from borrowed pairs.
    pub fn query<K, V>(items: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Task::Query(items.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// JSON task that serializes `value` when the request is built.
    pub fn json<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Task::Encoded(JsonBody::deferred(value))
    }
}

type EncodeFn = dyn Fn(JsonEncoder) -> Result<Vec<u8>, serde_json::Error> + Send + Sync;

/// A type-erased JSON body.
///
/// `eager` serializes right away, once per `JsonEncoder` style, so an
/// unserializable value fails at construction. `deferred` keeps the value and
/// serializes it when the builder runs, so the failure surfaces as
/// `BuildError::InvalidBody`. Both produce the same bytes for a given
/// encoder, field order included.
#[derive(Clone)]
pub struct JsonBody(Repr);

#[derive(Clone)]
enum Repr {
    Encoded { compact: Arc<[u8]>, pretty: Arc<[u8]> },
    Deferred(Arc<EncodeFn>),
}

impl JsonBody {
    pub fn eager<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let compact = JsonEncoder::Compact.encode(value)?;
        let pretty = JsonEncoder::Pretty.encode(value)?;
        Ok(JsonBody(Repr::Encoded {
            compact: compact.into(),
            pretty: pretty.into(),
        }))
    }

    pub fn deferred<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        JsonBody(Repr::Deferred(Arc::new(move |encoder: JsonEncoder| {
            encoder.encode(&value)
        })))
    }

    pub(crate) fn encode(&self, encoder: JsonEncoder) -> Result<Vec<u8>, serde_json::Error> {
        match &self.0 {
            Repr::Encoded { compact, pretty } => Ok(match encoder {
                JsonEncoder::Compact => compact.to_vec(),
                JsonEncoder::Pretty => pretty.to_vec(),
            }),
            Repr::Deferred(encode) => encode(encoder),
        }
    }
}

impl fmt::Debug for JsonBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Encoded { compact, .. } => f
                .debug_tuple("JsonBody")
                .field(&String::from_utf8_lossy(compact))
                .finish(),
            Repr::Deferred(_) => f.write_str("JsonBody(<deferred>)"),
        }
    }
}

/// Endpoint value for calls that do not warrant their own type.
#[derive(Debug, Clone)]
pub struct BasicEndpoint {
    base_url: Url,
    path: String,
    method: HttpMethod,
    headers: Vec<(String, String)>,
    task: Task,
    timeout: Duration,
}

impl BasicEndpoint {
    pub fn new(method: HttpMethod, base_url: Url, path: impl Into<String>) -> Self {
        Self {
            base_url,
            path: path.into(),
            method,
            headers: Vec::new(),
            task: Task::Plain,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Endpoint rooted at the configured base URL with the configured timeout.
    ///
    /// Returns `None` when the configuration carries no base URL.
    pub fn from_config(
        config: &NetworkConfig,
        method: HttpMethod,
        path: impl Into<String>,
    ) -> Option<Self> {
        let base_url = config.base_url.clone()?;
        Some(Self::new(method, base_url, path).with_timeout(config.timeout()))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.task = task;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Endpoint for BasicEndpoint {
    fn base_url(&self) -> Url {
        self.base_url.clone()
    }

    fn path(&self) -> String {
        self.path.clone()
    }

    fn method(&self) -> HttpMethod {
        self.method
    }

    fn headers(&self) -> Vec<(String, String)> {
        self.headers.clone()
    }

    fn task(&self) -> Task {
        self.task.clone()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
