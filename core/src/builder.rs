//! Turns an `Endpoint` into an `HttpRequest`.
//!
//! # Design
//! The builder is deterministic: the same endpoint always yields the same
//! URL, method, headers and body bytes. It never reaches the network and
//! fails only with `BuildError`, which the client wraps as
//! `NetworkError::InvalidRequest`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::endpoint::{Endpoint, Task};
use crate::http::{Headers, HttpRequest};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const APPLICATION_JSON: &str = "application/json";

/// Errors produced while building a request.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("endpoint URL cannot carry a path or query")]
    InvalidUrl,

    #[error("request body could not be encoded as JSON: {0}")]
    InvalidBody(#[source] serde_json::Error),
}

/// JSON output style used for `Task::Encoded` bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonEncoder {
    #[default]
    Compact,
    Pretty,
}

impl JsonEncoder {
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            JsonEncoder::Compact => serde_json::to_vec(value),
            JsonEncoder::Pretty => serde_json::to_vec_pretty(value),
        }
    }
}

/// Builds an `HttpRequest` from an `Endpoint`: URL with optional query,
/// method, headers and body.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestBuilder {
    encoder: JsonEncoder,
}

impl RequestBuilder {
    pub fn new(encoder: JsonEncoder) -> Self {
        Self { encoder }
    }

    pub fn encoder(&self) -> JsonEncoder {
        self.encoder
    }

    pub fn build<E: Endpoint + ?Sized>(&self, endpoint: &E) -> Result<HttpRequest, BuildError> {
        let task = endpoint.task();
        let mut url = append_path(endpoint.base_url(), &endpoint.path())?;

        if let Task::Query(items) = &task {
            if url.cannot_be_a_base() {
                return Err(BuildError::InvalidUrl);
            }
            url.query_pairs_mut()
                .extend_pairs(items.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        let mut request = HttpRequest {
            method: endpoint.method(),
            url,
            headers: endpoint.headers().into_iter().collect::<Headers>(),
            body: None,
            timeout: endpoint.timeout(),
        };

        match task {
            Task::Plain | Task::Query(_) => {}
            Task::RawBytes(bytes) => request.body = Some(bytes),
            Task::Encoded(body) => {
                request.headers.set(CONTENT_TYPE, APPLICATION_JSON);
                let bytes = body.encode(self.encoder).map_err(BuildError::InvalidBody)?;
                request.body = Some(bytes);
            }
        }

        Ok(request)
    }
}

/// Appends `path` as a path component. Slashes are joined, not normalized:
/// a leading slash in `path` after a base ending in `/` yields `//`.
fn append_path(mut url: Url, path: &str) -> Result<Url, BuildError> {
    if path.is_empty() {
        return Ok(url);
    }
    if url.cannot_be_a_base() {
        return Err(BuildError::InvalidUrl);
    }
    let joined = if url.path().ends_with('/') {
        format!("{}{path}", url.path())
    } else {
        format!("{}/{path}", url.path())
    };
    url.set_path(&joined);
    Ok(url)
}
