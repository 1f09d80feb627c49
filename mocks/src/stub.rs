use std::collections::HashMap;

use async_trait::async_trait;
use courier_core::{BoxError, Headers, HttpMethod, HttpRequest, HttpResponse, NetworkError, Transport};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Canned response returned by the mock transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stub {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Stub {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    pub fn success(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    /// Non-2xx stub. For transport-level failures use an empty
    /// `SequencedMockTransport` or a custom transport.
    pub fn failure(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status, body)
    }

    pub fn json<T: Serialize + ?Sized>(status: u16, value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(status, serde_json::to_vec(value)?).with_header("Content-Type", "application/json"))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub(crate) fn to_response(&self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// How `MockTransport` derives the lookup key from a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchRule {
    /// `<URL>`
    Url,
    /// `<METHOD> <URL>`
    #[default]
    MethodAndUrl,
}

impl MatchRule {
    fn key(self, method: HttpMethod, url: &str) -> String {
        match self {
            MatchRule::Url => url.to_string(),
            MatchRule::MethodAndUrl => format!("{method} {url}"),
        }
    }
}

#[derive(Debug, Error)]
#[error("no stub registered for request: {key}")]
pub struct MissingStub {
    pub key: String,
}

#[derive(Default)]
struct State {
    stubs: HashMap<String, Stub>,
    received: Vec<HttpRequest>,
}

/// Transport that answers from registered stubs without touching the network.
///
/// Unregistered keys fail with `NetworkError::Transport(MissingStub)`.
#[derive(Default)]
pub struct MockTransport {
    rule: MatchRule,
    state: Mutex<State>,
}

impl MockTransport {
    pub fn new(rule: MatchRule) -> Self {
        Self {
            rule,
            state: Mutex::new(State::default()),
        }
    }

    /// Registers `stub` for `method` + `url`. The URL goes through
    /// `Url::parse` first so it matches the builder's serialization.
    pub fn register(&self, method: HttpMethod, url: &str, stub: Stub) {
        let normalized = Url::parse(url)
            .map(String::from)
            .unwrap_or_else(|_| url.to_string());
        let key = self.rule.key(method, &normalized);
        self.state.lock().stubs.insert(key, stub);
    }

    pub fn register_request(&self, request: &HttpRequest, stub: Stub) {
        let key = self.key_for(request);
        self.state.lock().stubs.insert(key, stub);
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().received.clone()
    }

    pub fn key_for(&self, request: &HttpRequest) -> String {
        self.rule.key(request.method, request.url.as_str())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError> {
        let key = self.key_for(request);
        let stub = {
            let mut state = self.state.lock();
            state.received.push(request.clone());
            state.stubs.get(&key).cloned()
        };
        match stub {
            Some(stub) => Ok(stub.to_response()),
            None => Err(Box::new(NetworkError::transport(MissingStub { key }))),
        }
    }
}
