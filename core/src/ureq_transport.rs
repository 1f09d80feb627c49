//! Blocking `ureq` agent behind the async `Transport` contract.
//!
//! # Design
//! Each call builds a fresh agent configured with the request's timeout and
//! with status-as-error disabled, so 4xx/5xx come back as data and the
//! pipeline owns status interpretation. The blocking round-trip runs on
//! tokio's blocking pool.

use async_trait::async_trait;
use ureq::Agent;

use crate::error::{BoxError, Cancelled};
use crate::http::{Headers, HttpRequest, HttpResponse};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        UreqTransport
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError> {
        let request = request.clone();
        match tokio::task::spawn_blocking(move || execute(&request)).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_cancelled() => Err(Cancelled.into()),
            Err(err) => Err(err.into()),
        }
    }
}

fn execute(request: &HttpRequest) -> Result<HttpResponse, BoxError> {
    let agent = Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(request.timeout))
        .build()
        .new_agent();

    let mut builder = ureq::http::Request::builder()
        .method(request.method.as_str())
        .uri(request.url.as_str());
    for (name, value) in request.headers.iter() {
        builder = builder.header(name, value);
    }

    let mut response = match &request.body {
        Some(body) => agent.run(builder.body(body.clone())?)?,
        None => agent.run(builder.body(())?)?,
    };

    let status = response.status().as_u16();
    let headers: Headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
        .collect();
    let body = response.body_mut().read_to_vec()?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}
