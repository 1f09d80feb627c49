//! Request/response logging plugin.
//!
//! # Design
//! The plugin formats human-readable lines and hands them to a `LogSink`.
//! The default sink forwards each line to `tracing`; tests install a
//! capturing sink. Header values listed as sensitive never reach the sink,
//! and every body preview and failure line passes through `redact_text`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BoxError, NetworkError};
use crate::http::{Headers, HttpRequest};
use crate::plugin::{Plugin, ReceiveResult};
use crate::redaction::{
    clip, default_sensitive_headers, redact_headers, redact_text, safe_body_string,
    DEFAULT_MAX_BODY_BYTES,
};

/// How much the logger emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    None,
    #[default]
    Basic,
    Verbose,
}

impl LogLevel {
    pub fn is_enabled(self) -> bool {
        self != LogLevel::None
    }
}

/// Destination for formatted log lines.
pub trait LogSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Forwards lines to `tracing` at info level under the `courier` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, line: &str) {
        tracing::info!(target: "courier", "{line}");
    }
}

/// Logs requests on `prepare` and outcomes on `did_receive`.
pub struct LoggerPlugin {
    level: LogLevel,
    redact_headers: HashSet<String>,
    max_body_bytes: usize,
    sink: Arc<dyn LogSink>,
}

impl LoggerPlugin {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            redact_headers: default_sensitive_headers(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            sink: Arc::new(TracingSink),
        }
    }

    /// Replaces the set of header names whose values are masked.
    pub fn redact_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redact_headers = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    fn emit_headers(&self, headers: &Headers) {
        if headers.is_empty() {
            return;
        }
        self.sink.emit("  headers:");
        for (name, value) in redact_headers(headers, &self.redact_headers).iter() {
            let line = redact_text(&format!("{name}: {value}"));
            let line = clip(&line, name.len() + 2 + self.max_body_bytes);
            self.sink.emit(&format!("    {line}"));
        }
    }

    fn emit_body(&self, label: &str, body: &[u8]) {
        if body.is_empty() {
            return;
        }
        let shown = body.len().min(self.max_body_bytes);
        let preview = safe_body_string(body, self.max_body_bytes);
        self.sink
            .emit(&format!("  {label} ({shown} of {} bytes): {preview}", body.len()));
    }
}

#[async_trait]
impl Plugin for LoggerPlugin {
    async fn prepare(&self, request: &mut HttpRequest) -> Result<(), BoxError> {
        if !self.level.is_enabled() {
            return Ok(());
        }
        self.sink
            .emit(&format!("--> {} {}", request.method, request.url));
        if self.level == LogLevel::Verbose {
            self.emit_headers(&request.headers);
            if let Some(body) = &request.body {
                self.emit_body("body", body);
            }
        }
        Ok(())
    }

    async fn did_receive(
        &self,
        result: ReceiveResult<'_>,
        request: &HttpRequest,
    ) -> Result<(), BoxError> {
        if !self.level.is_enabled() {
            return Ok(());
        }
        let (method, url) = (request.method, &request.url);
        match result {
            Ok(response) => {
                self.sink.emit(&format!(
                    "<-- {method} {url} {} ({} bytes)",
                    response.status,
                    response.body.len()
                ));
                if self.level == LogLevel::Verbose {
                    self.emit_headers(&response.headers);
                    self.emit_body("response", &response.body);
                }
            }
            Err(err) => {
                let line = match err {
                    NetworkError::Http { status, body, .. } => {
                        format!("<-- {method} {url} {status} ({} bytes) failed: {err}", body.len())
                    }
                    _ => format!("<-- {method} {url} failed: {err}"),
                };
                self.sink.emit(&redact_text(&line));
                if let (LogLevel::Verbose, NetworkError::Http { body, .. }) = (self.level, err) {
                    self.emit_body("response", body);
                }
            }
        }
        Ok(())
    }
}
