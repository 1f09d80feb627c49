//! HTTP data types that flow through the pipeline.
//!
//! # Design
//! Requests and responses are plain data. The builder produces an
//! `HttpRequest`, plugins may mutate it, and a `Transport` turns it into an
//! `HttpResponse`. Nothing here performs I/O.
//!
//! All fields use owned types (`String`, `Vec`, `Url`) so values can be
//! cloned into recorders and moved across tasks without lifetime concerns.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Timeout applied when an endpoint does not override it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Canonical uppercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Methods whose repeated execution has the same effect as a single one.
    pub fn is_idempotent(self) -> bool {
        !matches!(self, HttpMethod::Post | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a method name that is not one of the supported seven.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported HTTP method: {0}")]
pub struct ParseMethodError(pub String);

impl FromStr for HttpMethod {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(ParseMethodError(s.to_string())),
        }
    }
}

/// Ordered header list with case-insensitive lookup.
///
/// Names keep the case they were set with. Setting a name that already
/// exists (ignoring ASCII case) replaces the earlier entry in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => self.0[index] = (name, value),
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|index| self.0[index].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|index| self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.set(name, value);
        }
        headers
    }
}

/// An HTTP request described as plain data.
///
/// Built by `RequestBuilder::build`, then threaded through every plugin's
/// `prepare` hook before a `Transport` executes it.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

impl HttpRequest {
    /// A bare request with no headers, no body and the default timeout.
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// An HTTP response described as plain data.
///
/// Carries the body alongside status and headers, so a transport hands back
/// a single value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_wire_names_are_uppercase() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Options.to_string(), "OPTIONS");
        assert_eq!(HttpMethod::Patch.as_str(), "PATCH");
    }

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("delete".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
        assert_eq!("Head".parse::<HttpMethod>().unwrap(), HttpMethod::Head);
        let err = "TRACE".parse::<HttpMethod>().unwrap_err();
        assert_eq!(err, ParseMethodError("TRACE".to_string()));
    }

    #[test]
    fn post_and_patch_are_not_idempotent() {
        assert!(!HttpMethod::Post.is_idempotent());
        assert!(!HttpMethod::Patch.is_idempotent());
        assert!(HttpMethod::Put.is_idempotent());
        assert!(HttpMethod::Get.is_idempotent());
    }

    #[test]
    fn headers_set_replaces_case_insensitively() {
        let mut headers = Headers::new();
        headers.set("content-type", "text/plain");
        headers.set("X-Test", "1");
        headers.set("Content-Type", "application/json");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        let names: Vec<&str> = headers.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["Content-Type", "X-Test"]);
    }

    #[test]
    fn headers_remove_returns_value() {
        let mut headers: Headers = [("A", "1"), ("B", "2")].into_iter().collect();
        assert_eq!(headers.remove("a").as_deref(), Some("1"));
        assert!(!headers.contains("A"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn success_range_is_inclusive() {
        assert!(HttpResponse::new(200, Vec::new()).is_success());
        assert!(HttpResponse::new(299, Vec::new()).is_success());
        assert!(!HttpResponse::new(199, Vec::new()).is_success());
        assert!(!HttpResponse::new(300, Vec::new()).is_success());
    }
}
