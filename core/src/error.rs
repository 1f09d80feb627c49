//! Error taxonomy for the client pipeline.
//!
//! # Design
//! Every failure lands in exactly one `NetworkError` variant at the
//! classification step. Callers branch on the variant; the boxed causes are
//! kept for diagnostics only. Transports and plugins report failures as a
//! `BoxError`, which the classifier either passes through (when it already is
//! a `NetworkError`), maps to `Cancelled`, or wraps as `Transport`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::builder::BuildError;

/// Type-erased error returned by transports and plugins.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Structured error body returned by the backend.
///
/// Decoded best-effort from non-2xx bodies; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Marker error a transport returns when its work was cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Errors produced by `Client` when a request fails.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("invalid response")]
    InvalidResponse,

    /// The server answered with a status outside `200..=299`.
    #[error("HTTP {status}{}", describe_payload(.payload))]
    Http {
        status: u16,
        payload: Option<ErrorPayload>,
        body: Vec<u8>,
    },

    #[error("response could not be decoded: {0}")]
    Decoding(#[source] serde_json::Error),

    #[error("transport failed: {0}")]
    Transport(#[source] BoxError),

    #[error("invalid request: {0}")]
    InvalidRequest(#[source] BuildError),

    #[error("request cancelled")]
    Cancelled,

    #[error("unknown failure: {0}")]
    Unknown(#[source] BoxError),
}

fn describe_payload(payload: &Option<ErrorPayload>) -> String {
    match payload {
        Some(ErrorPayload {
            message: Some(message),
            code: Some(code),
        }) => format!(": {message} ({code})"),
        Some(ErrorPayload {
            message: Some(message),
            code: None,
        }) => format!(": {message}"),
        Some(ErrorPayload {
            message: None,
            code: Some(code),
        }) => format!(" ({code})"),
        _ => String::new(),
    }
}

/// Fieldless mirror of `NetworkError` for matching and recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidResponse,
    Http,
    Decoding,
    Transport,
    InvalidRequest,
    Cancelled,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::Http => "http",
            ErrorKind::Decoding => "decoding",
            ErrorKind::Transport => "transport",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl NetworkError {
    /// Wraps any error as a transport failure.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        NetworkError::Transport(err.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NetworkError::InvalidResponse => ErrorKind::InvalidResponse,
            NetworkError::Http { .. } => ErrorKind::Http,
            NetworkError::Decoding(_) => ErrorKind::Decoding,
            NetworkError::Transport(_) => ErrorKind::Transport,
            NetworkError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            NetworkError::Cancelled => ErrorKind::Cancelled,
            NetworkError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            NetworkError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn backend_message(&self) -> Option<&str> {
        match self {
            NetworkError::Http { payload, .. } => payload.as_ref()?.message.as_deref(),
            _ => None,
        }
    }

    pub fn backend_code(&self) -> Option<&str> {
        match self {
            NetworkError::Http { payload, .. } => payload.as_ref()?.code.as_deref(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, NetworkError::Cancelled)
    }

    /// Classifies an error raised by a transport or a plugin.
    pub(crate) fn classify(err: BoxError) -> Self {
        if err.is::<Cancelled>() {
            return NetworkError::Cancelled;
        }
        match err.downcast::<NetworkError>() {
            Ok(err) => *err,
            Err(err) => NetworkError::Transport(err),
        }
    }
}

/// `true` when `err` belongs to the cancellation class.
pub(crate) fn is_cancellation(err: &BoxError) -> bool {
    err.is::<Cancelled>()
        || matches!(err.downcast_ref::<NetworkError>(), Some(NetworkError::Cancelled))
}
