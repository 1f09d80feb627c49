//! Masking of secrets in log output.
//!
//! Header values are redacted by exact (case-sensitive) name. Free text goes
//! through `redact_text`, which masks `Authorization:` lines, `Bearer`
//! tokens and JSON `"token"` values.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::http::Headers;

pub const REDACTED: &str = "<redacted>";

/// Header names redacted when no explicit set is configured.
pub const DEFAULT_SENSITIVE_HEADERS: [&str; 7] = [
    "Authorization",
    "Cookie",
    "Set-Cookie",
    "X-Api-Key",
    "X-API-Key",
    "Api-Key",
    "API-Key",
];

/// Default cap on bytes shown for a body preview.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2_048;

static TEXT_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)(Authorization:\s*)(.+)", "${1}<redacted>"),
        (r"(?i)(Bearer\s+)([A-Za-z0-9\-._~+/]+=*)", "${1}<redacted>"),
        (r#"(?i)(token"?\s*:\s*")([^"]+)(")"#, "${1}<redacted>${3}"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

pub fn default_sensitive_headers() -> HashSet<String> {
    DEFAULT_SENSITIVE_HEADERS.iter().map(|h| h.to_string()).collect()
}

/// Copy of `headers` with every sensitive value replaced by `<redacted>`.
pub fn redact_headers(headers: &Headers, sensitive: &HashSet<String>) -> Headers {
    headers
        .iter()
        .map(|(name, value)| {
            if sensitive.contains(name) {
                (name, REDACTED)
            } else {
                (name, value)
            }
        })
        .collect()
}

pub fn redact_text(text: &str) -> String {
    let mut redacted = text.to_string();
    for (re, replacement) in TEXT_PATTERNS.iter() {
        redacted = re.replace_all(&redacted, *replacement).into_owned();
    }
    redacted
}

/// Printable, redacted preview of `body`, at most `max_bytes` long.
///
/// The whole body is rendered and redacted before it is clipped, so a
/// secret that straddles the cut is masked like any other. Rendering
/// pretty-prints JSON, falls back to UTF-8 text (dropping a trailing code
/// point cut in half), and finally to a `<N bytes>` placeholder.
pub fn safe_body_string(body: &[u8], max_bytes: usize) -> String {
    if body.is_empty() || max_bytes == 0 {
        return String::new();
    }
    let rendered = match render(body) {
        Some(text) => redact_text(&text),
        None => return format!("<{} bytes>", body.len().min(max_bytes)),
    };
    clip(&rendered, max_bytes).to_string()
}

fn render(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Ok(pretty) = serde_json::to_string_pretty(&value) {
            return Some(pretty);
        }
    }
    match std::str::from_utf8(body) {
        Ok(text) => Some(text.to_string()),
        Err(err) if err.error_len().is_none() && err.valid_up_to() > 0 => {
            Some(String::from_utf8_lossy(&body[..err.valid_up_to()]).into_owned())
        }
        Err(_) => None,
    }
}

/// Truncates to at most `max` bytes on a char boundary.
pub(crate) fn clip(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
