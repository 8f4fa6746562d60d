pub mod auth;
pub mod bookmarks;
pub mod links;
pub mod tags;
pub mod vault;

use axum::http::{header, HeaderMap};

/// Response header names shared across handlers.
pub(crate) const ETAG_HEADER: &str = "etag";

/// Extract the If-Match value, tolerating the HTTP quoting convention.
pub(crate) fn if_match(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::IF_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().trim_matches('"').to_string())
}
