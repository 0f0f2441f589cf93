// ./crates/turboforms/src/extract.rs

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::Settings;
use crate::dispatch::Turboforms;

/// Header set by browser XHR libraries.
pub const REQUESTED_WITH: &str = "x-requested-with";

// ════════════════════════════════════════════════════════════
// 1. AJAX Intent
// ════════════════════════════════════════════════════════════

/// Whether a request asked for a programmatic response.
///
/// Both halves are required: an XHR marker alone (any other JS library) or
/// the cooperating-client header alone (a forged page load) is not enough.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AjaxSignal {
    pub xhr: bool,
    pub cooperating: bool,
}

impl AjaxSignal {
    pub fn from_headers(headers: &HeaderMap, request_header: &str) -> Self {
        let xhr = headers
            .get(REQUESTED_WITH)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase().contains("xmlhttprequest"))
            .unwrap_or(false);

        // Presence is the test; an empty value still counts.
        let cooperating = headers.contains_key(request_header);

        Self { xhr, cooperating }
    }

    pub fn is_ajax(&self) -> bool {
        self.xhr && self.cooperating
    }
}

// ════════════════════════════════════════════════════════════
// 2. The Extractor
// ════════════════════════════════════════════════════════════

#[async_trait]
impl<S> FromRequestParts<S> for Turboforms
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Settings come from `Settings::layer()`; unconfigured routers get defaults.
        let settings = parts
            .extensions
            .get::<Arc<Settings>>()
            .cloned()
            .unwrap_or_default();

        Ok(Turboforms::new(settings, &parts.headers))
    }
}
