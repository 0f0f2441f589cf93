// ./crates/turboforms/src/store.rs

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use axum::response::Response;
use cookie::{Cookie, SameSite};
use tracing::warn;

use crate::flash::FlashBag;

// ════════════════════════════════════════════════════════════
// 1. The Store Seam
// ════════════════════════════════════════════════════════════

/// Where the flash for the next full-page render lives between requests.
///
/// `load` yields the flash delivered to the current request; `persist`
/// writes the pending flash onto the outgoing response. `consumed` is true
/// when the current request received a non-empty flash, so the store can
/// discard it once nothing new is pending.
pub trait FlashStore: Send + Sync {
    fn load(&self, headers: &HeaderMap) -> FlashBag;
    fn persist(&self, pending: &FlashBag, consumed: bool, response: &mut Response);
}

/// For hosts that keep the flash in their own session layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFlashStore;

impl FlashStore for NullFlashStore {
    fn load(&self, _headers: &HeaderMap) -> FlashBag {
        FlashBag::new()
    }

    fn persist(&self, _pending: &FlashBag, _consumed: bool, _response: &mut Response) {}
}

// ════════════════════════════════════════════════════════════
// 2. Cookie-backed Flash
// ════════════════════════════════════════════════════════════

/// Keeps the flash in a URL-encoded JSON cookie.
#[derive(Debug, Clone)]
pub struct CookieFlashStore {
    name: String,
}

impl CookieFlashStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn append(&self, response: &mut Response, cookie: Cookie<'static>) {
        if let Ok(header_value) = HeaderValue::from_str(&cookie.to_string()) {
            response.headers_mut().append(SET_COOKIE, header_value);
        }
    }
}

impl FlashStore for CookieFlashStore {
    fn load(&self, headers: &HeaderMap) -> FlashBag {
        let raw = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|c| c.name() == self.name)
            .map(|c| c.value().to_string());

        let Some(raw) = raw else {
            return FlashBag::new();
        };

        let decoded = match urlencoding::decode(&raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(e) => {
                warn!("discarding undecodable flash cookie: {}", e);
                return FlashBag::new();
            }
        };

        serde_json::from_str(&decoded).unwrap_or_else(|e| {
            warn!("discarding malformed flash cookie: {}", e);
            FlashBag::new()
        })
    }

    fn persist(&self, pending: &FlashBag, consumed: bool, response: &mut Response) {
        if !pending.is_empty() {
            match pending.to_json() {
                Ok(json) => {
                    let encoded = urlencoding::encode(&json);
                    let cookie = Cookie::build((self.name.clone(), encoded.into_owned()))
                        .path("/")
                        .same_site(SameSite::Lax)
                        .build();
                    self.append(response, cookie);
                }
                Err(e) => warn!("failed to serialize pending flash: {}", e),
            }
        } else if consumed {
            let mut cookie = Cookie::build((self.name.clone(), "")).path("/").build();
            cookie.make_removal();
            self.append(response, cookie);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    fn cookie_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_persist_then_load() {
        let store = CookieFlashStore::new("turboforms_flash");
        let mut flash = FlashBag::new();
        flash.insert("notice", "Saved; really \"saved\"");

        let mut response = StatusCode::OK.into_response();
        store.persist(&flash, false, &mut response);

        let written = set_cookies(&response);
        assert_eq!(written.len(), 1);
        assert!(written[0].starts_with("turboforms_flash="));
        assert!(written[0].contains("Path=/"));

        let pair = written[0].split(';').next().unwrap();
        let loaded = store.load(&cookie_headers(&format!("session=abc; {}", pair)));
        assert_eq!(loaded, flash);
    }

    #[test]
    fn test_consumed_flash_is_removed() {
        let store = CookieFlashStore::new("turboforms_flash");
        let mut response = StatusCode::OK.into_response();
        store.persist(&FlashBag::new(), true, &mut response);

        let written = set_cookies(&response);
        assert_eq!(written.len(), 1);
        assert!(written[0].starts_with("turboforms_flash=;"));
        assert!(written[0].contains("Max-Age=0"));
    }

    #[test]
    fn test_nothing_pending_nothing_written() {
        let store = CookieFlashStore::new("turboforms_flash");
        let mut response = StatusCode::OK.into_response();
        store.persist(&FlashBag::new(), false, &mut response);
        assert!(set_cookies(&response).is_empty());
    }

    #[test]
    fn test_malformed_cookie_loads_empty() {
        let store = CookieFlashStore::new("turboforms_flash");
        assert!(store.load(&cookie_headers("turboforms_flash=not-json")).is_empty());
        assert!(store.load(&HeaderMap::new()).is_empty());
    }
}
