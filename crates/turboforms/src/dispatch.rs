// File: src/dispatch.rs
// Purpose: Per-request interceptor: error rescue, AJAX-aware redirects and flash headers

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::debug;

use crate::classify::{Classify, HasErrors};
use crate::config::Settings;
use crate::error::{Result, TurboformsError, Unrescued};
use crate::extract::AjaxSignal;
use crate::flash::{extract, FlashBag, ResponseOptions};

// ============================================================================
// RedirectTarget
// ============================================================================

/// Where a redirect points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// A URL or path, sent as given.
    Location(String),
    /// The request's `Referer`, or `fallback` when there is none.
    Back { fallback: Option<String> },
}

impl RedirectTarget {
    pub fn back() -> Self {
        RedirectTarget::Back { fallback: None }
    }

    pub fn back_or(fallback: impl Into<String>) -> Self {
        RedirectTarget::Back {
            fallback: Some(fallback.into()),
        }
    }
}

impl From<&str> for RedirectTarget {
    fn from(location: &str) -> Self {
        RedirectTarget::Location(location.to_string())
    }
}

impl From<String> for RedirectTarget {
    fn from(location: String) -> Self {
        RedirectTarget::Location(location)
    }
}

// ============================================================================
// Turboforms
// ============================================================================

/// Request-scoped interceptor. Obtain it as an Axum extractor:
///
/// ```ignore
/// async fn create(mut turbo: Turboforms, Form(input): Form<NewPost>) -> Result<Response, AppError> {
///     let post = match Post::create(input) {
///         Ok(post) => post,
///         Err(e) => return Ok(turbo.rescue(e)?),
///     };
///     Ok(turbo.redirect_to(format!("/posts/{}", post.id), ResponseOptions::new().notice("Created"))?)
/// }
/// ```
#[derive(Debug)]
pub struct Turboforms {
    settings: Arc<Settings>,
    signal: AjaxSignal,
    referer: Option<String>,
    committed: bool,
    /// Flash for the next full render.
    flash: FlashBag,
    /// Flash delivered to this request.
    incoming: FlashBag,
}

impl Turboforms {
    pub fn new(settings: Arc<Settings>, headers: &HeaderMap) -> Self {
        let signal = AjaxSignal::from_headers(headers, &settings.config.request_header);
        let referer = headers
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let incoming = settings.store.load(headers);

        Self {
            settings,
            signal,
            referer,
            committed: false,
            flash: FlashBag::new(),
            incoming,
        }
    }

    pub fn signal(&self) -> AjaxSignal {
        self.signal
    }

    pub fn is_ajax(&self) -> bool {
        self.signal.is_ajax()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Pending flash, shown on the next full-page render.
    pub fn flash_mut(&mut self) -> &mut FlashBag {
        &mut self.flash
    }

    pub fn flash(&self) -> &FlashBag {
        &self.flash
    }

    /// Flash carried into this request by the previous one.
    pub fn flash_now(&self) -> &FlashBag {
        &self.incoming
    }

    // -- Error path --

    /// Translate a classified error into a JSON response for AJAX clients.
    ///
    /// Hands the error back untouched when the request is not AJAX, or when
    /// its kind is not registered; the host's own error handling applies then.
    /// Once this context has answered the request it builds nothing further
    /// and fails with [`TurboformsError::DoubleResponse`].
    pub fn rescue<E: Classify>(&mut self, err: E) -> std::result::Result<Response, Unrescued<E>> {
        if !self.signal.is_ajax() {
            return Err(Unrescued::Propagate(err));
        }

        let Some(kind) = err.kind() else {
            return Err(Unrescued::Propagate(err));
        };
        let Some(status) = self.settings.classification.status_for(&kind) else {
            return Err(Unrescued::Propagate(err));
        };
        self.commit()?;

        let response = match err.record_errors() {
            Some(messages) => json_errors(StatusCode::UNPROCESSABLE_ENTITY, messages),
            None => json_errors(status, vec![err.message()]),
        };

        debug!(kind = %kind, status = %response.status(), "rescued classified error");
        Ok(self.finish(response))
    }

    /// Apply [`rescue`](Self::rescue) to the error arm of a handler result.
    pub fn respond<T, E>(&mut self, result: std::result::Result<T, E>) -> std::result::Result<Response, Unrescued<E>>
    where
        T: IntoResponse,
        E: Classify,
    {
        match result {
            Ok(value) => {
                self.commit()?;
                Ok(self.finish(value.into_response()))
            }
            Err(err) => self.rescue(err),
        }
    }

    /// 422 with the record's messages as a JSON array.
    pub fn render_errors_for<R: HasErrors + ?Sized>(&mut self, record: &R) -> Result<Response> {
        self.commit()?;
        let response = json_errors(StatusCode::UNPROCESSABLE_ENTITY, record.full_messages());
        Ok(self.finish(response))
    }

    // -- Redirect path --

    /// Redirect, or for AJAX requests acknowledge with the target in `Location`
    /// and the flash in the flash header on an empty 200.
    ///
    /// Either way the extracted flash is merged into the pending flash, so a
    /// follow-up full-page navigation still shows it.
    pub fn redirect_to(
        &mut self,
        target: impl Into<RedirectTarget>,
        mut options: ResponseOptions,
    ) -> Result<Response> {
        let location = self.resolve_location(target.into())?;
        if self.committed {
            return Err(TurboformsError::DoubleResponse);
        }

        let flash = extract(&mut options, &self.settings.config.flash_types);
        let location_value = header_value(header::LOCATION.as_str(), location.as_bytes())?;

        let response = if self.signal.is_ajax() {
            debug!(%location, "ajax redirect answered with flash header");
            let mut response = self.flash_head(&flash)?;
            response.headers_mut().insert(header::LOCATION, location_value);
            response
        } else {
            let status = self.redirect_status(&mut options)?;
            debug!(%location, %status, "conventional redirect");
            let mut response = status.into_response();
            response.headers_mut().insert(header::LOCATION, location_value);
            response
        };

        self.flash.update(&flash);
        self.commit()?;
        Ok(self.finish(response))
    }

    /// Empty 200 carrying the flash header, for endpoints with nothing to render.
    pub fn head_success(&mut self, mut options: ResponseOptions) -> Result<Response> {
        if self.committed {
            return Err(TurboformsError::DoubleResponse);
        }

        let flash = extract(&mut options, &self.settings.config.flash_types);
        let response = self.flash_head(&flash)?;

        self.commit()?;
        Ok(self.finish(response))
    }

    /// Write the pending flash through the flash store onto `response`.
    pub fn finish(&self, mut response: Response) -> Response {
        self.settings
            .store
            .persist(&self.flash, !self.incoming.is_empty(), &mut response);
        response
    }

    /// Mark the request as answered; a second answer is refused.
    fn commit(&mut self) -> Result<()> {
        if self.committed {
            return Err(TurboformsError::DoubleResponse);
        }
        self.committed = true;
        Ok(())
    }

    /// The `status` option, or the configured default; only 3xx statuses qualify.
    fn redirect_status(&self, options: &mut ResponseOptions) -> Result<StatusCode> {
        let descriptor = options
            .take_status()
            .unwrap_or_else(|| self.settings.config.redirect_status.clone());
        descriptor
            .resolve()
            .filter(StatusCode::is_redirection)
            .ok_or_else(|| TurboformsError::InvalidRedirectStatus(format!("{:?}", descriptor)))
    }

    fn resolve_location(&self, target: RedirectTarget) -> Result<String> {
        match target {
            RedirectTarget::Location(location) if location.trim().is_empty() => Err(
                TurboformsError::InvalidTarget("an empty location".to_string()),
            ),
            RedirectTarget::Location(location) => Ok(location),
            RedirectTarget::Back { fallback } => self
                .referer
                .clone()
                .filter(|r| !r.trim().is_empty())
                .or(fallback)
                .ok_or_else(|| TurboformsError::InvalidTarget("back without a referer".to_string())),
        }
    }

    fn flash_head(&self, flash: &FlashBag) -> Result<Response> {
        let mut response = StatusCode::OK.into_response();
        if flash.is_empty() && self.settings.config.omit_empty_flash_header {
            return Ok(response);
        }

        let name = &self.settings.config.flash_header;
        let json = flash.to_json()?;
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| TurboformsError::InvalidHeader {
            name: name.clone(),
            value: json.clone(),
        })?;
        response
            .headers_mut()
            .insert(header_name, header_value(name, json.as_bytes())?);
        Ok(response)
    }
}

fn header_value(name: &str, value: &[u8]) -> Result<HeaderValue> {
    HeaderValue::from_bytes(value).map_err(|_| TurboformsError::InvalidHeader {
        name: name.to_string(),
        value: String::from_utf8_lossy(value).into_owned(),
    })
}

fn json_errors(status: StatusCode, messages: Vec<String>) -> Response {
    (status, Json(messages)).into_response()
}
