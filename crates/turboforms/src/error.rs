// File: src/error.rs
// Purpose: Failures raised by the interceptor itself (not the host's domain errors)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TurboformsError>;

#[derive(Debug, Error)]
pub enum TurboformsError {
    /// Redirect target was empty, or `back` had neither a referer nor a fallback.
    #[error("cannot redirect to {0}")]
    InvalidTarget(String),

    /// A response was already produced through this request context.
    #[error("render and/or redirect were called multiple times in this action; respond at most once per request")]
    DoubleResponse,

    /// Conventional redirects need a resolvable 3xx status.
    #[error("invalid redirect status {0}")]
    InvalidRedirectStatus(String),

    #[error("invalid header {name}: {value:?}")]
    InvalidHeader { name: String, value: String },

    #[error("failed to serialize flash: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Why [`crate::Turboforms::rescue`] or [`crate::Turboforms::respond`] built no response.
#[derive(Debug)]
pub enum Unrescued<E> {
    /// Not intercepted; the host's own error handling applies to the error, unchanged.
    Propagate(E),
    /// The interceptor refused, e.g. because the request was already answered.
    Dispatch(TurboformsError),
}

impl<E> Unrescued<E> {
    /// The host error, when it was handed back.
    pub fn propagated(self) -> Option<E> {
        match self {
            Unrescued::Propagate(err) => Some(err),
            Unrescued::Dispatch(_) => None,
        }
    }
}

impl<E> From<TurboformsError> for Unrescued<E> {
    fn from(err: TurboformsError) -> Self {
        Unrescued::Dispatch(err)
    }
}

impl<E: std::fmt::Display> std::fmt::Display for Unrescued<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unrescued::Propagate(err) => std::fmt::Display::fmt(err, f),
            Unrescued::Dispatch(err) => std::fmt::Display::fmt(err, f),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Unrescued<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Unrescued::Propagate(err) => Some(err),
            Unrescued::Dispatch(err) => Some(err),
        }
    }
}

impl IntoResponse for TurboformsError {
    fn into_response(self) -> Response {
        tracing::error!("turboforms dispatch failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
    }
}
