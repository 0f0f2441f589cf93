// File: src/classify.rs
// Purpose: Error kind registry mapping interceptable failures to HTTP statuses

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

// ============================================================================
// ErrorKind
// ============================================================================

/// Stable tag for a failure the interceptor may translate into a status code.
///
/// Kinds are never inferred from type names: an error is only interceptable
/// when it reports a kind through [`Classify::kind`] and that kind is
/// registered in the [`ErrorClassification`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Eof,
    ConnectionReset,
    InvalidArgument,
    Timeout,
    BadResponse,
    HeaderSyntax,
    Protocol,
    RecordNotFound,
    StaleObject,
    RecordInvalid,
    RecordNotSaved,
    StrictValidationFailed,
    MissingAttribute,
    /// Application-defined kind, registered by name.
    Custom(String),
}

impl ErrorKind {
    pub const BUILTIN: [ErrorKind; 13] = [
        ErrorKind::Eof,
        ErrorKind::ConnectionReset,
        ErrorKind::InvalidArgument,
        ErrorKind::Timeout,
        ErrorKind::BadResponse,
        ErrorKind::HeaderSyntax,
        ErrorKind::Protocol,
        ErrorKind::RecordNotFound,
        ErrorKind::StaleObject,
        ErrorKind::RecordInvalid,
        ErrorKind::RecordNotSaved,
        ErrorKind::StrictValidationFailed,
        ErrorKind::MissingAttribute,
    ];

    pub fn name(&self) -> &str {
        match self {
            ErrorKind::Eof => "Eof",
            ErrorKind::ConnectionReset => "ConnectionReset",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::BadResponse => "BadResponse",
            ErrorKind::HeaderSyntax => "HeaderSyntax",
            ErrorKind::Protocol => "Protocol",
            ErrorKind::RecordNotFound => "RecordNotFound",
            ErrorKind::StaleObject => "StaleObject",
            ErrorKind::RecordInvalid => "RecordInvalid",
            ErrorKind::RecordNotSaved => "RecordNotSaved",
            ErrorKind::StrictValidationFailed => "StrictValidationFailed",
            ErrorKind::MissingAttribute => "MissingAttribute",
            ErrorKind::Custom(name) => name,
        }
    }

    /// Parse a kind name as written in `turboforms.toml`.
    /// Unknown names become [`ErrorKind::Custom`].
    pub fn from_name(name: &str) -> Self {
        Self::BUILTIN
            .iter()
            .find(|kind| kind.name() == name)
            .cloned()
            .unwrap_or_else(|| ErrorKind::Custom(name.to_string()))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// StatusDescriptor
// ============================================================================

/// A status written either as a number or as a snake_case reason phrase
/// (`not_found`, `unprocessable_entity`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusDescriptor {
    Code(u16),
    Named(String),
}

impl StatusDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        StatusDescriptor::Named(name.into())
    }

    /// `None` when the code is out of range or the name is unknown.
    pub fn resolve(&self) -> Option<StatusCode> {
        match self {
            StatusDescriptor::Code(code) => StatusCode::from_u16(*code).ok(),
            StatusDescriptor::Named(name) => status_from_name(name),
        }
    }

    pub fn resolve_or_default(&self) -> StatusCode {
        self.resolve().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<u16> for StatusDescriptor {
    fn from(code: u16) -> Self {
        StatusDescriptor::Code(code)
    }
}

impl From<StatusCode> for StatusDescriptor {
    fn from(status: StatusCode) -> Self {
        StatusDescriptor::Code(status.as_u16())
    }
}

impl From<&str> for StatusDescriptor {
    fn from(name: &str) -> Self {
        StatusDescriptor::Named(name.to_string())
    }
}

fn symbolize(reason: &str) -> String {
    reason
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// Resolve a symbolic status name against the canonical reason phrases,
/// e.g. `request_timeout` → 408, `im_a_teapot` → 418.
pub fn status_from_name(name: &str) -> Option<StatusCode> {
    let wanted = symbolize(name.trim());
    (100u16..600)
        .filter_map(|code| StatusCode::from_u16(code).ok())
        .find(|status| status.canonical_reason().map(symbolize).as_deref() == Some(wanted.as_str()))
}

// ============================================================================
// ErrorClassification
// ============================================================================

/// Ordered registry of interceptable kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorClassification {
    entries: Vec<(ErrorKind, StatusDescriptor)>,
}

impl ErrorClassification {
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Add a kind, or replace the status of an already registered one in place.
    pub fn register(&mut self, kind: ErrorKind, status: impl Into<StatusDescriptor>) -> &mut Self {
        let status = status.into();
        match self.entries.iter_mut().find(|(k, _)| *k == kind) {
            Some(entry) => entry.1 = status,
            None => self.entries.push((kind, status)),
        }
        self
    }

    pub fn contains(&self, kind: &ErrorKind) -> bool {
        self.entries.iter().any(|(k, _)| k == kind)
    }

    pub fn descriptor(&self, kind: &ErrorKind) -> Option<&StatusDescriptor> {
        self.entries.iter().find(|(k, _)| k == kind).map(|(_, s)| s)
    }

    /// Status for a registered kind; `None` means the kind is not interceptable.
    /// Registered descriptors that do not resolve fall back to 500.
    pub fn status_for(&self, kind: &ErrorKind) -> Option<StatusCode> {
        self.descriptor(kind).map(StatusDescriptor::resolve_or_default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ErrorKind, &StatusDescriptor)> {
        self.entries.iter().map(|(k, s)| (k, s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ErrorClassification {
    fn default() -> Self {
        let mut table = Self::empty();
        table
            .register(ErrorKind::Eof, 500)
            .register(ErrorKind::ConnectionReset, 500)
            .register(ErrorKind::InvalidArgument, 500)
            .register(ErrorKind::Timeout, "request_timeout")
            .register(ErrorKind::BadResponse, 500)
            .register(ErrorKind::HeaderSyntax, 500)
            .register(ErrorKind::Protocol, 500)
            .register(ErrorKind::RecordNotFound, "not_found")
            .register(ErrorKind::StaleObject, "conflict")
            .register(ErrorKind::RecordInvalid, "unprocessable_entity")
            .register(ErrorKind::RecordNotSaved, "unprocessable_entity")
            .register(ErrorKind::StrictValidationFailed, "unprocessable_entity")
            .register(ErrorKind::MissingAttribute, "unprocessable_entity");
        table
    }
}

// ============================================================================
// Classify
// ============================================================================

/// A validation record exposing human-readable error messages.
pub trait HasErrors {
    fn full_messages(&self) -> Vec<String>;
}

impl HasErrors for Vec<String> {
    fn full_messages(&self) -> Vec<String> {
        self.clone()
    }
}

impl HasErrors for [&str] {
    fn full_messages(&self) -> Vec<String> {
        self.iter().map(|m| m.to_string()).collect()
    }
}

/// Implemented by errors a handler may hand to [`crate::Turboforms::rescue`].
pub trait Classify: fmt::Display {
    /// `None` marks the error as unclassified; it will always propagate.
    fn kind(&self) -> Option<ErrorKind>;

    fn message(&self) -> String {
        self.to_string()
    }

    /// Field-level messages of an attached validation record, if any.
    fn record_errors(&self) -> Option<Vec<String>> {
        None
    }
}

impl Classify for io::Error {
    fn kind(&self) -> Option<ErrorKind> {
        match io::Error::kind(self) {
            io::ErrorKind::UnexpectedEof => Some(ErrorKind::Eof),
            io::ErrorKind::ConnectionReset => Some(ErrorKind::ConnectionReset),
            io::ErrorKind::InvalidInput => Some(ErrorKind::InvalidArgument),
            io::ErrorKind::TimedOut => Some(ErrorKind::Timeout),
            _ => None,
        }
    }
}

/// General-purpose classified failure for handlers without their own error type.
///
/// ```ignore
/// Err(Failure::not_found("Couldn't find Post with 'id'=7"))
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct Failure {
    kind: ErrorKind,
    message: String,
    record: Option<Vec<String>>,
}

impl Failure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            record: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RecordNotFound, message)
    }

    pub fn stale(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StaleObject, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// `RecordInvalid` carrying the record's messages.
    pub fn invalid<R: HasErrors + ?Sized>(record: &R) -> Self {
        let messages = record.full_messages();
        let message = format!("Validation failed: {}", messages.join(", "));
        Self::new(ErrorKind::RecordInvalid, message).with_record(messages)
    }

    pub fn with_record(mut self, messages: Vec<String>) -> Self {
        self.record = Some(messages);
        self
    }

    pub fn error_kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl Classify for Failure {
    fn kind(&self) -> Option<ErrorKind> {
        Some(self.kind.clone())
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn record_errors(&self) -> Option<Vec<String>> {
        self.record.clone()
    }
}
