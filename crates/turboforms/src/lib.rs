// Turboforms - AJAX-aware form submission handling for Axum
//
// Requests sent by the cooperating client (`X-Requested-With: XMLHttpRequest`
// plus `X-Turboforms`) get:
// - classified errors as a JSON array of messages with a mapped status,
// - redirects as an empty 200 with `Location` and an `X-Flash` JSON header,
// - success acknowledgements as an empty 200 with `X-Flash`.
// Every other request keeps the conventional behavior.

pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod flash;
pub mod form;
pub mod store;

pub use classify::{Classify, ErrorClassification, ErrorKind, Failure, HasErrors, StatusDescriptor};
pub use config::{Settings, TurboformsConfig};
pub use dispatch::{RedirectTarget, Turboforms};
pub use error::{Result, TurboformsError, Unrescued};
pub use extract::AjaxSignal;
pub use flash::{extract as extract_flash, FlashBag, ResponseOptions};
pub use form::{base_form, form_for, form_tag, FormBuilder, FormOptions};
pub use store::{CookieFlashStore, FlashStore, NullFlashStore};

// Re-export commonly used types from dependencies
pub use axum;
pub use axum::http::StatusCode;
pub use maud;
