// File: src/config.rs
// Purpose: Settings parsed from turboforms.toml, plus the shared runtime settings

use anyhow::{Context, Result};
use axum::Extension;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::classify::{ErrorClassification, ErrorKind, StatusDescriptor};
use crate::store::{CookieFlashStore, FlashStore};

/// File configuration.
///
/// ```toml
/// request_header = "X-Turboforms"
/// flash_header = "X-Flash"
/// flash_types = ["alert", "notice", "success"]
/// redirect_status = "see_other"
///
/// [errors]
/// RecordNotFound = 410
/// PaymentDeclined = "payment_required"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurboformsConfig {
    /// Header a cooperating client sends alongside `X-Requested-With`.
    #[serde(default = "default_request_header")]
    pub request_header: String,

    /// Response header carrying the flash JSON.
    #[serde(default = "default_flash_header")]
    pub flash_header: String,

    /// Flash categories recognized as top-level options.
    #[serde(default = "default_flash_types")]
    pub flash_types: Vec<String>,

    #[serde(default = "default_flash_cookie")]
    pub flash_cookie: String,

    /// Status of conventional (non-AJAX) redirects.
    #[serde(default = "default_redirect_status")]
    pub redirect_status: StatusDescriptor,

    /// Leave the flash header off when the bag is empty instead of sending `{}`.
    #[serde(default)]
    pub omit_empty_flash_header: bool,

    /// Kind name → status overrides and additional registrations.
    #[serde(default)]
    pub errors: BTreeMap<String, StatusDescriptor>,
}

fn default_request_header() -> String {
    "X-Turboforms".to_string()
}

fn default_flash_header() -> String {
    "X-Flash".to_string()
}

fn default_flash_types() -> Vec<String> {
    vec!["alert".to_string(), "notice".to_string()]
}

fn default_flash_cookie() -> String {
    "turboforms_flash".to_string()
}

fn default_redirect_status() -> StatusDescriptor {
    StatusDescriptor::Code(302)
}

impl Default for TurboformsConfig {
    fn default() -> Self {
        Self {
            request_header: default_request_header(),
            flash_header: default_flash_header(),
            flash_types: default_flash_types(),
            flash_cookie: default_flash_cookie(),
            redirect_status: default_redirect_status(),
            omit_empty_flash_header: false,
            errors: BTreeMap::new(),
        }
    }
}

impl TurboformsConfig {
    /// Load configuration from a TOML file. Missing or empty files yield defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: TurboformsConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default path (./turboforms.toml)
    pub fn load_default() -> Result<Self> {
        Self::load("turboforms.toml")
    }

    fn validate(&self) -> Result<()> {
        for (kind, status) in &self.errors {
            status
                .resolve()
                .with_context(|| format!("Unknown status {:?} for error kind {}", status, kind))?;
        }
        let redirect = self
            .redirect_status
            .resolve()
            .with_context(|| format!("Unknown redirect_status {:?}", self.redirect_status))?;
        if !redirect.is_redirection() {
            anyhow::bail!("redirect_status must be a 3xx status, got {}", redirect);
        }
        Ok(())
    }

    /// Default classification with the `[errors]` table applied on top.
    pub fn classification(&self) -> ErrorClassification {
        let mut table = ErrorClassification::default();
        for (name, status) in &self.errors {
            table.register(ErrorKind::from_name(name), status.clone());
        }
        table
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Runtime settings shared by every request.
#[derive(Clone)]
pub struct Settings {
    pub config: TurboformsConfig,
    pub classification: ErrorClassification,
    pub store: Arc<dyn FlashStore>,
}

impl Settings {
    pub fn from_config(config: TurboformsConfig) -> Self {
        let classification = config.classification();
        let store = Arc::new(CookieFlashStore::new(config.flash_cookie.clone()));
        Self {
            config,
            classification,
            store,
        }
    }

    pub fn with_store(mut self, store: impl FlashStore + 'static) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Register an application error kind (or override a built-in one).
    pub fn register(mut self, kind: ErrorKind, status: impl Into<StatusDescriptor>) -> Self {
        self.classification.register(kind, status);
        self
    }

    /// Router layer making these settings visible to the `Turboforms` extractor.
    ///
    /// ```ignore
    /// Router::new().route("/posts", post(create)).layer(settings.layer())
    /// ```
    pub fn layer(self) -> Extension<Arc<Settings>> {
        Extension(Arc::new(self))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(TurboformsConfig::default())
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("config", &self.config)
            .field("classification", &self.classification)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("turboforms-{}-{}.toml", name, std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = TurboformsConfig::default();
        assert_eq!(config.request_header, "X-Turboforms");
        assert_eq!(config.flash_header, "X-Flash");
        assert_eq!(config.flash_types, vec!["alert", "notice"]);
        assert_eq!(config.redirect_status.resolve(), Some(StatusCode::FOUND));
        assert!(!config.omit_empty_flash_header);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = TurboformsConfig::load("/nonexistent/turboforms.toml").unwrap();
        assert_eq!(config.flash_cookie, "turboforms_flash");
    }

    #[test]
    fn test_parse_config_with_errors_table() {
        let path = write_temp(
            "errors",
            r#"
flash_types = ["alert", "notice", "success"]
redirect_status = "see_other"

[errors]
RecordNotFound = 410
PaymentDeclined = "payment_required"
"#,
        );
        let config = TurboformsConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.flash_types.len(), 3);
        assert_eq!(config.redirect_status.resolve(), Some(StatusCode::SEE_OTHER));

        let table = config.classification();
        assert_eq!(table.status_for(&ErrorKind::RecordNotFound), Some(StatusCode::GONE));
        assert_eq!(
            table.status_for(&ErrorKind::Custom("PaymentDeclined".into())),
            Some(StatusCode::PAYMENT_REQUIRED)
        );
        assert_eq!(table.status_for(&ErrorKind::StaleObject), Some(StatusCode::CONFLICT));
    }

    #[test]
    fn test_unknown_status_name_is_rejected() {
        let path = write_temp("bad-status", "[errors]\nRecordNotFound = \"nope\"\n");
        let result = TurboformsConfig::load(&path);
        let _ = fs::remove_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_redirect_redirect_status_is_rejected() {
        let path = write_temp("bad-redirect", "redirect_status = \"ok\"\n");
        let result = TurboformsConfig::load(&path);
        let _ = fs::remove_file(&path);
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("3xx"));

        let path = write_temp("good-redirect", "redirect_status = 301\n");
        let config = TurboformsConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(config.redirect_status.resolve(), Some(StatusCode::MOVED_PERMANENTLY));
    }

    #[test]
    fn test_settings_register() {
        let settings = Settings::default().register(ErrorKind::Custom("Quota".into()), 429);
        assert_eq!(
            settings.classification.status_for(&ErrorKind::Custom("Quota".into())),
            Some(StatusCode::TOO_MANY_REQUESTS)
        );
    }
}
