// File: src/flash.rs
// Purpose: Flash bag, response options bag, and the extraction between them

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::classify::StatusDescriptor;

/// Key of the catch-all entry holding a nested category → message object.
pub const CATCH_ALL: &str = "flash";

/// Key of the redirect status option.
pub const STATUS: &str = "status";

// ============================================================================
// FlashBag
// ============================================================================

/// Category → message entries meant to survive until the next full render.
/// Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlashBag(Map<String, Value>);

impl FlashBag {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn insert(&mut self, category: impl Into<String>, message: impl Into<Value>) {
        self.0.insert(category.into(), message.into());
    }

    pub fn get(&self, category: &str) -> Option<&Value> {
        self.0.get(category)
    }

    /// Message as text, when the entry is a JSON string.
    pub fn get_str(&self, category: &str) -> Option<&str> {
        self.0.get(category).and_then(Value::as_str)
    }

    pub fn remove(&mut self, category: &str) -> Option<Value> {
        self.0.remove(category)
    }

    /// Merge `other` into `self`; entries of `other` win.
    pub fn update(&mut self, other: &FlashBag) {
        for (category, message) in &other.0 {
            self.0.insert(category.clone(), message.clone());
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

impl From<Map<String, Value>> for FlashBag {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl Extend<(String, Value)> for FlashBag {
    fn extend<I: IntoIterator<Item = (String, Value)>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

// ============================================================================
// ResponseOptions
// ============================================================================

/// Options handed to `redirect_to` / `head_success`: flash categories, the
/// catch-all `flash` object, and response options such as `status`.
///
/// ```ignore
/// ResponseOptions::new().notice("Post created").status(StatusCode::SEE_OTHER)
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseOptions(Map<String, Value>);

impl ResponseOptions {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn notice(self, message: impl Into<String>) -> Self {
        self.set("notice", message.into())
    }

    pub fn alert(self, message: impl Into<String>) -> Self {
        self.set("alert", message.into())
    }

    /// Add an entry to the catch-all `flash` object.
    pub fn flash(mut self, category: impl Into<String>, message: impl Into<Value>) -> Self {
        let entry = self
            .0
            .entry(CATCH_ALL)
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(category.into(), message.into());
        }
        self
    }

    pub fn status(self, status: impl Into<StatusDescriptor>) -> Self {
        let value = match status.into() {
            StatusDescriptor::Code(code) => Value::from(code),
            StatusDescriptor::Named(name) => Value::from(name),
        };
        self.set(STATUS, value)
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Remove and parse the `status` option. Non-numeric, non-string values are dropped.
    pub fn take_status(&mut self) -> Option<StatusDescriptor> {
        match self.0.remove(STATUS)? {
            Value::Number(n) => n
                .as_u64()
                .and_then(|code| u16::try_from(code).ok())
                .map(StatusDescriptor::Code),
            Value::String(name) => Some(StatusDescriptor::Named(name)),
            other => {
                warn!("ignoring non-status value for `status` option: {}", other);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Map<String, Value>> for ResponseOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Move recognized flash categories and the catch-all `flash` object out of
/// `options` into a new bag. Catch-all entries win over per-category ones.
/// Keys that are not consumed stay in `options`.
pub fn extract<S: AsRef<str>>(options: &mut ResponseOptions, categories: &[S]) -> FlashBag {
    let mut flash = FlashBag::new();

    for category in categories {
        let category = category.as_ref();
        if category == CATCH_ALL {
            continue;
        }
        match options.remove(category) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => {}
            Some(message) => flash.insert(category, message),
        }
    }

    match options.remove(CATCH_ALL) {
        Some(Value::Object(entries)) => flash.extend(entries),
        None | Some(Value::Null) => {}
        Some(other) => warn!("ignoring non-object `flash` option: {}", other),
    }

    flash
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const DEFAULT_TYPES: [&str; 2] = ["alert", "notice"];

    fn options(value: Value) -> ResponseOptions {
        match value {
            Value::Object(map) => ResponseOptions::from(map),
            _ => panic!("options must be an object"),
        }
    }

    #[test]
    fn test_extract_moves_recognized_categories() {
        let mut opts = options(json!({"notice": "Saved", "alert": "Careful", "status": 303}));
        let flash = extract(&mut opts, &DEFAULT_TYPES);

        assert_eq!(flash.get_str("notice"), Some("Saved"));
        assert_eq!(flash.get_str("alert"), Some("Careful"));
        assert_eq!(opts, options(json!({"status": 303})));
    }

    #[test]
    fn test_extract_without_flash_keys_leaves_options_alone() {
        let mut opts = options(json!({"status": "see_other", "anchor": "top"}));
        let before = opts.clone();
        let flash = extract(&mut opts, &DEFAULT_TYPES);

        assert!(flash.is_empty());
        assert_eq!(opts, before);
    }

    #[test]
    fn test_catch_all_wins_on_conflict() {
        let mut opts = options(json!({"notice": "A", "flash": {"notice": "B"}}));
        let flash = extract(&mut opts, &DEFAULT_TYPES);

        assert_eq!(flash, FlashBag::from(json!({"notice": "B"}).as_object().cloned().unwrap()));
        assert!(opts.is_empty());
    }

    #[test]
    fn test_catch_all_adds_other_categories() {
        let mut opts = ResponseOptions::new()
            .alert("Low balance")
            .flash("success", "Transfer queued")
            .flash("info", "Takes a day");
        let flash = extract(&mut opts, &DEFAULT_TYPES);

        assert_eq!(flash.len(), 3);
        assert_eq!(flash.get_str("success"), Some("Transfer queued"));
        assert_eq!(flash.get_str("alert"), Some("Low balance"));
    }

    #[test]
    fn test_unrecognized_category_stays_in_options() {
        let mut opts = options(json!({"warning": "Disk almost full"}));
        let flash = extract(&mut opts, &DEFAULT_TYPES);
        assert!(flash.is_empty());
        assert!(opts.contains_key("warning"));

        let flash = extract(&mut opts, &["warning"]);
        assert_eq!(flash.get_str("warning"), Some("Disk almost full"));
        assert!(opts.is_empty());
    }

    #[test]
    fn test_null_and_false_categories_are_consumed_but_not_flashed() {
        let mut opts = options(json!({"notice": null, "alert": false}));
        let flash = extract(&mut opts, &DEFAULT_TYPES);
        assert!(flash.is_empty());
        assert!(opts.is_empty());
    }

    #[test]
    fn test_non_object_catch_all_is_dropped() {
        let mut opts = options(json!({"flash": "oops", "notice": "kept"}));
        let flash = extract(&mut opts, &DEFAULT_TYPES);
        assert_eq!(flash.len(), 1);
        assert!(!opts.contains_key("flash"));
    }

    #[test]
    fn test_catch_all_name_in_categories_is_still_merged() {
        let mut opts = options(json!({"flash": {"notice": "Saved", "alert": "Check"}}));
        let flash = extract(&mut opts, &["notice", "flash"]);

        assert_eq!(flash.get_str("notice"), Some("Saved"));
        assert_eq!(flash.get_str("alert"), Some("Check"));
        assert!(flash.get("flash").is_none());
        assert!(opts.is_empty());
    }

    #[test]
    fn test_take_status() {
        let mut opts = ResponseOptions::new().status(301);
        assert_eq!(opts.take_status(), Some(StatusDescriptor::Code(301)));
        assert!(opts.is_empty());

        let mut opts = ResponseOptions::new().status("moved_permanently");
        assert_eq!(opts.take_status(), Some(StatusDescriptor::named("moved_permanently")));

        let mut opts = ResponseOptions::new().set("status", true);
        assert_eq!(opts.take_status(), None);
    }

    #[test]
    fn test_flash_bag_update_and_json() {
        let mut bag = FlashBag::new();
        bag.insert("notice", "old");
        let mut newer = FlashBag::new();
        newer.insert("notice", "new");
        newer.insert("alert", "also");
        bag.update(&newer);

        let round: Value = serde_json::from_str(&bag.to_json().unwrap()).unwrap();
        assert_eq!(round, json!({"notice": "new", "alert": "also"}));
        assert_eq!(FlashBag::new().to_json().unwrap(), "{}");
    }
}
