// File: src/form.rs
// Purpose: Form builder decorators that mark a form for AJAX submission

use maud::{html, Escaper, Markup, PreEscaped};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Options for a generated `<form>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormOptions {
    pub action: String,
    pub method: String,
    /// Submit asynchronously (`data-remote="true"`).
    pub remote: bool,
    /// Request the turboform marker. Consumed by the decorators, never rendered.
    pub turboform: Option<bool>,
    /// Raw attributes placed on the form element.
    pub html: BTreeMap<String, String>,
    /// `data-*` attributes, keys without the prefix.
    pub data: BTreeMap<String, String>,
}

impl FormOptions {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    pub fn turboform(mut self, enabled: bool) -> Self {
        self.turboform = Some(enabled);
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.html.insert(name.into(), value.into());
        self
    }

    pub fn data(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            action: String::new(),
            method: "post".to_string(),
            remote: false,
            turboform: None,
            html: BTreeMap::new(),
            data: BTreeMap::new(),
        }
    }
}

/// Something that renders a form around a body.
pub trait FormBuilder {
    fn build(&self, options: FormOptions, body: Markup) -> Markup;
}

impl<F> FormBuilder for F
where
    F: Fn(FormOptions, Markup) -> Markup,
{
    fn build(&self, options: FormOptions, body: Markup) -> Markup {
        self(options, body)
    }
}

// ============================================================================
// Decorators
// ============================================================================

/// Record-form flavour: the marker goes into the raw `html` attributes.
#[derive(Debug, Clone)]
pub struct TurboformFor<B> {
    inner: B,
}

/// Tag-form flavour: the marker goes into the `data` attributes.
#[derive(Debug, Clone)]
pub struct TurboformTag<B> {
    inner: B,
}

pub fn form_for<B: FormBuilder>(inner: B) -> TurboformFor<B> {
    TurboformFor { inner }
}

pub fn form_tag<B: FormBuilder>(inner: B) -> TurboformTag<B> {
    TurboformTag { inner }
}

impl<B: FormBuilder> FormBuilder for TurboformFor<B> {
    fn build(&self, mut options: FormOptions, body: Markup) -> Markup {
        if options.turboform.take().unwrap_or(false) {
            options.html.insert("data-turboform".to_string(), "true".to_string());
            options.remote = true;
        }
        self.inner.build(options, body)
    }
}

impl<B: FormBuilder> FormBuilder for TurboformTag<B> {
    fn build(&self, mut options: FormOptions, body: Markup) -> Markup {
        if options.turboform.take().unwrap_or(false) {
            options.data.insert("turboform".to_string(), "true".to_string());
            options.remote = true;
        }
        self.inner.build(options, body)
    }
}

// ============================================================================
// Base renderer
// ============================================================================

fn valid_attr_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

/// ` name="value"` pairs for the `html` and `data` maps, values escaped.
fn extra_attrs(options: &FormOptions) -> String {
    let mut out = String::new();
    let html = options.html.iter().map(|(k, v)| (k.clone(), v));
    let data = options.data.iter().map(|(k, v)| (format!("data-{}", k), v));
    for (name, value) in html.chain(data) {
        if name == "data-remote" || !valid_attr_name(&name) {
            continue;
        }
        out.push(' ');
        out.push_str(&name);
        out.push_str("=\"");
        // Writing into a String cannot fail.
        let _ = Escaper::new(&mut out).write_str(value);
        out.push('"');
    }
    out
}

/// Plain `<form>` renderer. Attributes with unusable names are skipped.
pub fn base_form(options: FormOptions, body: Markup) -> Markup {
    let form = html! {
        form action=(options.action) method=(options.method) data-remote=[options.remote.then_some("true")] {
            (body)
        }
    }
    .into_string();

    // Attribute values are escaped, so the first `>` closes the start tag.
    match form.find('>') {
        Some(end) => PreEscaped(format!("{}{}{}", &form[..end], extra_attrs(&options), &form[end..])),
        None => PreEscaped(form),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body() -> Markup {
        html! { input type="submit" value="Save"; }
    }

    #[test]
    fn test_form_for_marks_html_attrs() {
        let builder = form_for(base_form);
        let markup = builder.build(FormOptions::new("/posts").turboform(true), body());

        assert_eq!(
            markup.into_string(),
            r#"<form action="/posts" method="post" data-remote="true" data-turboform="true"><input type="submit" value="Save"></form>"#
        );
    }

    #[test]
    fn test_form_tag_marks_data_attrs() {
        let builder = form_tag(base_form);
        let markup = builder
            .build(FormOptions::new("/search").method("get").turboform(true), html! {})
            .into_string();

        assert_eq!(
            markup,
            r#"<form action="/search" method="get" data-remote="true" data-turboform="true"></form>"#
        );
    }

    #[test]
    fn test_option_removed_before_delegating() {
        let seen = std::cell::RefCell::new(None);
        let spy = |options: FormOptions, body: Markup| {
            *seen.borrow_mut() = Some(options.clone());
            base_form(options, body)
        };

        form_for(&spy).build(FormOptions::new("/a").turboform(true), html! {});
        let delegated = seen.borrow_mut().take().unwrap();
        assert_eq!(delegated.turboform, None);
        assert!(delegated.remote);
        assert_eq!(delegated.html.get("data-turboform").map(String::as_str), Some("true"));

        form_tag(&spy).build(FormOptions::new("/b").turboform(false), html! {});
        let delegated = seen.borrow_mut().take().unwrap();
        assert_eq!(delegated.turboform, None);
        assert!(!delegated.remote);
        assert!(delegated.data.is_empty());
    }

    #[test]
    fn test_without_option_passes_through() {
        let plain = form_tag(base_form)
            .build(FormOptions::new("/c").attr("class", "inline"), html! {})
            .into_string();
        assert_eq!(plain, r#"<form action="/c" method="post" class="inline"></form>"#);
    }

    #[test]
    fn test_attribute_values_escaped() {
        let markup = base_form(
            FormOptions::new("/q?a=1&b=\"2\"").attr("bad name", "x"),
            html! {},
        )
        .into_string();
        assert_eq!(markup, r#"<form action="/q?a=1&amp;b=&quot;2&quot;" method="post"></form>"#);
    }

    #[test]
    fn test_extra_attribute_values_escaped() {
        let markup = base_form(
            FormOptions::new("/c")
                .attr("title", "a < b & \"c\"")
                .data("confirm", "<sure>"),
            html! { p { "x > y" } },
        )
        .into_string();
        assert_eq!(
            markup,
            r#"<form action="/c" method="post" title="a &lt; b &amp; &quot;c&quot;" data-confirm="&lt;sure&gt;"><p>x &gt; y</p></form>"#
        );
    }
}
