//! Display and URL safety helpers.
//!
//! [`sanitize_input`] is a blocklist filter for obviously hostile markup. It is
//! not an HTML parser and does not replace contextual output encoding; render
//! untrusted values through [`sanitize_html`] (or a templating engine that
//! escapes) regardless.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Upper bound on strip passes; nested payloads like `<scr<script></script>ipt>`
/// need more than one.
const MAX_STRIP_PASSES: usize = 8;

/// Escape HTML metacharacters plus `/` for attribute contexts.
pub fn sanitize_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            other => out.push(other),
        }
    }
    out
}

/// Strip script/iframe elements, `javascript:` URLs and inline `on*=` handlers,
/// then trim surrounding whitespace.
pub fn sanitize_input(input: &str) -> String {
    static ELEMENTS: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)<(script|iframe)\b[^>]*>.*?</\s*(script|iframe)\s*>")
            .expect("element regex should compile")
    });
    static STRAY_TAGS: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)<\s*/?\s*(script|iframe)\b[^>]*>").expect("tag regex should compile")
    });
    static JS_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)javascript\s*:").expect("scheme regex should compile")
    });
    static HANDLERS: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\bon\w+\s*=").expect("handler regex should compile")
    });

    let mut current = input.to_string();
    for _ in 0..MAX_STRIP_PASSES {
        let next = ELEMENTS.replace_all(&current, "");
        let next = STRAY_TAGS.replace_all(&next, "");
        let next = JS_SCHEME.replace_all(&next, "");
        let next = HANDLERS.replace_all(&next, "").into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current.trim().to_string()
}

/// [`sanitize_input`] for JSON strings; any other value is returned untouched.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_input(&s)),
        other => other,
    }
}

/// Percent-encode a value for use in a query string.
pub fn sanitize_url_component(input: &str) -> String {
    url::form_urlencoded::byte_serialize(input.as_bytes()).collect()
}
