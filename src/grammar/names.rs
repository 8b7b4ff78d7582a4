//! Rule Naming
//!
//! Canonical, deterministic rule names for identifiers and type
//! descriptors, plus the quoting helpers for grammar string literals.
//!
//! Naming is the only deduplication key in a grammar: two types that
//! classify to the same name share one rule.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{GrammarError, Result};
use crate::schema::TypeDescriptor;

fn camel_parts() -> &'static Regex {
    static PARTS: OnceLock<Regex> = OnceLock::new();
    PARTS.get_or_init(|| Regex::new(r"[A-Z]?[^A-Z]*").expect("static regex"))
}

/// `UserDetail` → `user-detail`, `userId` → `user-id`, `file_name` → `file-name`.
///
/// Characters outside `[A-Za-z0-9]` become separators, so the result only
/// holds lowercase alphanumerics and single hyphens (possibly empty).
pub fn canonicalize(identifier: &str) -> String {
    let cleaned: String = identifier
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    camel_parts()
        .find_iter(&cleaned)
        .map(|m| m.as_str().to_ascii_lowercase())
        .flat_map(|part| {
            part.split('-')
                .filter(|piece| !piece.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// [`canonicalize`], rejecting identifiers with nothing usable in them
pub fn rule_token(identifier: &str) -> Result<String> {
    let token = canonicalize(identifier);
    if token.is_empty() {
        return Err(GrammarError::InvalidName {
            name: identifier.to_string(),
        });
    }
    Ok(token)
}

/// Canonical rule name of a type descriptor
pub fn classify(ty: &TypeDescriptor) -> String {
    match ty {
        TypeDescriptor::Primitive(p) => p.rule_name().to_string(),
        TypeDescriptor::Enum(e) => canonicalize(&e.name),
        TypeDescriptor::Record(name) => canonicalize(name),
        TypeDescriptor::Array(element) => format!("{}-list", classify(element)),
        TypeDescriptor::Union { variants, .. } => {
            let arms: Vec<String> = variants.iter().map(classify).collect();
            format!("union-{}", arms.join("-or-"))
        }
        TypeDescriptor::Map { key, value } => format!(
            "custom-dict-key-type-{}-value-type-{}",
            classify(key),
            classify(value)
        ),
        TypeDescriptor::Opaque(name) => format!("custom-class-{}", canonicalize(name)),
    }
}

/// `{model}-{field}` rule name for field-scoped rules
pub fn qualified(model: &str, field: &str) -> String {
    format!("{}-{}", model, field)
}

/// Quote text as a grammar string literal
pub fn literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Grammar literal matching the JSON encoding of `text`, e.g. `"\"HR\""`
pub fn json_literal(text: &str) -> String {
    // serializing a &str cannot fail
    let encoded = serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text));
    literal(&encoded)
}
