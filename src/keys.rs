//! Key derivation: map one generic dotted key to the key each source uses.
//!
//! File and CLI keys keep the dotted form, since dots address nested
//! structure in both. Env keys are transduced to `SCREAMING_SNAKE_CASE`,
//! inserting a separator at every lowercase→uppercase boundary.

use crate::types::SourceKind;

/// Derive the source-specific key for a generic key.
///
/// A single leading `.` is stripped first, so keys built from an empty prefix
/// (`.port`) behave like bare keys.
pub fn derive_key(generic_key: &str, source: SourceKind) -> String {
    let key = generic_key.strip_prefix('.').unwrap_or(generic_key);
    match source {
        SourceKind::File | SourceKind::Cli => key.to_string(),
        SourceKind::Env => env_case(key),
    }
}

fn env_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev: Option<char> = None;

    for ch in key.chars() {
        if ch.is_ascii_digit() {
            out.push(ch);
        } else if ch == '.' {
            out.push('_');
        } else {
            if ch.is_ascii_uppercase() && prev.is_some_and(|p| p.is_ascii_lowercase()) {
                out.push('_');
            }
            out.extend(ch.to_uppercase());
        }
        prev = Some(ch);
    }
    out
}

/// Join key segments with `.`, skipping absent and empty ones.
///
/// `[None, Some("app"), Some("port")]` → `"app.port"`.
pub fn join_segments<'a>(segments: impl IntoIterator<Item = Option<&'a str>>) -> String {
    segments
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}
