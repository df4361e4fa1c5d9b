//! Mapping from published bundle file names to cluster resource names.

/// File suffixes recognized as certificate bundles.
pub const BUNDLE_SUFFIXES: [&str; 2] = [".pem", ".crt"];

/// Character substituted for every run of non-alphanumeric characters.
pub const SEPARATOR: char = '-';

/// Strip one recognized bundle suffix, if present.
///
/// Only a single suffix is removed, so `a.crt.pem` becomes `a.crt`.
#[must_use]
pub fn strip_bundle_suffix(name: &str) -> &str {
    BUNDLE_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name)
}

/// Normalize a logical bundle name into a resource identifier.
///
/// Strips one recognized suffix, collapses each run of characters outside
/// `[a-zA-Z0-9]` into a single [`SEPARATOR`], then lowercases. Leading and
/// trailing separators are kept.
#[must_use]
pub fn normalize(logical_name: &str) -> String {
    let stem = strip_bundle_suffix(logical_name);
    let mut out = String::with_capacity(stem.len());
    let mut in_run = false;

    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            in_run = false;
        } else if !in_run {
            out.push(SEPARATOR);
            in_run = true;
        }
    }

    out
}
