//! Directory listing parsing.
//!
//! A listing is any HTML document whose `<a href="...">` links point at the
//! published files, such as the index pages generated by common web servers.

use percent_encoding::percent_decode_str;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

use cabundle_core::{FetchError, FetchResult, BUNDLE_SUFFIXES};

/// A bundle discovered in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Last path segment of the link, percent-decoded; the logical bundle name
    pub name: String,
    /// Absolute URL to download
    pub url: Url,
}

fn anchor_href() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a\s[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .expect("anchor pattern is valid")
    })
}

fn html_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"))
}

/// Parse and normalize the base location so relative links resolve under it.
pub fn base_url(raw: &str) -> FetchResult<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl(format!(
            "{raw}: unsupported scheme {}",
            url.scheme()
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Extract every `href` value from a listing document, in document order.
///
/// Anchors inside HTML comments are skipped. Character references in the
/// value are decoded.
pub fn hrefs(document: &str) -> Vec<String> {
    let document = html_comment().replace_all(document, "");
    anchor_href()
        .captures_iter(&document)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| html_escape::decode_html_entities(m.as_str().trim()).into_owned())
        .filter(|href| !href.is_empty())
        .collect()
}

/// Returns true if the file name ends in a recognized bundle suffix.
fn is_bundle_name(name: &str) -> bool {
    BUNDLE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Decoded last path segment of a resolved link.
fn file_name(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(Iterator::last)
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
}

/// Find the bundle entries in a listing document.
///
/// Links with any other suffix are ignored. A name listed more than once is
/// returned once, at its first position.
pub fn bundle_entries(base: &Url, document: &str) -> FetchResult<Vec<ListingEntry>> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for href in hrefs(document) {
        let url = base
            .join(&href)
            .map_err(|e| FetchError::InvalidUrl(format!("{href}: {e}")))?;

        let Some(name) = file_name(&url).filter(|name| is_bundle_name(name)) else {
            continue;
        };
        if !seen.insert(name.clone()) {
            continue;
        }

        entries.push(ListingEntry { name, url });
    }

    Ok(entries)
}
