//! Candidate link extraction from raw subscription documents

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Matches proxy links by scheme prefix; a link runs until whitespace or a
/// quote character
static LINK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(vmess|vless|trojan|ss)://[^\s'"]+"#).expect("invalid link regex")
});

/// A line made only of base64 alphabet characters
static BASE64_LINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/=]+$").expect("invalid base64 line regex"));

/// Extract every candidate link from a document
///
/// Deduplicated by exact string match, first-seen order preserved. Never
/// fails; a document with no matches yields an empty list.
pub fn extract_links(document: &str) -> Vec<String> {
    dedup_preserving_order(
        LINK_REGEX
            .find_iter(document)
            .map(|m| m.as_str().trim().to_string()),
    )
}

/// Extract candidate links, additionally treating bare base64 lines as
/// implicit `vmess://` payloads
pub fn extract_links_with_base64(document: &str) -> Vec<String> {
    let mut links: Vec<String> = LINK_REGEX
        .find_iter(document)
        .map(|m| m.as_str().trim().to_string())
        .collect();

    for line in document.lines() {
        let line = line.trim();
        if !line.is_empty() && BASE64_LINE_REGEX.is_match(line) {
            links.push(format!("vmess://{line}"));
        }
    }

    dedup_preserving_order(links.into_iter())
}

fn dedup_preserving_order(links: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for link in links {
        if seen.insert(link.clone()) {
            unique.push(link);
        }
    }
    unique
}
