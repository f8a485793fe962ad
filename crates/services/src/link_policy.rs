//! Link detection for the anonymous no-links rule.

use once_cell::sync::Lazy;
use regex::Regex;

// Scheme URLs, `www.` hosts, and bare domains (dot-separated labels ending
// in a 2+ letter label, optional path).
static LINK_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:https?://\S+|www\.\S+|\b[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}\b(?:/\S*)?)")
        .expect("link pattern is valid")
});

pub fn contains_link(body: &str) -> bool {
    LINK_LIKE.is_match(body)
}
