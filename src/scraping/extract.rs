//! Per-post field extraction over rendered snapshots.
//!
//! The platform's DOM carries no stable contract, so every field is pulled
//! through an ordered list of pure selector strategies — primary selector,
//! structurally-adjacent fallback, text-pattern heuristic — and the first
//! success wins. Fields fail independently: a post with no readable
//! timestamp still yields a record with `timestamp: null`. A candidate is
//! dropped only when every field fails, which is the signal that the element
//! was never a post to begin with.

use std::sync::OnceLock;

use chrono::DateTime;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::core::types::PostRecord;

/// A single field strategy: pure, side-effect free, independently testable.
type FieldStrategy = for<'a> fn(ElementRef<'a>) -> Option<String>;

const NAME_STRATEGIES: &[FieldStrategy] = &[name_from_user_testid, name_from_ltr_span];
const HANDLE_STRATEGIES: &[FieldStrategy] = &[handle_from_status_link, handle_from_profile_href];
const TEXT_STRATEGIES: &[FieldStrategy] = &[text_from_lang_divs, text_from_tweet_text_testid];
const TIMESTAMP_STRATEGIES: &[FieldStrategy] = &[timestamp_from_time_attr];

/// Paths that look like profile links but never are.
const NON_PROFILE_PATHS: &[&str] = &[
    "/home",
    "/explore",
    "/notifications",
    "/messages",
    "/search",
    "/i",
];

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

// ─────────────────────────────────────────────────────────────────────────────
// Article discovery
// ─────────────────────────────────────────────────────────────────────────────

/// Collect all visible post elements, trying selectors in order of
/// specificity. The first selector that matches anything wins the cycle.
pub fn select_articles(doc: &Html) -> Vec<ElementRef<'_>> {
    for css in [
        "article[data-testid=\"tweet\"]",
        "article",
        "[data-testid=\"tweet\"]",
    ] {
        let selector = sel(css);
        let found: Vec<ElementRef<'_>> = doc.select(&selector).collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

// ─────────────────────────────────────────────────────────────────────────────
// Record assembly
// ─────────────────────────────────────────────────────────────────────────────

/// Extract a record from one post element.
///
/// `min_text_len` filters chrome noise: a text strategy yielding fewer
/// characters than this counts as a failed strategy, not post text.
pub fn extract_post(
    article: ElementRef<'_>,
    scraped_at: &str,
    min_text_len: usize,
) -> Option<PostRecord> {
    let username = first_match(article, NAME_STRATEGIES);
    let handle = first_match(article, HANDLE_STRATEGIES);
    let text = first_match(article, TEXT_STRATEGIES).filter(|t| t.len() >= min_text_len);
    let timestamp = first_match(article, TIMESTAMP_STRATEGIES).filter(|t| is_iso8601(t));

    if username.is_none() && handle.is_none() && text.is_none() && timestamp.is_none() {
        return None;
    }

    Some(PostRecord {
        username: username.unwrap_or_default(),
        handle: handle.unwrap_or_default(),
        text: text.unwrap_or_default(),
        timestamp,
        scraped_at: scraped_at.to_string(),
    })
}

fn first_match(el: ElementRef<'_>, strategies: &[FieldStrategy]) -> Option<String> {
    strategies.iter().find_map(|strategy| strategy(el))
}

/// Store timestamps as received, but only when they actually parse.
fn is_iso8601(raw: &str) -> bool {
    DateTime::parse_from_rfc3339(raw).is_ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Display name strategies
// ─────────────────────────────────────────────────────────────────────────────

fn name_from_user_testid(el: ElementRef<'_>) -> Option<String> {
    let spans = sel("div[data-testid=\"User-Name\"] span");
    el.select(&spans)
        .map(|s| s.text().collect::<String>().trim().to_string())
        .find(|t| !t.is_empty() && !t.starts_with('@'))
}

fn name_from_ltr_span(el: ElementRef<'_>) -> Option<String> {
    let spans = sel("div[dir=\"ltr\"] span");
    el.select(&spans)
        .map(|s| s.text().collect::<String>().trim().to_string())
        .find(|t| !t.is_empty() && !t.starts_with('@'))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handle strategies
// ─────────────────────────────────────────────────────────────────────────────

fn profile_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^/[A-Za-z0-9_]{1,15}$").expect("valid profile regex"))
}

/// A status permalink (`/alice/status/123…`) pins the author exactly.
fn handle_from_status_link(el: ElementRef<'_>) -> Option<String> {
    let links = sel("a[role=\"link\"]");
    el.select(&links)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| {
            let (owner, _) = href.split_once("/status/")?;
            (!owner.is_empty() && owner.starts_with('/')).then(|| owner.to_string())
        })
}

/// Fallback: the first link whose href looks like a bare profile path.
fn handle_from_profile_href(el: ElementRef<'_>) -> Option<String> {
    let links = sel("a[role=\"link\"]");
    el.select(&links)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| profile_path_re().is_match(href) && !NON_PROFILE_PATHS.contains(href))
        .map(|href| href.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Text strategies
// ─────────────────────────────────────────────────────────────────────────────

fn joined_text(el: ElementRef<'_>, css: &str) -> Option<String> {
    let selector = sel(css);
    let parts: Vec<String> = el
        .select(&selector)
        .map(|d| d.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    let joined = parts.join(" ").trim().to_string();
    (!joined.is_empty()).then_some(joined)
}

fn text_from_lang_divs(el: ElementRef<'_>) -> Option<String> {
    joined_text(el, "div[lang]")
}

fn text_from_tweet_text_testid(el: ElementRef<'_>) -> Option<String> {
    joined_text(el, "div[data-testid=\"tweetText\"]")
}

// ─────────────────────────────────────────────────────────────────────────────
// Timestamp strategies
// ─────────────────────────────────────────────────────────────────────────────

fn timestamp_from_time_attr(el: ElementRef<'_>) -> Option<String> {
    let times = sel("time");
    el.select(&times)
        .filter_map(|t| t.value().attr("datetime"))
        .map(|t| t.to_string())
        .next()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
