use serde::{Deserialize, Serialize};

/// The persisted session: an array of opaque cookie objects in the CDP
/// export shape (`{name, value, domain, path, expires, ...}`). The scraper
/// never interprets these beyond load/normalize/save — freshness is only
/// ever discovered by probing the live page.
pub type SessionState = Vec<serde_json::Value>;

/// One collected post, serialized with exactly the output-file keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostRecord {
    /// Author display name. Empty when every name strategy failed.
    pub username: String,
    /// Author profile path, beginning with `/`. Empty when unresolvable.
    pub handle: String,
    /// Post text. Empty when extraction partially failed.
    pub text: String,
    /// Platform timestamp, stored as received when it parses as ISO-8601.
    pub timestamp: Option<String>,
    /// Local wall-clock stamp taken at extraction.
    pub scraped_at: String,
}

/// Why the scroll loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Hit the hard scroll cap.
    ScrollCapReached,
    /// N consecutive cycles yielded zero new unique records — end of
    /// results, or the platform stopped serving us.
    NoNewContent,
}

/// Outcome of a completed harvest loop.
#[derive(Debug, Clone, Copy)]
pub struct HarvestSummary {
    pub cycles: u32,
    pub accepted: usize,
    pub termination: Termination,
}
