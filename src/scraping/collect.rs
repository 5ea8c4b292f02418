//! Result collection — fingerprint dedup and final JSON output.
//!
//! The search timeline re-renders and reorders already-seen posts on every
//! scroll, so the extractor re-reads everything visible and this layer keeps
//! only first sightings. The fingerprint is (handle, text, timestamp) — not
//! a stored field, just the dedup key.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::error::ScrapeError;
use crate::core::types::PostRecord;

/// Owns the growing result set for exactly one run.
#[derive(Debug)]
pub struct Collector {
    seen: HashSet<u64>,
    records: Vec<PostRecord>,
    output_path: PathBuf,
}

impl Collector {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            seen: HashSet::new(),
            records: Vec::new(),
            output_path: output_path.into(),
        }
    }

    /// Default output file for a keyword: `{sanitized_keyword}_tweets.json`.
    pub fn default_output_path(keyword: &str) -> PathBuf {
        let sanitized: String = keyword
            .chars()
            .map(|c| if c == ' ' || c == '/' { '_' } else { c })
            .collect();
        PathBuf::from(format!("{}_tweets.json", sanitized))
    }

    /// Accept a candidate record. Returns `true` when it was newly added;
    /// duplicates are rejected silently.
    pub fn accept(&mut self, candidate: PostRecord) -> bool {
        let fp = fingerprint(&candidate);
        if !self.seen.insert(fp) {
            return false;
        }
        self.records.push(candidate);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn records(&self) -> &[PostRecord] {
        &self.records
    }

    /// Write the result set to the output path as a JSON array, in
    /// insertion order. Also used for the interrupt flush — partial results
    /// beat none.
    pub fn finalize(&self) -> Result<(), ScrapeError> {
        let body = serde_json::to_string_pretty(&self.records)
            .map_err(|e| ScrapeError::ExtractionFailed(e.to_string()))?;
        std::fs::write(&self.output_path, body)?;
        info!(
            "collect: 📦 wrote {} records to {}",
            self.records.len(),
            self.output_path.display()
        );
        Ok(())
    }
}

/// Dedup key over (handle, text, timestamp). `scraped_at` and the display
/// name are deliberately excluded — neither identifies the post.
fn fingerprint(rec: &PostRecord) -> u64 {
    let mut hasher = DefaultHasher::new();
    rec.handle.hash(&mut hasher);
    rec.text.hash(&mut hasher);
    rec.timestamp.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(handle: &str, text: &str, ts: Option<&str>) -> PostRecord {
        PostRecord {
            username: "Someone".to_string(),
            handle: handle.to_string(),
            text: text.to_string(),
            timestamp: ts.map(|t| t.to_string()),
            scraped_at: "2026-08-07 10:00:00".to_string(),
        }
    }

    #[test]
    fn same_candidate_twice_is_accepted_once() {
        let mut c = Collector::new("unused.json");
        assert!(c.accept(record("/a", "hello world post", Some("2026-01-01T00:00:00Z"))));
        assert!(!c.accept(record("/a", "hello world post", Some("2026-01-01T00:00:00Z"))));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn scraped_at_does_not_affect_identity() {
        let mut c = Collector::new("unused.json");
        let mut first = record("/a", "text", Some("2026-01-01T00:00:00Z"));
        first.scraped_at = "2026-08-07 09:00:00".to_string();
        let mut second = record("/a", "text", Some("2026-01-01T00:00:00Z"));
        second.scraped_at = "2026-08-07 09:05:00".to_string();
        assert!(c.accept(first));
        assert!(!c.accept(second));
    }

    #[test]
    fn any_fingerprint_component_distinguishes() {
        let mut c = Collector::new("unused.json");
        assert!(c.accept(record("/a", "text", Some("2026-01-01T00:00:00Z"))));
        assert!(c.accept(record("/b", "text", Some("2026-01-01T00:00:00Z"))));
        assert!(c.accept(record("/a", "other", Some("2026-01-01T00:00:00Z"))));
        assert!(c.accept(record("/a", "text", None)));
        assert_eq!(c.len(), 4);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut c = Collector::new("unused.json");
        c.accept(record("/z", "first sighting", None));
        c.accept(record("/a", "second sighting", None));
        assert_eq!(c.records()[0].handle, "/z");
        assert_eq!(c.records()[1].handle, "/a");
    }

    #[test]
    fn default_output_path_sanitizes_keyword() {
        assert_eq!(
            Collector::default_output_path("rust lang/async"),
            PathBuf::from("rust_lang_async_tweets.json")
        );
    }

    #[test]
    fn finalize_writes_valid_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let mut c = Collector::new(&path);
        c.accept(record("/a", "serialized post body", Some("2026-01-01T00:00:00Z")));
        c.finalize().unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<PostRecord> = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].handle, "/a");

        // Output keys are the external contract, not the struct names.
        let raw: serde_json::Value = serde_json::from_str(&body).unwrap();
        let obj = &raw[0];
        for key in ["username", "handle", "text", "timestamp", "scraped_at"] {
            assert!(obj.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn finalize_with_no_records_writes_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        Collector::new(&path).finalize().unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body.trim(), "[]");
    }

    #[test]
    fn finalize_into_missing_directory_is_io_error() {
        let err = Collector::new("/definitely/not/a/dir/out.json")
            .finalize()
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Io(_)));
    }
}
