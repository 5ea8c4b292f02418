//! Scroll-loop integration tests against a scripted surface.
//!
//! The loop is exercised end-to-end — scroll, settle, snapshot, extract,
//! dedup, decide — with the browser replaced by canned HTML snapshots.

use std::collections::VecDeque;

use async_trait::async_trait;
use nightjar::scraping::harvest;
use nightjar::{Collector, HarvestTuning, ScrapeError, SearchSurface, Termination};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn article(handle: &str, text: &str) -> String {
    format!(
        r#"<article data-testid="tweet">
            <div data-testid="User-Name"><span>Author of {handle}</span></div>
            <a role="link" href="{handle}/status/1"></a>
            <div lang="en">{text}</div>
            <time datetime="2026-08-06T12:00:00.000Z">Aug 6</time>
        </article>"#
    )
}

fn page(articles: &[String]) -> String {
    format!("<html><body>{}</body></html>", articles.concat())
}

fn posts(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            article(
                &format!("/user{i}"),
                &format!("post number {i} with enough body text to count"),
            )
        })
        .collect()
}

fn tuning(max_scrolls: u32) -> HarvestTuning {
    HarvestTuning {
        max_scrolls,
        ..HarvestTuning::default()
    }
}

// ---------------------------------------------------------------------------
// Scripted surface: one entry per snapshot() call, last page repeats
// ---------------------------------------------------------------------------

struct ScriptedSurface {
    snapshots: VecDeque<Result<String, ScrapeError>>,
    repeat: String,
}

impl ScriptedSurface {
    fn new(snapshots: Vec<Result<String, ScrapeError>>, repeat: String) -> Self {
        Self {
            snapshots: snapshots.into(),
            repeat,
        }
    }
}

#[async_trait]
impl SearchSurface for ScriptedSurface {
    async fn scroll(&mut self, _pixels: u32) -> Result<(), ScrapeError> {
        Ok(())
    }

    async fn settle(&mut self) {}

    async fn snapshot(&mut self) -> Result<String, ScrapeError> {
        self.snapshots
            .pop_front()
            .unwrap_or_else(|| Ok(self.repeat.clone()))
    }
}

/// Serves one brand-new post on every snapshot — content never dries up.
struct EndlessSurface {
    served: usize,
}

#[async_trait]
impl SearchSurface for EndlessSurface {
    async fn scroll(&mut self, _pixels: u32) -> Result<(), ScrapeError> {
        Ok(())
    }

    async fn settle(&mut self) {}

    async fn snapshot(&mut self) -> Result<String, ScrapeError> {
        self.served += 1;
        Ok(page(&posts(self.served)))
    }
}

/// Scrolling always fails; snapshots still work.
struct BrokenScrollSurface {
    inner: ScriptedSurface,
}

#[async_trait]
impl SearchSurface for BrokenScrollSurface {
    async fn scroll(&mut self, _pixels: u32) -> Result<(), ScrapeError> {
        Err(ScrapeError::Browser("wheel event rejected".to_string()))
    }

    async fn settle(&mut self) {}

    async fn snapshot(&mut self) -> Result<String, ScrapeError> {
        self.inner.snapshot().await
    }
}

fn extraction_err() -> Result<String, ScrapeError> {
    Err(ScrapeError::ExtractionFailed(
        "stale element reference".to_string(),
    ))
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// Five unique posts across two scroll cycles, then nothing new: the run
/// stops after 2 + 3 dry cycles with exactly five records.
#[tokio::test]
async fn five_posts_over_two_cycles_then_dry() {
    let all = posts(5);
    let mut surface = ScriptedSurface::new(
        vec![Ok(page(&all[..3])), Ok(page(&all))],
        page(&all),
    );
    let mut collector = Collector::new("unused.json");

    let summary = harvest::run(&mut surface, &mut collector, &tuning(15))
        .await
        .unwrap();

    assert_eq!(summary.cycles, 5);
    assert_eq!(summary.accepted, 5);
    assert_eq!(summary.termination, Termination::NoNewContent);

    // Insertion order follows extraction order across cycles.
    let handles: Vec<&str> = collector.records().iter().map(|r| r.handle.as_str()).collect();
    assert_eq!(handles, ["/user0", "/user1", "/user2", "/user3", "/user4"]);
}

/// The hard cap always wins, even when every cycle finds something new.
#[tokio::test]
async fn scroll_cap_bounds_an_endless_timeline() {
    let mut surface = EndlessSurface { served: 0 };
    let mut collector = Collector::new("unused.json");

    let summary = harvest::run(&mut surface, &mut collector, &tuning(4))
        .await
        .unwrap();

    assert_eq!(summary.cycles, 4);
    assert_eq!(summary.termination, Termination::ScrollCapReached);
    assert_eq!(summary.accepted, 4);
}

/// A snapshot failure is retried within the same cycle; the retry's posts
/// still land.
#[tokio::test]
async fn failed_snapshot_is_retried_once() {
    let two = posts(2);
    let mut surface = ScriptedSurface::new(
        vec![extraction_err(), Ok(page(&two))],
        page(&two),
    );
    let mut collector = Collector::new("unused.json");

    let summary = harvest::run(&mut surface, &mut collector, &tuning(15))
        .await
        .unwrap();

    assert_eq!(summary.accepted, 2);
    // Cycle 1 recovered on retry, then three dry cycles.
    assert_eq!(summary.cycles, 4);
    assert_eq!(summary.termination, Termination::NoNewContent);
}

/// Two failures in one cycle skip that cycle but never abort the run.
#[tokio::test]
async fn persistently_failing_cycle_is_skipped_not_fatal() {
    let two = posts(2);
    let mut surface = ScriptedSurface::new(
        vec![extraction_err(), extraction_err(), Ok(page(&two))],
        page(&two),
    );
    let mut collector = Collector::new("unused.json");

    let summary = harvest::run(&mut surface, &mut collector, &tuning(15))
        .await
        .unwrap();

    assert_eq!(summary.accepted, 2);
    // Skipped cycle + productive cycle + three dry cycles.
    assert_eq!(summary.cycles, 5);
}

/// Scroll errors degrade to warnings; collection continues.
#[tokio::test]
async fn broken_scrolling_still_collects_whats_visible() {
    let three = posts(3);
    let mut surface = BrokenScrollSurface {
        inner: ScriptedSurface::new(vec![Ok(page(&three))], page(&three)),
    };
    let mut collector = Collector::new("unused.json");

    let summary = harvest::run(&mut surface, &mut collector, &tuning(15))
        .await
        .unwrap();

    assert_eq!(summary.accepted, 3);
    assert_eq!(summary.termination, Termination::NoNewContent);
}

/// A results page that never renders a single post terminates on the dry
/// counter and still produces a valid (empty) output file.
#[tokio::test]
async fn empty_results_terminate_and_write_empty_array() {
    let empty = page(&[]);
    let mut surface = ScriptedSurface::new(vec![], empty);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nothing_tweets.json");
    let mut collector = Collector::new(&out);

    let summary = harvest::run(&mut surface, &mut collector, &tuning(15))
        .await
        .unwrap();
    collector.finalize().unwrap();

    assert_eq!(summary.accepted, 0);
    assert_eq!(summary.cycles, 3);
    let parsed: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert!(parsed.is_empty());
}

/// Re-served posts are deduplicated across cycles even when the timeline
/// reorders them.
#[tokio::test]
async fn reordered_reserves_do_not_duplicate() {
    let all = posts(3);
    let reordered: Vec<String> = all.iter().rev().cloned().collect();
    let mut surface = ScriptedSurface::new(
        vec![Ok(page(&all)), Ok(page(&reordered))],
        page(&reordered),
    );
    let mut collector = Collector::new("unused.json");

    let summary = harvest::run(&mut surface, &mut collector, &tuning(15))
        .await
        .unwrap();

    assert_eq!(summary.accepted, 3);
}
