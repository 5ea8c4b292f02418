//! The pagination / scroll controller — the core state machine.
//!
//! Each cycle: scroll → bounded settle → snapshot → extract **everything**
//! visible (dedup filters re-sightings) → decide. The loop terminates on the
//! hard scroll cap or after N consecutive cycles with zero new unique
//! records, whichever comes first, so it always halts regardless of what the
//! platform serves.
//!
//! Resilience beats throughput here: a failed cycle is retried once and then
//! skipped with a warning — a single bad cycle must never abort the run or
//! discard what was already collected.

use chrono::Local;
use scraper::Html;
use tracing::{debug, info, warn};

use crate::core::config::HarvestTuning;
use crate::core::error::ScrapeError;
use crate::core::types::{HarvestSummary, Termination};
use crate::scraping::collect::Collector;
use crate::scraping::extract;
use crate::scraping::surface::SearchSurface;

#[derive(Clone, Copy, Debug)]
enum CyclePhase {
    Scrolling,
    Extracting,
    Deciding,
    Terminated,
}

fn log_phase(cycle: u32, phase: CyclePhase) {
    debug!("harvest_cycle={} phase={:?}", cycle, phase);
}

/// Transient per-run loop state, discarded at run end.
#[derive(Debug, Default)]
pub struct ScrollState {
    pub scrolls_performed: u32,
    pub consecutive_no_new_content: u32,
}

/// Run the scroll/extract/dedup loop until a termination condition fires.
///
/// The collector is owned by the caller so an interrupt can still flush
/// whatever this loop managed to gather.
pub async fn run<S: SearchSurface>(
    surface: &mut S,
    collector: &mut Collector,
    tuning: &HarvestTuning,
) -> Result<HarvestSummary, ScrapeError> {
    let mut state = ScrollState::default();
    info!(
        "harvest: 📜 collecting (max {} scrolls, stop after {} dry cycles)",
        tuning.max_scrolls, tuning.no_new_limit
    );

    let termination = loop {
        if state.scrolls_performed >= tuning.max_scrolls {
            break Termination::ScrollCapReached;
        }
        let cycle = state.scrolls_performed + 1;

        log_phase(cycle, CyclePhase::Scrolling);
        if let Err(e) = surface.scroll(tuning.scroll_step_px).await {
            warn!("harvest: cycle {} scroll failed ({}), retrying once", cycle, e);
            if let Err(e) = surface.scroll(tuning.scroll_step_px).await {
                warn!("harvest: cycle {} scroll failed again: {}", cycle, e);
            }
        }
        surface.settle().await;

        log_phase(cycle, CyclePhase::Extracting);
        let newly_accepted = match snapshot_and_extract(surface, collector, tuning).await {
            Ok(n) => n,
            Err(e) => {
                warn!(
                    "harvest: cycle {} extraction failed ({}), retrying once",
                    cycle, e
                );
                surface.settle().await;
                match snapshot_and_extract(surface, collector, tuning).await {
                    Ok(n) => n,
                    Err(e) => {
                        warn!("harvest: cycle {} skipped: {}", cycle, e);
                        0
                    }
                }
            }
        };

        log_phase(cycle, CyclePhase::Deciding);
        state.scrolls_performed += 1;
        if newly_accepted == 0 {
            state.consecutive_no_new_content += 1;
        } else {
            state.consecutive_no_new_content = 0;
        }
        info!(
            "harvest: cycle {}/{} accepted {} new (total {})",
            cycle,
            tuning.max_scrolls,
            newly_accepted,
            collector.len()
        );

        if state.consecutive_no_new_content >= tuning.no_new_limit {
            break Termination::NoNewContent;
        }
    };

    log_phase(state.scrolls_performed, CyclePhase::Terminated);
    info!(
        "harvest: ✅ done after {} cycles ({:?}), {} unique records",
        state.scrolls_performed,
        termination,
        collector.len()
    );
    Ok(HarvestSummary {
        cycles: state.scrolls_performed,
        accepted: collector.len(),
        termination,
    })
}

async fn snapshot_and_extract<S: SearchSurface>(
    surface: &mut S,
    collector: &mut Collector,
    tuning: &HarvestTuning,
) -> Result<usize, ScrapeError> {
    let html = surface.snapshot().await?;
    let stamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    Ok(extract_into(&html, collector, tuning.min_text_len, &stamp))
}

/// Parse and drain one snapshot. Synchronous on purpose: the parsed DOM is
/// not `Send` and must not live across an await.
fn extract_into(html: &str, collector: &mut Collector, min_text_len: usize, stamp: &str) -> usize {
    let doc = Html::parse_document(html);
    let articles = extract::select_articles(&doc);
    if articles.is_empty() {
        debug!("harvest: no post elements visible in snapshot");
    }
    let mut newly_accepted = 0;
    for article in articles {
        if let Some(record) = extract::extract_post(article, stamp, min_text_len) {
            if collector.accept(record) {
                newly_accepted += 1;
            }
        }
    }
    newly_accepted
}
