//! The surface the scroll loop drives.
//!
//! `SearchSurface` is the seam between the pagination state machine and the
//! live browser: scroll, bounded settle, HTML snapshot. The CDP
//! implementation is a thin wrapper over the page; tests drive the loop with
//! a scripted implementation instead.

use async_trait::async_trait;
use chromiumoxide::Page;

use crate::core::config::HarvestTuning;
use crate::core::error::ScrapeError;
use crate::scraping::browser;

#[async_trait]
pub trait SearchSurface {
    /// Trigger one scroll step toward the bottom of the visible content.
    async fn scroll(&mut self, pixels: u32) -> Result<(), ScrapeError>;

    /// Bounded wait for asynchronously-injected content to render.
    /// Never fails — a wait that goes wrong is just a wait that was too short.
    async fn settle(&mut self);

    /// Capture the rendered page as HTML.
    async fn snapshot(&mut self) -> Result<String, ScrapeError>;
}

/// Live CDP-backed surface.
pub struct CdpSurface<'a> {
    page: &'a Page,
    tuning: &'a HarvestTuning,
}

impl<'a> CdpSurface<'a> {
    pub fn new(page: &'a Page, tuning: &'a HarvestTuning) -> Self {
        Self { page, tuning }
    }
}

#[async_trait]
impl SearchSurface for CdpSurface<'_> {
    async fn scroll(&mut self, pixels: u32) -> Result<(), ScrapeError> {
        self.page
            .evaluate(format!(
                "window.scrollBy({{top: {}, behavior: 'smooth'}});",
                pixels
            ))
            .await
            .map_err(ScrapeError::browser)?;
        Ok(())
    }

    async fn settle(&mut self) {
        // Floor first so the scroll handler fires before the idle probe.
        tokio::time::sleep(std::time::Duration::from_millis(self.tuning.scroll_floor_ms)).await;
        browser::wait_until_stable(
            self.page,
            self.tuning.settle_quiet_ms,
            self.tuning.settle_cap_ms,
        )
        .await;
    }

    async fn snapshot(&mut self) -> Result<String, ScrapeError> {
        self.page
            .content()
            .await
            .map_err(|e| ScrapeError::ExtractionFailed(format!("snapshot: {}", e)))
    }
}
