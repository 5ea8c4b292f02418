//! Search navigation — URL construction plus a two-strategy drive.
//!
//! Direct navigation to a dynamically-rendered search page times out or
//! lands on an empty shell often enough that a single strategy produces
//! unacceptable false negatives. Strategy 1 is the direct URL; strategy 2
//! falls back to driving the search box from the home surface.

use chromiumoxide::Page;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tracing::{info, warn};
use url::Url;

use crate::core::config::HarvestTuning;
use crate::core::error::ScrapeError;
use crate::scraping::browser;

const HOME_URL: &str = "https://x.com/home";

const SEARCH_BOX_SELECTORS: &[&str] = &[
    "input[data-testid=\"SearchBox_Search_Input\"]",
    "input[aria-label=\"Search query\"]",
    "input[placeholder=\"Search\"]",
];

/// Build the search URL for `keyword`. `live` selects recency-ordered
/// results instead of the default relevance ranking.
pub fn search_url(keyword: &str, live: bool) -> String {
    let encoded = utf8_percent_encode(keyword, NON_ALPHANUMERIC).to_string();
    let mut url = format!("https://x.com/search?q={}&src=typed_query", encoded);
    if live {
        url.push_str("&f=live");
    }
    url
}

/// Whether the page actually landed on a search results surface.
async fn on_search_page(page: &Page) -> bool {
    match page.url().await {
        Ok(Some(current)) => Url::parse(&current)
            .map(|u| u.path().starts_with("/search"))
            .unwrap_or(false),
        _ => false,
    }
}

/// Navigate to the search results for `keyword`.
///
/// Tries the direct URL, then the search-box fallback, then fails with
/// [`ScrapeError::NavigationFailed`]. One attempt per strategy — retries
/// beyond that just burn time against a page that isn't coming back.
pub async fn to_search(
    page: &Page,
    keyword: &str,
    live: bool,
    tuning: &HarvestTuning,
) -> Result<(), ScrapeError> {
    let url = search_url(keyword, live);

    info!("navigate: 🔍 search for {:?} via direct URL", keyword);
    match browser::goto_with_timeout(page, &url, tuning.nav_timeout_ms).await {
        Ok(()) => {
            browser::wait_until_stable(page, tuning.settle_quiet_ms, tuning.settle_cap_ms).await;
            if on_search_page(page).await {
                return Ok(());
            }
            warn!("navigate: direct URL did not land on /search");
        }
        Err(e) => warn!("navigate: direct URL failed: {}", e),
    }

    info!("navigate: falling back to search-box entry");
    search_box_fallback(page, keyword, tuning).await?;
    if on_search_page(page).await {
        return Ok(());
    }
    Err(ScrapeError::NavigationFailed(format!(
        "both strategies failed to reach search results for {:?}",
        keyword
    )))
}

/// Strategy 2: go home and type the query into the search box.
async fn search_box_fallback(
    page: &Page,
    keyword: &str,
    tuning: &HarvestTuning,
) -> Result<(), ScrapeError> {
    browser::goto_with_timeout(page, HOME_URL, tuning.nav_timeout_ms).await?;
    browser::wait_until_stable(page, tuning.settle_quiet_ms, tuning.settle_cap_ms).await;

    let per_selector = (tuning.form_wait_ms / SEARCH_BOX_SELECTORS.len() as u64).max(1_000);
    for selector in SEARCH_BOX_SELECTORS {
        let Some(el) = browser::find_with_deadline(page, selector, per_selector).await else {
            continue;
        };
        let driven = async {
            el.click().await?.type_str(keyword).await?.press_key("Enter").await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        }
        .await;
        match driven {
            Ok(()) => {
                info!("navigate: drove search box via {:?}", selector);
                browser::wait_until_stable(page, tuning.settle_quiet_ms, tuning.settle_cap_ms)
                    .await;
                return Ok(());
            }
            Err(e) => warn!("navigate: search box {:?} failed: {}", selector, e),
        }
    }
    Err(ScrapeError::NavigationFailed(
        "search box never appeared on home surface".to_string(),
    ))
}
