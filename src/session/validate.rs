//! Logged-in probe.
//!
//! The platform's DOM is unversioned and unstable, so "is this session
//! authenticated?" is answered by navigating to the home surface and scanning
//! a rendered snapshot for markers that only appear for logged-in users.
//! Absence of a marker is a valid `false` — never an error.

use std::sync::OnceLock;

use aho_corasick::AhoCorasick;
use chromiumoxide::Page;
use tracing::{info, warn};

use crate::core::config::HarvestTuning;
use crate::scraping::browser;

const HOME_URL: &str = "https://x.com/home";

/// Substrings that only render in an authenticated shell.
const AUTH_MARKERS: &[&str] = &[
    "SideNav_AccountSwitcher_Button",
    "primaryNavigation",
    "Home timeline",
];

/// Substrings that indicate we were bounced to the login surface.
const LOGIN_MARKERS: &[&str] = &["name=\"password\"", "LoginForm_Login_Button"];

static AUTH_MATCHER: OnceLock<AhoCorasick> = OnceLock::new();
static LOGIN_MATCHER: OnceLock<AhoCorasick> = OnceLock::new();

fn auth_matcher() -> &'static AhoCorasick {
    AUTH_MATCHER.get_or_init(|| AhoCorasick::new(AUTH_MARKERS).expect("valid auth markers"))
}

fn login_matcher() -> &'static AhoCorasick {
    LOGIN_MATCHER.get_or_init(|| AhoCorasick::new(LOGIN_MARKERS).expect("valid login markers"))
}

/// Pure marker scan over a rendered snapshot. Login markers veto.
pub fn html_looks_authenticated(html: &str) -> bool {
    if login_matcher().is_match(html) {
        return false;
    }
    auth_matcher().is_match(html)
}

/// Probe whether the live session is authenticated.
///
/// Navigates to the home surface, waits a bounded settle, and scans the
/// snapshot. Every failure mode along the way — navigation timeout, snapshot
/// error, missing markers — degrades to `false`.
pub async fn is_authenticated(page: &Page, tuning: &HarvestTuning) -> bool {
    if let Err(e) = browser::goto_with_timeout(page, HOME_URL, tuning.nav_timeout_ms).await {
        warn!("validate: home navigation failed: {}", e);
        return false;
    }
    browser::wait_until_stable(page, tuning.settle_quiet_ms, tuning.settle_cap_ms).await;

    // A redirect to the login flow is the cheapest negative signal.
    if let Ok(Some(url)) = page.url().await {
        if url.contains("/login") || url.contains("/i/flow") {
            info!("validate: redirected to {} — not authenticated", url);
            return false;
        }
    }

    let html = match page.content().await {
        Ok(h) => h,
        Err(e) => {
            warn!("validate: snapshot failed: {}", e);
            return false;
        }
    };

    let ok = html_looks_authenticated(&html);
    if ok {
        info!("validate: ✅ session is authenticated");
    } else {
        info!("validate: session is NOT authenticated");
    }
    ok
}
