//! Login flow — drives the x.com login surface and returns captured cookies.
//!
//! Every form element is located through an ordered selector list with a
//! bounded wait; the platform reshuffles its login DOM often enough that a
//! single selector has an unacceptable failure rate. A verification
//! challenge (2FA, suspicious-login interstitial) suspends the flow on an
//! operator prompt with a configurable timeout.
//!
//! A failed login is never retried automatically: the operator re-invokes
//! with fresh credentials or clears the stale session file.

use std::time::Duration;

use chromiumoxide::{Element, Page};
use tracing::{info, warn};

use crate::core::config::HarvestTuning;
use crate::core::error::ScrapeError;
use crate::core::types::SessionState;
use crate::scraping::browser;
use crate::session::{store, validate};

const LOGIN_URL: &str = "https://x.com/i/flow/login";

/// Window for the optional verification interstitial to render.
const VERIFICATION_DETECT_MS: u64 = 8_000;

const USERNAME_SELECTORS: &[&str] = &[
    "input[autocomplete=\"username\"]",
    "input[name=\"text\"]",
    "input[data-testid=\"ocfEnterTextTextInput\"]",
];

const PASSWORD_SELECTORS: &[&str] = &[
    "input[name=\"password\"]",
    "input[type=\"password\"]",
    "input[autocomplete=\"current-password\"]",
];

/// Submit buttons worth trying before falling back to Enter on the input.
const LOGIN_BUTTON_SELECTORS: &[&str] = &[
    "button[data-testid=\"LoginForm_Login_Button\"]",
    "[data-testid=\"LoginForm_Login_Button\"]",
    "button[type=\"submit\"]",
];

const VERIFICATION_INPUT: &str = "input[data-testid=\"ocfEnterTextTextInput\"]";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Drive the full login flow on `page` and return the captured session.
///
/// On success the page is left authenticated, so the caller can proceed
/// straight to search without re-injecting anything.
pub async fn login(
    page: &Page,
    creds: &Credentials,
    tuning: &HarvestTuning,
) -> Result<SessionState, ScrapeError> {
    info!("auth: logging in as {}", creds.username);

    browser::goto_with_timeout(page, LOGIN_URL, tuning.nav_timeout_ms).await?;
    browser::wait_until_stable(page, tuning.settle_quiet_ms, tuning.settle_cap_ms).await;

    let username_field = fill_first(page, USERNAME_SELECTORS, &creds.username, tuning)
        .await
        .ok_or_else(|| {
            ScrapeError::UnknownLoginError("username field never appeared".to_string())
        })?;
    advance(page, &username_field, &[]).await?;
    browser::wait_until_stable(page, tuning.settle_quiet_ms, tuning.settle_cap_ms).await;

    handle_verification_challenge(page, tuning).await?;

    let password_field = fill_first(page, PASSWORD_SELECTORS, &creds.password, tuning)
        .await
        .ok_or_else(|| {
            ScrapeError::UnknownLoginError("password field never appeared".to_string())
        })?;
    advance(page, &password_field, LOGIN_BUTTON_SELECTORS).await?;

    // The post-submit redirect chain is slow; give it a generous settle.
    tokio::time::sleep(Duration::from_secs(3)).await;
    browser::wait_until_stable(page, tuning.settle_quiet_ms, tuning.settle_cap_ms * 2).await;

    if !validate::is_authenticated(page, tuning).await {
        return Err(ScrapeError::AuthenticationFailed(
            "login did not produce an authenticated session — check credentials".to_string(),
        ));
    }

    let state = store::capture(page).await?;
    info!("auth: ✅ login verified, captured {} cookies", state.len());
    Ok(state)
}

/// Try each selector in order; type `value` into the first that appears.
async fn fill_first(
    page: &Page,
    selectors: &[&str],
    value: &str,
    tuning: &HarvestTuning,
) -> Option<Element> {
    // Split the budget so the total wait stays bounded by form_wait_ms.
    let per_selector = (tuning.form_wait_ms / selectors.len() as u64).max(1_000);
    for selector in selectors {
        let Some(el) = browser::find_with_deadline(page, selector, per_selector).await else {
            continue;
        };
        let typed = async {
            el.click().await?.type_str(value).await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        }
        .await;
        match typed {
            Ok(()) => {
                info!("auth: filled field via selector {:?}", selector);
                return Some(el);
            }
            Err(e) => {
                warn!("auth: selector {:?} found but typing failed: {}", selector, e);
                continue;
            }
        }
    }
    None
}

/// Submit the current step: try the given buttons, else press Enter on the
/// field itself. The Enter fallback matters — the platform's "Next" button
/// carries no stable selector at all.
async fn advance(page: &Page, field: &Element, buttons: &[&str]) -> Result<(), ScrapeError> {
    for selector in buttons {
        if let Ok(button) = page.find_element(*selector).await {
            if button.click().await.is_ok() {
                info!("auth: clicked {:?}", selector);
                return Ok(());
            }
            warn!("auth: button {:?} present but unclickable", selector);
        }
    }
    field
        .press_key("Enter")
        .await
        .map_err(ScrapeError::browser)?;
    Ok(())
}

/// Detect and resolve the optional verification interstitial.
///
/// This is the suspension point: the flow parks on an operator prompt and
/// resumes when input arrives. No input within the configured timeout fails
/// the run with `VerificationRequired`.
async fn handle_verification_challenge(
    page: &Page,
    tuning: &HarvestTuning,
) -> Result<(), ScrapeError> {
    // The same input testid also matches the username step, so only probe
    // after that step has been submitted.
    let Some(el) = browser::find_with_deadline(page, VERIFICATION_INPUT, VERIFICATION_DETECT_MS).await
    else {
        info!("auth: no verification step");
        return Ok(());
    };

    warn!("auth: ⚠️ verification challenge detected — operator input required");
    let answer = prompt_operator(
        "Enter verification (phone/username/email): ",
        Duration::from_secs(tuning.verification_timeout_secs),
    )
    .await?;

    el.click()
        .await
        .map_err(ScrapeError::browser)?
        .type_str(&answer)
        .await
        .map_err(ScrapeError::browser)?;
    el.press_key("Enter").await.map_err(ScrapeError::browser)?;
    browser::wait_until_stable(page, tuning.settle_quiet_ms, tuning.settle_cap_ms).await;
    Ok(())
}

/// Bounded stdin prompt. The blocking read lives on the blocking pool so the
/// CDP event loop keeps draining while we wait.
async fn prompt_operator(prompt: &str, timeout: Duration) -> Result<String, ScrapeError> {
    use std::io::Write;
    eprint!("{prompt}");
    let _ = std::io::stderr().flush();

    let read = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    });

    match tokio::time::timeout(timeout, read).await {
        Ok(Ok(Ok(line))) => {
            let answer = line.trim().to_string();
            if answer.is_empty() {
                return Err(ScrapeError::VerificationRequired(
                    "empty verification input".to_string(),
                ));
            }
            Ok(answer)
        }
        Ok(Ok(Err(e))) => Err(ScrapeError::Io(e)),
        Ok(Err(_)) => Err(ScrapeError::VerificationRequired(
            "operator prompt task failed".to_string(),
        )),
        Err(_) => Err(ScrapeError::VerificationRequired(format!(
            "no operator input within {}s",
            timeout.as_secs()
        ))),
    }
}
