//! Session cookie persistence — load / normalize / save / inject.
//!
//! After a successful login the browser cookies are saved as a JSON array of
//! opaque cookie objects (the CDP export shape). On a `--skip-login` run the
//! same file is loaded back and injected into the page *before* navigation so
//! the first request already carries the session.
//!
//! Freshness is deliberately not checked here: the platform invalidates
//! sessions at unknown times, and the only reliable signal is the live
//! logged-in probe in [`super::validate`].

use std::path::{Path, PathBuf};

use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, GetCookiesParams, SetCookiesParams,
};
use chromiumoxide::Page;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::core::error::ScrapeError;
use crate::core::types::SessionState;

/// Default session file: `~/.nightjar/session.json`, falling back to the
/// working directory when no home dir can be resolved.
pub fn default_session_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".nightjar").join("session.json"))
        .unwrap_or_else(|| PathBuf::from("x_session.json"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Load / save
// ─────────────────────────────────────────────────────────────────────────────

/// Load stored cookies from `path`, normalized for the platform.
///
/// * Missing file → [`ScrapeError::SessionNotFound`]
/// * Unparsable file, or a parsable file with no cookies in it →
///   [`ScrapeError::CorruptSessionData`]
pub fn load(path: &Path) -> Result<SessionState, ScrapeError> {
    if !path.exists() {
        return Err(ScrapeError::SessionNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let cookies: Vec<Value> = serde_json::from_str(&content)
        .map_err(|e| ScrapeError::CorruptSessionData(format!("{}: {}", path.display(), e)))?;
    if cookies.is_empty() {
        return Err(ScrapeError::CorruptSessionData(format!(
            "{}: cookie array is empty",
            path.display()
        )));
    }
    let normalized = normalize(&cookies);
    info!(
        "session: 🍪 loaded {} cookies from {}",
        normalized.len(),
        path.display()
    );
    Ok(normalized)
}

/// Overwrite the session file with `cookies`.
///
/// Writes to a temp file in the same directory and renames over the target so
/// a crash mid-write never leaves a partial file behind.
pub fn save(path: &Path, cookies: &SessionState) -> Result<(), ScrapeError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    let body = serde_json::to_string_pretty(cookies)
        .map_err(|e| ScrapeError::CorruptSessionData(e.to_string()))?;
    std::fs::write(&tmp, body)?;
    std::fs::rename(&tmp, path)?;
    info!("session: 💾 saved {} cookies to {}", cookies.len(), path.display());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Normalization
// ─────────────────────────────────────────────────────────────────────────────

/// Normalize raw cookie objects for x.com.
///
/// Browser-export shapes drift: legacy exports carry `twitter.com` domains,
/// `expirationDate` instead of `expires`, and lowercase `sameSite` tokens.
/// The output objects deserialize cleanly into CDP `CookieParam`s.
pub fn normalize(raw: &[Value]) -> SessionState {
    raw.iter().filter_map(normalize_one).collect()
}

fn normalize_one(cookie: &Value) -> Option<Value> {
    let name = cookie.get("name")?.as_str()?;
    let value = cookie.get("value")?.as_str()?;

    let mut domain = cookie
        .get("domain")
        .and_then(|d| d.as_str())
        .unwrap_or_default()
        .to_string();
    if !domain.is_empty() && !domain.starts_with('.') {
        domain.insert(0, '.');
    }
    if domain.contains("twitter.com") {
        domain = domain.replace("twitter.com", "x.com");
    }
    if domain.is_empty() {
        domain = ".x.com".to_string();
    }

    let secure = cookie.get("secure").and_then(|s| s.as_bool()).unwrap_or(true);
    let http_only = cookie
        .get("httpOnly")
        .and_then(|s| s.as_bool())
        .unwrap_or(false);
    let path = cookie.get("path").and_then(|p| p.as_str()).unwrap_or("/");

    let mut out = json!({
        "name": name,
        "value": value,
        "path": path,
        "secure": secure,
        "httpOnly": http_only,
        "domain": domain,
        "sameSite": if secure { "None" } else { "Lax" },
    });

    match cookie
        .get("sameSite")
        .and_then(|s| s.as_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
        .as_str()
    {
        "no_restriction" => {
            out["sameSite"] = json!("None");
            out["secure"] = json!(true);
        }
        "lax" => out["sameSite"] = json!("Lax"),
        "strict" => out["sameSite"] = json!("Strict"),
        _ => {}
    }

    // Extension exports use `expirationDate`; CDP uses `expires`.
    let expires = cookie
        .get("expirationDate")
        .or_else(|| cookie.get("expires"))
        .and_then(|e| e.as_f64());
    if let Some(exp) = expires {
        out["expires"] = json!(exp.trunc());
    }

    Some(out)
}

// ─────────────────────────────────────────────────────────────────────────────
// Inject / capture
// ─────────────────────────────────────────────────────────────────────────────

/// Inject stored session cookies into a live CDP page.
///
/// Cookies are deserialized into [`CookieParam`]s and set via
/// `Network.setCookies`. Any individual cookie that fails to deserialize is
/// skipped so one malformed entry never blocks the run. Call this **before**
/// the first navigation so the cookies ride on the initial request.
pub async fn inject(page: &Page, cookies: &SessionState) -> Result<(), ScrapeError> {
    let params: Vec<CookieParam> = cookies
        .iter()
        .filter_map(|v| serde_json::from_value::<CookieParam>(v.clone()).ok())
        .collect();

    if params.is_empty() {
        return Err(ScrapeError::CorruptSessionData(
            "stored session contained no valid cookie objects".to_string(),
        ));
    }

    let count = params.len();
    page.execute(SetCookiesParams::new(params))
        .await
        .map_err(ScrapeError::browser)?;
    info!("session: 💉 injected {} cookies into page", count);
    Ok(())
}

/// Capture the live page's cookies as an opaque [`SessionState`].
pub async fn capture(page: &Page) -> Result<SessionState, ScrapeError> {
    let resp = page
        .execute(GetCookiesParams::default())
        .await
        .map_err(ScrapeError::browser)?;

    let cookies: Vec<Value> = resp
        .result
        .cookies
        .iter()
        .filter_map(|c| serde_json::to_value(c).ok())
        .collect();

    if cookies.is_empty() {
        warn!("session: page yielded no cookies — login may not have stuck");
    }
    Ok(cookies)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_cookie(domain: &str) -> Value {
        json!({
            "name": "auth_token",
            "value": "abc123",
            "domain": domain,
            "path": "/",
            "secure": true,
            "httpOnly": true,
            "expirationDate": 1_900_000_000.5
        })
    }

    #[test]
    fn normalize_rewrites_legacy_domains() {
        let out = normalize(&[raw_cookie("twitter.com")]);
        assert_eq!(out[0]["domain"], ".x.com");
        assert_eq!(out[0]["expires"], json!(1_900_000_000.0));
    }

    #[test]
    fn normalize_prepends_leading_dot() {
        let out = normalize(&[raw_cookie("x.com")]);
        assert_eq!(out[0]["domain"], ".x.com");
        let out = normalize(&[raw_cookie(".x.com")]);
        assert_eq!(out[0]["domain"], ".x.com");
    }

    #[test]
    fn normalize_maps_same_site_tokens() {
        let mut c = raw_cookie("x.com");
        c["sameSite"] = json!("no_restriction");
        c["secure"] = json!(false);
        let out = normalize(&[c]);
        assert_eq!(out[0]["sameSite"], "None");
        assert_eq!(out[0]["secure"], json!(true));

        let mut c = raw_cookie("x.com");
        c["sameSite"] = json!("lax");
        let out = normalize(&[c]);
        assert_eq!(out[0]["sameSite"], "Lax");
    }

    #[test]
    fn normalize_defaults_missing_domain() {
        let c = json!({"name": "ct0", "value": "v"});
        let out = normalize(&[c]);
        assert_eq!(out[0]["domain"], ".x.com");
        assert_eq!(out[0]["path"], "/");
    }

    #[test]
    fn normalize_drops_nameless_entries() {
        let out = normalize(&[json!({"value": "orphan"})]);
        assert!(out.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let state = normalize(&[raw_cookie("x.com"), {
            let mut c = raw_cookie("twitter.com");
            c["name"] = json!("ct0");
            c
        }]);
        save(&path, &state).unwrap();
        let loaded = load(&path).unwrap();

        // Already-normalized state re-normalizes to itself.
        assert_eq!(loaded.len(), state.len());
        for cookie in &state {
            assert!(loaded.contains(cookie), "missing {cookie}");
        }

        // And saving what we loaded is byte-stable.
        let path2 = dir.path().join("session2.json");
        save(&path2, &loaded).unwrap();
        assert_eq!(load(&path2).unwrap(), loaded);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ScrapeError::SessionNotFound(_)));
    }

    #[test]
    fn load_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, ScrapeError::CorruptSessionData(_)));
    }

    #[test]
    fn load_empty_array_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "[]").unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, ScrapeError::CorruptSessionData(_)));
    }
}
