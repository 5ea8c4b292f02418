//! Harvest tuning — every heuristic constant of the scroll loop, resolved
//! default → `NIGHTJAR_*` env override.
//!
//! The platform's rendering timing is undocumented and shifts without
//! notice, so none of these are hardcoded at call sites: the observed
//! defaults live here and an operator can override any of them without a
//! rebuild.

/// Tuning knobs for navigation, settling, and the scroll loop.
#[derive(Debug, Clone)]
pub struct HarvestTuning {
    /// Hard cap on scroll cycles. CLI `-s/--max-scrolls` overrides this.
    pub max_scrolls: u32,
    /// Consecutive zero-new-record cycles that end the run.
    pub no_new_limit: u32,
    /// Pixels per scroll step.
    pub scroll_step_px: u32,
    /// Floor delay after a scroll before the settle probe starts, ms.
    pub scroll_floor_ms: u64,
    /// Quiet window for the network-idle settle heuristic, ms.
    pub settle_quiet_ms: u64,
    /// Upper bound on any single settle wait, ms.
    pub settle_cap_ms: u64,
    /// Upper bound on a single navigation attempt, ms.
    pub nav_timeout_ms: u64,
    /// Upper bound on waiting for any single login-form element, ms.
    pub form_wait_ms: u64,
    /// Bounded wait for the 2FA / verification operator prompt, seconds.
    pub verification_timeout_secs: u64,
    /// Candidate text shorter than this is treated as non-post noise.
    pub min_text_len: usize,
}

impl Default for HarvestTuning {
    fn default() -> Self {
        Self {
            max_scrolls: 15,
            no_new_limit: 3,
            scroll_step_px: 3000,
            scroll_floor_ms: 500,
            settle_quiet_ms: 1000,
            settle_cap_ms: 4000,
            nav_timeout_ms: 30_000,
            form_wait_ms: 15_000,
            verification_timeout_secs: 120,
            min_text_len: 10,
        }
    }
}

impl HarvestTuning {
    /// Defaults with any `NIGHTJAR_*` env overrides applied.
    pub fn resolve() -> Self {
        let d = Self::default();
        Self {
            max_scrolls: env_parse("NIGHTJAR_MAX_SCROLLS", d.max_scrolls),
            no_new_limit: env_parse("NIGHTJAR_NO_NEW_LIMIT", d.no_new_limit),
            scroll_step_px: env_parse("NIGHTJAR_SCROLL_STEP_PX", d.scroll_step_px),
            scroll_floor_ms: env_parse("NIGHTJAR_SCROLL_FLOOR_MS", d.scroll_floor_ms),
            settle_quiet_ms: env_parse("NIGHTJAR_SETTLE_QUIET_MS", d.settle_quiet_ms),
            settle_cap_ms: env_parse("NIGHTJAR_SETTLE_CAP_MS", d.settle_cap_ms),
            nav_timeout_ms: env_parse("NIGHTJAR_NAV_TIMEOUT_MS", d.nav_timeout_ms),
            form_wait_ms: env_parse("NIGHTJAR_FORM_WAIT_MS", d.form_wait_ms),
            verification_timeout_secs: env_parse(
                "NIGHTJAR_VERIFICATION_TIMEOUT_SECS",
                d.verification_timeout_secs,
            ),
            min_text_len: env_parse("NIGHTJAR_MIN_TEXT_LEN", d.min_text_len),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_platform_values() {
        let t = HarvestTuning::default();
        assert_eq!(t.max_scrolls, 15);
        assert_eq!(t.no_new_limit, 3);
        assert_eq!(t.min_text_len, 10);
    }

    #[test]
    fn env_override_wins_and_garbage_falls_back() {
        std::env::set_var("NIGHTJAR_NO_NEW_LIMIT", "5");
        std::env::set_var("NIGHTJAR_SCROLL_STEP_PX", "not-a-number");
        let t = HarvestTuning::resolve();
        assert_eq!(t.no_new_limit, 5);
        assert_eq!(t.scroll_step_px, HarvestTuning::default().scroll_step_px);
        std::env::remove_var("NIGHTJAR_NO_NEW_LIMIT");
        std::env::remove_var("NIGHTJAR_SCROLL_STEP_PX");
    }
}
