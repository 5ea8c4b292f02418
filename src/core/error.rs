use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy for a harvest run.
///
/// Per-element extraction failures are recovered locally inside the scroll
/// loop and never surface here; what does surface is terminal for the run,
/// and the orchestrator still flushes collected records before exiting.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("verification challenge not resolved: {0}")]
    VerificationRequired(String),

    #[error("unexpected login page state: {0}")]
    UnknownLoginError(String),

    #[error("no stored session at {}", .0.display())]
    SessionNotFound(PathBuf),

    #[error("stored session data is corrupt: {0}")]
    CorruptSessionData(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    /// A whole snapshot/parse cycle failed. Retried once in the scroll loop,
    /// then the cycle is skipped — only the loop itself sees this.
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Wrap a chromiumoxide / CDP error.
    pub fn browser(e: impl std::fmt::Display) -> Self {
        Self::Browser(e.to_string())
    }
}
