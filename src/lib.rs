pub mod core;
pub mod scraping;
pub mod session;

// --- Primary exports ---
pub use crate::core::config::HarvestTuning;
pub use crate::core::error::ScrapeError;
pub use crate::core::types::{HarvestSummary, PostRecord, SessionState, Termination};
pub use crate::scraping::collect::Collector;
pub use crate::scraping::surface::{CdpSurface, SearchSurface};
pub use crate::session::auth::Credentials;
