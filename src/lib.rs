// src/lib.rs
// =============================================================================
// lineage-scout: crawls a family tree one generation at a time, looking for
// relatives that belong to tracked projects, master profiles and profiles
// flagged with a problem message.
//
// Modules:
// - family: provider and catalog collaborators, plus the data they return
// - session: per-subject crawl state, matches and ancestor counts
// - crawl: the wave scheduler, batch workers and the Crawler facade
// - config: tunables shared by the crawler
// - error: the library's error type
// =============================================================================

pub mod config;
pub mod crawl;
pub mod error;
pub mod family;
pub mod session;

pub use config::ScoutConfig;
pub use crawl::{CrawlOutcome, Crawler, LogSink, ResultSink};
pub use error::{Result, ScoutError};
pub use session::{CrawlOptions, CrawlStatus, MatchRecord};
