// src/crawl/mod.rs
// =============================================================================
// The generational crawler.
//
// Features:
// - Breadth-first expansion, one generation (wave) at a time
// - A bounded pool of batch workers per wave
// - Match detection against the reference catalog, master and problem flags
// - Ancestor counting that survives pedigree collapse
// - Cooperative cancellation through the session's running flag
//
// Submodules:
// - control: the Crawler facade (start/stop/status/matches/counts)
// - scheduler: one crawl run, wave by wave
// - worker: one provider batch
// - sink: progress reporting
// =============================================================================

mod control;
mod scheduler;
mod sink;
mod worker;

#[cfg(test)]
mod testing;

pub use control::{CredentialStore, Crawler};
pub use scheduler::{partition, CrawlOutcome};
pub use sink::{LogSink, ResultSink};
pub use worker::BatchOutcome;

use crate::family::{FamilyProvider, ProfileId, ReferenceProfiles};
use crate::session::{Session, SessionStore};
use std::collections::HashSet;
use std::sync::Arc;

/// Everything a running crawl and its workers share
pub(crate) struct CrawlContext {
    pub session: Arc<Session>,
    pub store: Arc<SessionStore>,
    pub credentials: Arc<CredentialStore>,
    pub provider: Arc<dyn FamilyProvider>,
    pub references: Arc<ReferenceProfiles>,
    /// Reference set as loaded when the crawl started
    pub reference_set: Arc<HashSet<ProfileId>>,
}
