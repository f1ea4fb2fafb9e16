// src/session/mod.rs
// =============================================================================
// Per-subject crawl state.
//
// Submodules:
// - store: Session / SessionStore, options and status snapshots
// - matches: match records and the relabel policy
// - ledger: per-generation ancestor counts with pedigree collapse
// - labels: generation names ("grand parent", "2nd great grandparent", ...)
// =============================================================================

mod labels;
mod ledger;
mod matches;
mod store;

pub use labels::{count_label, generation_label, stage_label, DEFAULT_STAGE};
pub use ledger::{GenerationCount, ParentLedger};
pub use matches::{project_tally, MatchList, MatchRecord, ProjectTally, Submission, MASTER_PROFILE};
pub use store::{CrawlOptions, CrawlSession, CrawlStatus, MatchPoll, Session, SessionStore};
