// src/crawl/sink.rs
// =============================================================================
// Where the orchestrator reports progress.
//
// The orchestrator calls `on_progress` after every finished batch and
// `on_complete` once when the run ends. Whatever sits on the other side
// (a web page polling for status, a terminal) decides how to show it.
// =============================================================================

use crate::crawl::scheduler::CrawlOutcome;
use crate::session::CrawlStatus;

pub trait ResultSink: Send + Sync {
    fn on_progress(&self, subject: &str, status: &CrawlStatus);
    fn on_complete(&self, subject: &str, outcome: CrawlOutcome);
}

/// Reports through tracing
pub struct LogSink;

impl ResultSink for LogSink {
    fn on_progress(&self, subject: &str, status: &CrawlStatus) {
        tracing::info!(
            subject,
            count = status.processed,
            stage = %status.stage,
            running = status.running,
            hits = status.hits,
            matches = status.match_count,
            "Crawl progress"
        );
    }

    fn on_complete(&self, subject: &str, outcome: CrawlOutcome) {
        tracing::info!(subject, ?outcome, "Crawl finished");
    }
}
