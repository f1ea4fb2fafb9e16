// src/crawl/scheduler.rs
// =============================================================================
// The wave scheduler: runs one crawl from start to finish.
//
// How it works:
// 1. Take the whole frontier as this generation's wave
// 2. Split the wave into batches of `batch_size` profiles
// 3. Run up to `worker_slots` batches at once; a new batch starts as soon as
//    one finishes
// 4. When the wave is drained, move to the next generation if the workers
//    queued any parents, otherwise stop
//
// Generations never overlap: every batch of generation N has finished before
// the first batch of generation N+1 is started.
//
// Stopping is cooperative. Once `running` reads false no further batches are
// started, batches already in flight run to their next check, and the run
// ends as Cancelled.
// =============================================================================

use crate::config::ScoutConfig;
use crate::crawl::sink::ResultSink;
use crate::crawl::worker::{run_batch, BatchOutcome};
use crate::crawl::CrawlContext;
use crate::family::ProfileId;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// How a crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlOutcome {
    /// No more parents to expand, or the generation limit was reached
    Completed,
    /// The session was stopped while the crawl was running
    Cancelled,
    /// The provider rejected the credential
    CredentialRejected,
}

// Splits a wave into batches of at most `size` profiles
pub fn partition(wave: Vec<ProfileId>, size: usize) -> Vec<Vec<ProfileId>> {
    wave.chunks(size.max(1)).map(|chunk| chunk.to_vec()).collect()
}

pub(crate) async fn run_crawl(
    ctx: Arc<CrawlContext>,
    config: ScoutConfig,
    sink: Arc<dyn ResultSink>,
) -> CrawlOutcome {
    let session = &ctx.session;
    let subject = session.subject();
    let limit = session.options().generation_limit;
    let mut last_processed = None;

    info!(subject, root = session.root(), "Crawl started");

    let outcome = loop {
        if !session.is_running() {
            break CrawlOutcome::Cancelled;
        }

        let (generation, wave) = session.with(|s| (s.generation, s.take_wave()));
        if wave.is_empty() {
            break CrawlOutcome::Completed;
        }
        if limit.is_some_and(|limit| generation > limit) {
            info!(subject, generation, "Generation limit reached");
            break CrawlOutcome::Completed;
        }

        let batches = partition(wave, config.batch_size());
        info!(
            subject,
            generation,
            batches = batches.len(),
            "Expanding generation"
        );

        // take_while is evaluated each time a slot frees up, so a stop
        // prevents any further batch from being started
        let mut workers = stream::iter(
            batches
                .into_iter()
                .take_while(|_| session.is_running())
                .map(|batch| run_batch(&ctx, batch)),
        )
        .buffer_unordered(config.worker_slots());

        let mut rejected = false;
        while let Some(result) = workers.next().await {
            if result == BatchOutcome::CredentialRejected {
                rejected = true;
            }
            sink.on_progress(subject, &session.status());
        }
        drop(workers);

        if rejected {
            break CrawlOutcome::CredentialRejected;
        }
        if !session.is_running() {
            break CrawlOutcome::Cancelled;
        }

        last_processed = Some(generation);

        let next = session.with(|s| (!s.frontier().is_empty()).then(|| s.advance()));
        match next {
            Some(next) => info!(subject, generation = next, "Advancing generation"),
            None => break CrawlOutcome::Completed,
        }
    };

    session.finish(last_processed);
    sink.on_progress(subject, &session.status());
    sink.on_complete(subject, outcome);
    info!(subject, ?outcome, "Crawl ended");
    outcome
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why buffer_unordered and not one task per batch?
//    - buffer_unordered(N) keeps at most N batch futures alive
//    - as soon as one completes it pulls the next batch from the iterator
//    - completion order is whatever the network gives us, which is fine:
//      matches are appended in the order their batches finish
//
// 2. Why no timeout on a batch?
//    - a slow provider call only holds its own slot; the other slots keep
//      draining the wave
//
// 3. Why is the stage label set from `last_processed`?
//    - after the final wave the generation counter may already point at a
//      generation that was never expanded (limit reached or stop)
// -----------------------------------------------------------------------------
