// src/crawl/control.rs
// =============================================================================
// The Crawler: the surface callers use to drive crawls.
//
//   start_crawl(subject, credential, options) -> JoinHandle<CrawlOutcome>
//   stop_crawl(subject)
//   status(subject)          -> CrawlStatus
//   matches(subject)         -> Vec<MatchRecord>
//   poll_matches(subject)    -> MatchPoll (all + new since last poll)
//   ancestor_counts(subject) -> generation -> { count, label }
//
// Each subject has at most one running crawl. Starting again replaces it.
// =============================================================================

use crate::config::ScoutConfig;
use crate::crawl::scheduler::{run_crawl, CrawlOutcome};
use crate::crawl::sink::ResultSink;
use crate::crawl::CrawlContext;
use crate::error::Result;
use crate::family::{FamilyProvider, ReferenceProfiles, SubjectId};
use crate::session::{CrawlOptions, CrawlStatus, GenerationCount, MatchPoll, MatchRecord, SessionStore};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Access tokens per subject, cleared when the provider rejects one
#[derive(Default)]
pub struct CredentialStore {
    tokens: DashMap<SubjectId, String>,
}

impl CredentialStore {
    pub fn set(&self, subject: &str, token: &str) {
        self.tokens.insert(subject.to_string(), token.to_string());
    }

    pub fn get(&self, subject: &str) -> Option<String> {
        self.tokens.get(subject).map(|token| token.value().clone())
    }

    pub fn clear(&self, subject: &str) {
        self.tokens.remove(subject);
    }
}

pub struct Crawler {
    store: Arc<SessionStore>,
    credentials: Arc<CredentialStore>,
    provider: Arc<dyn FamilyProvider>,
    references: Arc<ReferenceProfiles>,
    sink: Arc<dyn ResultSink>,
    config: ScoutConfig,
}

impl Crawler {
    pub fn new(
        provider: Arc<dyn FamilyProvider>,
        references: Arc<ReferenceProfiles>,
        sink: Arc<dyn ResultSink>,
        config: ScoutConfig,
    ) -> Self {
        Self {
            store: Arc::new(SessionStore::new()),
            credentials: Arc::new(CredentialStore::default()),
            provider,
            references,
            sink,
            config,
        }
    }

    // Starts a crawl in the background
    //
    // The reference set is loaded (or taken from cache) before the session
    // is created, so a broken catalog is reported here and no session is left
    // behind. The returned handle resolves when the crawl ends.
    pub async fn start_crawl(
        &self,
        subject: &str,
        credential: &str,
        options: CrawlOptions,
    ) -> Result<JoinHandle<CrawlOutcome>> {
        let reference_set = if options.wants_projects() {
            self.references.get().await?
        } else {
            Arc::new(HashSet::new())
        };

        self.credentials.set(subject, credential);
        let session = self.store.start(subject, options);

        let ctx = Arc::new(CrawlContext {
            session,
            store: self.store.clone(),
            credentials: self.credentials.clone(),
            provider: self.provider.clone(),
            references: self.references.clone(),
            reference_set,
        });

        Ok(tokio::spawn(run_crawl(
            ctx,
            self.config.clone(),
            self.sink.clone(),
        )))
    }

    /// Stops the subject's crawl and forgets its session
    pub fn stop_crawl(&self, subject: &str) {
        self.store.stop(subject);
    }

    pub fn status(&self, subject: &str) -> CrawlStatus {
        self.store.status(subject)
    }

    pub fn matches(&self, subject: &str) -> Vec<MatchRecord> {
        self.store.matches(subject)
    }

    pub fn poll_matches(&self, subject: &str) -> MatchPoll {
        self.store.poll_matches(subject)
    }

    pub fn ancestor_counts(&self, subject: &str) -> BTreeMap<u32, GenerationCount> {
        self.store.ancestor_counts(subject)
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }
}
