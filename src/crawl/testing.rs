// src/crawl/testing.rs
// =============================================================================
// In-memory family trees and helpers for the crawl tests.
// =============================================================================

use crate::crawl::scheduler::CrawlOutcome;
use crate::crawl::sink::ResultSink;
use crate::crawl::{CredentialStore, CrawlContext};
use crate::error::{Result, ScoutError};
use crate::family::{
    CatalogProject, FamilyProvider, FamilyUnit, JsonCatalog, ProfileId, ReferenceProfiles,
    Relative,
};
use crate::session::{CrawlOptions, CrawlStatus, SessionStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn relative(id: &str, relation: &str) -> Relative {
    Relative {
        id: id.to_string(),
        relation: relation.to_string(),
        name: id.to_uppercase(),
        master: false,
        message: None,
    }
}

struct StopHook {
    store: Arc<SessionStore>,
    subject: String,
    at_call: usize,
}

/// A provider backed by a fixed map of units, recording every call
#[derive(Default)]
pub(crate) struct FakeTree {
    units: HashMap<ProfileId, FamilyUnit>,
    delay: Option<Duration>,
    reject: bool,
    unavailable: HashSet<ProfileId>,
    calls: Mutex<Vec<Vec<ProfileId>>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    stop_hook: Mutex<Option<StopHook>>,
}

impl FakeTree {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn unit(mut self, id: &str, parents: &[&str], relatives: Vec<Relative>) -> Self {
        let unit = FamilyUnit {
            focus: Some(id.to_string()),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            relatives,
        };
        self.units.insert(id.to_string(), unit);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn reject_credentials(mut self) -> Self {
        self.reject = true;
        self
    }

    /// Any batch containing `id` fails as if the provider were down
    pub(crate) fn unavailable(mut self, id: &str) -> Self {
        self.unavailable.insert(id.to_string());
        self
    }

    /// Stops the subject's session when the `n`th call arrives
    pub(crate) fn stop_after_calls(&self, store: Arc<SessionStore>, subject: &str, n: usize) {
        *self.stop_hook.lock() = Some(StopHook {
            store,
            subject: subject.to_string(),
            at_call: n,
        });
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub(crate) fn expanded(&self) -> Vec<ProfileId> {
        self.calls.lock().iter().flatten().cloned().collect()
    }

    pub(crate) fn batch_sizes(&self) -> Vec<usize> {
        self.calls.lock().iter().map(Vec::len).collect()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FamilyProvider for FakeTree {
    async fn fetch_family_group(
        &self,
        ids: &[ProfileId],
        _credential: &str,
    ) -> Result<Vec<FamilyUnit>> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push(ids.to_vec());
            calls.len()
        };
        if let Some(hook) = self.stop_hook.lock().as_ref() {
            if hook.at_call == call {
                hook.store.stop(&hook.subject);
            }
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.reject {
            return Err(ScoutError::Auth);
        }
        if ids.iter().any(|id| self.unavailable.contains(id)) {
            return Err(ScoutError::ProviderUnavailable("HTTP 503".to_string()));
        }

        Ok(ids
            .iter()
            .filter_map(|id| self.units.get(id).cloned())
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    progress: Mutex<Vec<CrawlStatus>>,
    outcomes: Mutex<Vec<CrawlOutcome>>,
}

impl RecordingSink {
    pub(crate) fn outcomes(&self) -> Vec<CrawlOutcome> {
        self.outcomes.lock().clone()
    }

    pub(crate) fn progress(&self) -> Vec<CrawlStatus> {
        self.progress.lock().clone()
    }
}

impl ResultSink for RecordingSink {
    fn on_progress(&self, _subject: &str, status: &CrawlStatus) {
        self.progress.lock().push(status.clone());
    }

    fn on_complete(&self, _subject: &str, outcome: CrawlOutcome) {
        self.outcomes.lock().push(outcome);
    }
}

/// A started session for subject "me" wired to a FakeTree
pub(crate) struct TestCrawl {
    pub(crate) ctx: Arc<CrawlContext>,
    pub(crate) tree: Arc<FakeTree>,
}

impl TestCrawl {
    pub(crate) fn provider_calls(&self) -> usize {
        self.tree.calls()
    }
}

impl Deref for TestCrawl {
    type Target = CrawlContext;

    fn deref(&self) -> &CrawlContext {
        &self.ctx
    }
}

pub(crate) async fn context(
    tree: FakeTree,
    projects: Vec<CatalogProject>,
    options: CrawlOptions,
) -> TestCrawl {
    let tree = Arc::new(tree);
    let store = Arc::new(SessionStore::new());
    let session = store.start("me", options);

    let credentials = Arc::new(CredentialStore::default());
    credentials.set("me", "token");

    let references = Arc::new(ReferenceProfiles::new(Arc::new(JsonCatalog::new(
        projects, 10985,
    ))));
    let reference_set = references.get().await.unwrap();

    let ctx = Arc::new(CrawlContext {
        session,
        store,
        credentials,
        provider: tree.clone(),
        references,
        reference_set,
    });

    TestCrawl { ctx, tree }
}
