// src/session/store.rs
// =============================================================================
// One crawl session per subject.
//
// A Session is shared between the orchestrator and its batch workers through
// an Arc. It has two parts:
// - `running`: an atomic flag, read by every worker before each unit
// - `state`: everything else, behind one short-lived mutex
//
// The SessionStore maps subject ids to their current Session. Stopping a
// subject removes its entry and clears the flag on the old Session, so
// workers that still hold it notice on their next check.
//
// Reads for an unknown subject never fail; they return the defaults a fresh
// session would report.
// =============================================================================

use crate::family::{ProfileId, SubjectId};
use crate::session::labels::{stage_label, DEFAULT_STAGE};
use crate::session::ledger::{GenerationCount, ParentLedger};
use crate::session::matches::{MatchList, MatchRecord, Submission};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What a crawl looks for and how far it goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlOptions {
    /// Where the crawl starts; the subject itself when absent
    pub root_profile: Option<ProfileId>,
    /// Match relatives flagged as master profiles
    pub master: bool,
    /// Match relatives that carry a problem message (and the problem project)
    pub problem: bool,
    /// Match relatives that belong to a tracked project
    pub project: bool,
    /// Keep ancestor counts per generation
    pub complete: bool,
    /// Last generation to expand
    pub generation_limit: Option<u32>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            root_profile: None,
            master: false,
            problem: false,
            project: true,
            complete: true,
            generation_limit: None,
        }
    }
}

impl CrawlOptions {
    /// Whether reference-set membership is checked at all
    pub fn wants_projects(&self) -> bool {
        self.project || self.problem
    }
}

/// Snapshot returned by status queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStatus {
    pub generation: u32,
    pub stage: String,
    pub running: bool,
    /// Relatives examined so far
    pub processed: u64,
    /// Match submissions since the last poll
    pub hits: u64,
    pub match_count: usize,
}

impl Default for CrawlStatus {
    fn default() -> Self {
        Self {
            generation: 0,
            stage: DEFAULT_STAGE.to_string(),
            running: false,
            processed: 0,
            hits: 0,
            match_count: 0,
        }
    }
}

/// Matches plus the ones that arrived since the previous poll
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPoll {
    pub matches: Vec<MatchRecord>,
    pub fresh: Vec<MatchRecord>,
}

/// Mutable part of a session
#[derive(Debug)]
pub struct CrawlSession {
    pub generation: u32,
    pub stage: String,
    frontier: Vec<ProfileId>,
    queued: HashSet<ProfileId>,
    visited: HashSet<ProfileId>,
    matches: MatchList,
    processed: u64,
    hits_at_last_reset: u64,
    ledger: ParentLedger,
}

impl CrawlSession {
    fn new(root: ProfileId) -> Self {
        let mut session = Self {
            generation: 0,
            stage: DEFAULT_STAGE.to_string(),
            frontier: Vec::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            matches: MatchList::default(),
            processed: 0,
            hits_at_last_reset: 0,
            ledger: ParentLedger::default(),
        };
        session.enqueue(root);
        session
    }

    // Queues a profile for the next generation
    //
    // Returns false when the profile was already expanded or is already
    // waiting in the frontier.
    pub fn enqueue(&mut self, profile: ProfileId) -> bool {
        if self.visited.contains(&profile) || self.queued.contains(&profile) {
            return false;
        }
        self.queued.insert(profile.clone());
        self.frontier.push(profile);
        true
    }

    /// Drains the frontier into a wave and marks its profiles as expanded
    pub fn take_wave(&mut self) -> Vec<ProfileId> {
        self.queued.clear();
        let wave = std::mem::take(&mut self.frontier);
        self.visited.extend(wave.iter().cloned());
        wave
    }

    pub fn frontier(&self) -> &[ProfileId] {
        &self.frontier
    }

    pub fn has_visited(&self, profile: &str) -> bool {
        self.visited.contains(profile)
    }

    pub fn submit_match(&mut self, candidate: MatchRecord) -> Submission {
        self.matches.submit(candidate)
    }

    pub fn matches(&self) -> &[MatchRecord] {
        self.matches.records()
    }

    pub fn add_processed(&mut self, relatives: usize) {
        self.processed += relatives as u64;
    }

    pub fn ledger(&self) -> &ParentLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut ParentLedger {
        &mut self.ledger
    }

    /// Moves on to the next generation
    pub fn advance(&mut self) -> u32 {
        self.generation += 1;
        self.stage = stage_label(i64::from(self.generation));
        self.generation
    }

    fn new_hits(&self) -> u64 {
        self.matches.hits().saturating_sub(self.hits_at_last_reset)
    }

    // Returns every match, the ones added since the last poll, and resets
    // the hit baseline
    fn poll(&mut self) -> MatchPoll {
        let records = self.matches.records();
        let seen = records.len().saturating_sub(self.new_hits() as usize);
        let poll = MatchPoll {
            matches: records.to_vec(),
            fresh: records[seen..].to_vec(),
        };
        self.hits_at_last_reset = self.matches.hits();
        poll
    }
}

pub struct Session {
    subject: SubjectId,
    root: ProfileId,
    options: CrawlOptions,
    running: AtomicBool,
    state: Mutex<CrawlSession>,
}

impl Session {
    fn new(subject: SubjectId, options: CrawlOptions) -> Self {
        let root = options
            .root_profile
            .clone()
            .unwrap_or_else(|| subject.clone());
        Self {
            state: Mutex::new(CrawlSession::new(root.clone())),
            subject,
            root,
            options,
            running: AtomicBool::new(true),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn halt(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Runs `f` with the session state locked. Never hold it across an await.
    pub fn with<R>(&self, f: impl FnOnce(&mut CrawlSession) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn generation(&self) -> u32 {
        self.state.lock().generation
    }

    // Ends the run: clears the flag and labels the stage after the last
    // generation that was fully processed (None = nothing was)
    pub(crate) fn finish(&self, last_processed: Option<u32>) {
        self.halt();
        let generation = last_processed.map(i64::from).unwrap_or(-1);
        self.state.lock().stage = stage_label(generation);
    }

    pub fn status(&self) -> CrawlStatus {
        let state = self.state.lock();
        CrawlStatus {
            generation: state.generation,
            stage: state.stage.clone(),
            running: self.is_running(),
            processed: state.processed,
            hits: state.new_hits(),
            match_count: state.matches.len(),
        }
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<SubjectId, Arc<Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Creates a fresh session for the subject, replacing any existing one
    //
    // A replaced session is halted so its workers wind down.
    pub fn start(&self, subject: &str, options: CrawlOptions) -> Arc<Session> {
        let session = Arc::new(Session::new(subject.to_string(), options));
        if let Some(previous) = self.sessions.insert(subject.to_string(), session.clone()) {
            tracing::info!(subject, "Replacing running crawl session");
            previous.halt();
        }
        session
    }

    /// Removes the subject's session. Does nothing if there is none.
    pub fn stop(&self, subject: &str) {
        if let Some((_, session)) = self.sessions.remove(subject) {
            session.halt();
            tracing::info!(subject, "Crawl session stopped");
        }
    }

    // Stops one particular session
    //
    // The store entry is only removed when it still points at `session`; a
    // newer session started for the same subject is left alone. Returns false
    // when such a newer session exists.
    pub fn stop_session(&self, session: &Arc<Session>) -> bool {
        session.halt();
        let subject = session.subject();
        if self
            .sessions
            .remove_if(subject, |_, current| Arc::ptr_eq(current, session))
            .is_some()
        {
            tracing::info!(subject, "Crawl session stopped");
            return true;
        }
        !self.sessions.contains_key(subject)
    }

    pub fn get(&self, subject: &str) -> Option<Arc<Session>> {
        self.sessions.get(subject).map(|entry| entry.value().clone())
    }

    pub fn status(&self, subject: &str) -> CrawlStatus {
        self.get(subject)
            .map(|session| session.status())
            .unwrap_or_default()
    }

    pub fn matches(&self, subject: &str) -> Vec<MatchRecord> {
        self.get(subject)
            .map(|session| session.with(|s| s.matches().to_vec()))
            .unwrap_or_default()
    }

    pub fn poll_matches(&self, subject: &str) -> MatchPoll {
        self.get(subject)
            .map(|session| session.with(|s| s.poll()))
            .unwrap_or_default()
    }

    pub fn ancestor_counts(&self, subject: &str) -> BTreeMap<u32, GenerationCount> {
        self.get(subject)
            .map(|session| session.with(|s| s.ledger().counts().clone()))
            .unwrap_or_default()
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why an AtomicBool next to the Mutex?
//    - Workers check `running` before every unit
//    - Reading an atomic never waits behind a worker holding the state lock
//
// 2. Why does `with` take a closure?
//    - The lock guard cannot escape the closure, so it can never be held
//      across an .await point
//
// 3. Why keep finished sessions in the store?
//    - Status and match queries keep answering after the crawl ends
//    - Only stop() (or a new start) removes them
// -----------------------------------------------------------------------------
