// src/session/matches.rs
// =============================================================================
// Match records and the merge policy for repeated sightings.
//
// The same profile is often reached more than once during a crawl (as a
// grandfather through one child, as a great uncle through another). The list
// keeps the first record and only ever upgrades its relation label:
//
//   1. existing record carries a message      -> keep
//   2. candidate relation is an aunt/uncle     -> keep
//   3. existing relation is a mother/father    -> keep
//   4. otherwise                               -> take the candidate's label
//
// Every submission bumps the hit counter, new or not.
// =============================================================================

use crate::family::{ProfileId, ProjectRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Message used for master profile matches
pub const MASTER_PROFILE: &str = "Master Profile";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: ProfileId,
    pub relation: String,
    pub name: String,
    /// Set for master/problem matches, absent for project matches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub projects: Vec<ProjectRef>,
}

/// Result of submitting a candidate to the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    New,
    /// A record with the same id was already present (a "rematch")
    Exists,
}

#[derive(Debug, Default)]
pub struct MatchList {
    records: Vec<MatchRecord>,
    by_id: HashMap<ProfileId, usize>,
    hits: u64,
}

impl MatchList {
    pub fn submit(&mut self, candidate: MatchRecord) -> Submission {
        self.hits += 1;

        match self.by_id.get(&candidate.id) {
            Some(&index) => {
                let existing = &mut self.records[index];
                if should_relabel(existing, &candidate) {
                    existing.relation = candidate.relation;
                }
                Submission::Exists
            }
            None => {
                self.by_id.insert(candidate.id.clone(), self.records.len());
                self.records.push(candidate);
                Submission::New
            }
        }
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total submissions, including rematches
    pub fn hits(&self) -> u64 {
        self.hits
    }
}

fn should_relabel(existing: &MatchRecord, candidate: &MatchRecord) -> bool {
    if existing.message.is_some() {
        return false;
    }
    if candidate.relation.contains("aunt") || candidate.relation.contains("uncle") {
        return false;
    }
    if existing.relation.contains("mother") || existing.relation.contains("father") {
        return false;
    }
    true
}

/// How many matches fall into one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTally {
    pub name: String,
    pub count: usize,
}

/// Groups the projects of the given matches by project id
pub fn project_tally(matches: &[MatchRecord]) -> BTreeMap<u64, ProjectTally> {
    let mut tally: BTreeMap<u64, ProjectTally> = BTreeMap::new();
    for project in matches.iter().flat_map(|m| m.projects.iter()) {
        tally
            .entry(project.id)
            .and_modify(|t| t.count += 1)
            .or_insert_with(|| ProjectTally {
                name: project.name.clone(),
                count: 1,
            });
    }
    tally
}
