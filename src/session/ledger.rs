// src/session/ledger.rs
// =============================================================================
// Ancestor counting with pedigree collapse.
//
// When cousins marry, one ancestor sits in several slots of the same pedigree.
// The ledger remembers, per generation, how many lineage paths arrive at each
// profile ("multiplicity"). When that profile is expanded its parents fill
// `parents × multiplicity` ancestor slots, and each parent inherits the same
// multiplicity one generation further up.
//
// Counting happens in two passes per batch:
// - record_unit: the unit's own generation
// - project_ahead: one generation ahead, for foci that were already
//   registered as somebody's parent in the next generation
//
// Slot counts double every generation on a fully collapsed pedigree, so all
// arithmetic saturates at u64::MAX instead of overflowing.
// =============================================================================

use crate::family::ProfileId;
use crate::session::labels::count_label;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Ancestor slots found for one generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationCount {
    pub count: u64,
    pub label: String,
}

#[derive(Debug, Default)]
pub struct ParentLedger {
    multiplicity: HashMap<u32, HashMap<ProfileId, u64>>,
    counts: BTreeMap<u32, GenerationCount>,
}

impl ParentLedger {
    /// Number of lineage paths registered for `profile` at `generation`
    pub fn multiplicity(&self, generation: u32, profile: &str) -> u64 {
        self.multiplicity
            .get(&generation)
            .and_then(|profiles| profiles.get(profile))
            .copied()
            .unwrap_or(0)
    }

    pub fn register(&mut self, generation: u32, profile: &str, times: u64) {
        if times == 0 {
            return;
        }
        let paths = self
            .multiplicity
            .entry(generation)
            .or_default()
            .entry(profile.to_string())
            .or_insert(0);
        *paths = paths.saturating_add(times);
    }

    /// Adds ancestor slots to a generation, labelling it on first use
    pub fn add_ancestors(&mut self, generation: u32, slots: u64) {
        self.counts
            .entry(generation)
            .and_modify(|c| c.count = c.count.saturating_add(slots))
            .or_insert_with(|| GenerationCount {
                count: slots,
                label: count_label(i64::from(generation)),
            });
    }

    pub fn counts(&self) -> &BTreeMap<u32, GenerationCount> {
        &self.counts
    }

    // First pass: count the parents of a focus expanded at `generation`
    //
    // A focus nobody registered yet (the root, or a profile reached through
    // a single path) contributes its parents once. A focus reached through n
    // paths contributes its parents n times, and passes n on to each parent.
    pub fn record_unit(&mut self, generation: u32, focus: &str, parents: &[ProfileId]) {
        let rootcount = self.multiplicity(generation, focus);
        let parentscount = parents.len() as u64;

        let slots = if rootcount == 0 {
            parentscount
        } else {
            parentscount.saturating_mul(rootcount)
        };
        self.add_ancestors(generation, slots);

        for parent in parents {
            self.register(generation + 1, parent, rootcount.max(1));
        }
    }

    // Second pass: fold a focus's next-generation multiplicity forward
    //
    // If the focus already shows up as a parent registered for generation+1
    // (collapse found one hop early), its parents are counted at generation+1
    // and registered for generation+2 with that multiplicity.
    pub fn project_ahead(&mut self, generation: u32, focus: &str, parents: &[ProfileId]) {
        let rootcount = self.multiplicity(generation + 1, focus);
        if rootcount == 0 {
            return;
        }

        self.add_ancestors(generation + 1, (parents.len() as u64).saturating_mul(rootcount));
        for parent in parents {
            self.register(generation + 2, parent, rootcount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<ProfileId> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_fresh_focus_counts_parents_once() {
        let mut ledger = ParentLedger::default();
        ledger.record_unit(0, "root", &ids(&["p1", "p2"]));

        assert_eq!(ledger.counts()[&0].count, 2);
        assert_eq!(ledger.counts()[&0].label, "parents");
        assert_eq!(ledger.multiplicity(1, "p1"), 1);
        assert_eq!(ledger.multiplicity(1, "p2"), 1);
    }

    #[test]
    fn test_collapsed_focus_multiplies_parents() {
        let mut ledger = ParentLedger::default();
        // Two siblings share parents p1/p2
        ledger.record_unit(0, "sib1", &ids(&["p1", "p2"]));
        ledger.record_unit(0, "sib2", &ids(&["p1", "p2"]));
        assert_eq!(ledger.multiplicity(1, "p1"), 2);

        // p1 is expanded once but stands for two pedigree slots
        ledger.record_unit(1, "p1", &ids(&["g1", "g2"]));
        assert_eq!(ledger.counts()[&1].count, 4);
        assert_eq!(ledger.counts()[&1].label, "grand parents");
        assert_eq!(ledger.multiplicity(2, "g1"), 2);
        assert_eq!(ledger.multiplicity(2, "g2"), 2);
    }

    #[test]
    fn test_count_is_sum_of_parents_times_multiplicity() {
        let mut ledger = ParentLedger::default();
        ledger.register(3, "a", 3);
        ledger.register(3, "b", 1);

        ledger.record_unit(3, "a", &ids(&["a1", "a2"])); // 2 * 3
        ledger.record_unit(3, "b", &ids(&["b1"])); // 1 * 1
        ledger.record_unit(3, "c", &ids(&["c1", "c2"])); // 2 * max(0, 1)

        assert_eq!(ledger.counts()[&3].count, 6 + 1 + 2);
    }

    #[test]
    fn test_focus_without_parents_still_opens_the_generation() {
        let mut ledger = ParentLedger::default();
        ledger.record_unit(2, "orphan", &[]);
        assert_eq!(ledger.counts()[&2].count, 0);
        assert_eq!(ledger.counts()[&2].label, "great grandparents");
    }

    #[test]
    fn test_huge_multiplicities_saturate() {
        let mut ledger = ParentLedger::default();
        ledger.register(70, "a", u64::MAX - 1);
        ledger.register(70, "a", 5);
        assert_eq!(ledger.multiplicity(70, "a"), u64::MAX);

        ledger.record_unit(70, "a", &ids(&["a1", "a2"]));
        ledger.record_unit(70, "b", &ids(&["b1"]));
        assert_eq!(ledger.counts()[&70].count, u64::MAX);
        assert_eq!(ledger.multiplicity(71, "a1"), u64::MAX);

        ledger.register(72, "a1", u64::MAX);
        ledger.project_ahead(71, "a1", &ids(&["x", "y"]));
        assert_eq!(ledger.counts()[&72].count, u64::MAX);
    }

    #[test]
    fn test_project_ahead_only_for_registered_foci() {
        let mut ledger = ParentLedger::default();
        ledger.project_ahead(1, "unknown", &ids(&["x", "y"]));
        assert!(ledger.counts().is_empty());

        ledger.register(2, "known", 2);
        ledger.project_ahead(1, "known", &ids(&["x", "y"]));
        assert_eq!(ledger.counts()[&2].count, 4);
        assert_eq!(ledger.multiplicity(3, "x"), 2);
        assert_eq!(ledger.multiplicity(3, "y"), 2);
    }
}
