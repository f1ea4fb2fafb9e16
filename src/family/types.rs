// src/family/types.rs
// =============================================================================
// Data returned by the relationship provider.
//
// One FamilyUnit is produced per expanded profile: the profile itself (the
// "focus"), the ids of its parents, and the relatives of its family branch
// with the metadata the matcher looks at (relation, name, master flag and any
// message/problem marker).
// =============================================================================

use serde::{Deserialize, Serialize};

/// Profile identifiers are opaque strings as handed out by the provider
pub type ProfileId = String;

/// The identifier of the user whose tree is being crawled
pub type SubjectId = String;

/// A relative listed in a family unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relative {
    pub id: ProfileId,
    /// Relation to the subject, e.g. "great grandfather" or "aunt"
    pub relation: String,
    #[serde(default)]
    pub name: String,
    /// Set when the profile is a curator-confirmed master profile
    #[serde(default)]
    pub master: bool,
    /// Problem marker attached to the profile, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Everything the crawler learns from expanding one profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyUnit {
    /// The expanded profile. Units without one are not counted as ancestors.
    #[serde(default)]
    pub focus: Option<ProfileId>,
    #[serde(default)]
    pub parents: Vec<ProfileId>,
    #[serde(default)]
    pub relatives: Vec<Relative>,
}

/// A project a reference profile belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: u64,
    pub name: String,
}
