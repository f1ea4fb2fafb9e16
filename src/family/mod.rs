// src/family/mod.rs
// =============================================================================
// Everything the crawler knows about the outside world.
//
// Submodules:
// - types: FamilyUnit, Relative and ProjectRef as returned by the API
// - provider: the collaborator traits and the cached reference set
// - http: reqwest-backed FamilyProvider
// - catalog: JSON-file backed ReferenceSource
// =============================================================================

mod catalog;
mod http;
mod provider;
mod types;

pub use catalog::{CatalogProject, JsonCatalog};
pub use http::HttpFamilyProvider;
pub use provider::{FamilyProvider, ReferenceProfiles, ReferenceSource};
pub use types::{FamilyUnit, ProfileId, ProjectRef, Relative, SubjectId};
