// src/family/catalog.rs
// =============================================================================
// A reference catalog loaded from a JSON file.
//
// The file lists the tracked projects and the profiles linked to each one:
//
//   {
//     "projects": [
//       { "id": 10985, "name": "Problem profiles", "profiles": ["6000000001"] },
//       { "id": 42,    "name": "Mayflower",        "profiles": ["6000000002"] }
//     ]
//   }
//
// One project id is special: the "problem" project. It is only reported when
// problem filtering is on, every other project only when project filtering is
// on.
// =============================================================================

use crate::error::{Result, ScoutError};
use crate::family::provider::ReferenceSource;
use crate::family::types::{ProfileId, ProjectRef};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogProject {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub profiles: Vec<ProfileId>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    projects: Vec<CatalogProject>,
}

#[derive(Debug, Clone)]
pub struct JsonCatalog {
    projects: Vec<CatalogProject>,
    problem_project: u64,
}

impl JsonCatalog {
    pub fn new(projects: Vec<CatalogProject>, problem_project: u64) -> Self {
        Self {
            projects,
            problem_project,
        }
    }

    /// A catalog with no projects; nothing will ever match by membership
    pub fn empty(problem_project: u64) -> Self {
        Self::new(Vec::new(), problem_project)
    }

    pub fn load(path: &Path, problem_project: u64) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ScoutError::Catalog(format!("{}: {}", path.display(), e)))?;
        let file: CatalogFile = serde_json::from_str(&raw)
            .map_err(|e| ScoutError::Catalog(format!("{}: {}", path.display(), e)))?;

        tracing::info!(
            path = %path.display(),
            projects = file.projects.len(),
            "Loaded project catalog"
        );
        Ok(Self::new(file.projects, problem_project))
    }

    fn wants(&self, project_id: u64, include_project: bool, include_problem: bool) -> bool {
        let is_problem = project_id == self.problem_project;
        (include_problem && is_problem) || (include_project && !is_problem)
    }
}

#[async_trait]
impl ReferenceSource for JsonCatalog {
    async fn load_reference_profiles(&self) -> Result<HashSet<ProfileId>> {
        Ok(self
            .projects
            .iter()
            .flat_map(|project| project.profiles.iter().cloned())
            .collect())
    }

    async fn projects_for(
        &self,
        id: &str,
        include_project: bool,
        include_problem: bool,
    ) -> Result<Vec<ProjectRef>> {
        Ok(self
            .projects
            .iter()
            .filter(|project| project.profiles.iter().any(|p| p == id))
            .filter(|project| self.wants(project.id, include_project, include_problem))
            .map(|project| ProjectRef {
                id: project.id,
                name: project.name.clone(),
            })
            .collect())
    }
}
