// src/family/provider.rs
// =============================================================================
// The collaborators the crawler talks to, expressed as traits.
//
// - FamilyProvider: batch lookup of family units for a list of profiles
// - ReferenceSource: where the reference profile set and project lists live
// - ReferenceProfiles: lazy, process-wide cache of the reference set
//
// Keeping these behind traits lets the crawler run against the HTTP API in
// production and against in-memory trees in tests.
// =============================================================================

use crate::error::Result;
use crate::family::types::{FamilyUnit, ProfileId, ProjectRef};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Batch relationship lookup.
///
/// Implementations return `ScoutError::Auth` when the credential is rejected;
/// the worker treats that as the end of the run.
#[async_trait]
pub trait FamilyProvider: Send + Sync {
    async fn fetch_family_group(
        &self,
        ids: &[ProfileId],
        credential: &str,
    ) -> Result<Vec<FamilyUnit>>;
}

/// Source of the reference profile set and the projects those profiles are in
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    /// Every profile that belongs to at least one tracked project
    async fn load_reference_profiles(&self) -> Result<HashSet<ProfileId>>;

    /// Projects a profile belongs to, filtered by the kind of project requested
    async fn projects_for(
        &self,
        id: &str,
        include_project: bool,
        include_problem: bool,
    ) -> Result<Vec<ProjectRef>>;
}

/// Caches the reference set for the lifetime of the process.
///
/// The first `get` loads it from the source, later calls reuse the same
/// `Arc` until `refresh` is called.
pub struct ReferenceProfiles {
    source: Arc<dyn ReferenceSource>,
    cached: RwLock<Option<Arc<HashSet<ProfileId>>>>,
}

impl ReferenceProfiles {
    pub fn new(source: Arc<dyn ReferenceSource>) -> Self {
        Self {
            source,
            cached: RwLock::new(None),
        }
    }

    pub async fn get(&self) -> Result<Arc<HashSet<ProfileId>>> {
        if let Some(profiles) = self.cached.read().await.as_ref() {
            return Ok(profiles.clone());
        }

        let mut cached = self.cached.write().await;
        // Another caller may have filled it while we waited for the write lock
        if let Some(profiles) = cached.as_ref() {
            return Ok(profiles.clone());
        }

        tracing::info!("Building reference profile list");
        let profiles = Arc::new(self.source.load_reference_profiles().await?);
        *cached = Some(profiles.clone());
        Ok(profiles)
    }

    /// Drops the cached set and loads it again
    pub async fn refresh(&self) -> Result<Arc<HashSet<ProfileId>>> {
        let profiles = Arc::new(self.source.load_reference_profiles().await?);
        *self.cached.write().await = Some(profiles.clone());
        Ok(profiles)
    }

    pub async fn projects_for(
        &self,
        id: &str,
        include_project: bool,
        include_problem: bool,
    ) -> Result<Vec<ProjectRef>> {
        self.source
            .projects_for(id, include_project, include_problem)
            .await
    }
}
