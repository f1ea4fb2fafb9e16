// src/crawl/worker.rs
// =============================================================================
// The batch worker: expands up to `batch_size` profiles with one provider call.
//
// For every family unit that comes back:
// 1. look for matches among the unit's relatives
// 2. count the unit's parents in the ancestor ledger
// 3. queue the parents for the next generation, unless the unit matched
//
// and, once the whole batch is in, fold multiplicities one generation ahead.
//
// The provider call is the only await that touches the network. All session
// updates for a unit happen inside one short lock.
// =============================================================================

use crate::crawl::CrawlContext;
use crate::family::{FamilyUnit, ProfileId, ProjectRef, Relative};
use crate::session::{CrawlOptions, MatchRecord, Submission, MASTER_PROFILE};
use tracing::{debug, warn};

/// How a batch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every unit was handled
    Processed { units: usize, matches: usize },
    /// The session stopped running before or during the batch
    Cancelled,
    /// The provider failed; the batch's profiles are dropped from this wave
    Dropped,
    /// The credential was rejected and the session has been stopped
    CredentialRejected,
}

pub(crate) async fn run_batch(ctx: &CrawlContext, batch: Vec<ProfileId>) -> BatchOutcome {
    let session = &ctx.session;
    let subject = session.subject();

    if !session.is_running() {
        return BatchOutcome::Cancelled;
    }

    let Some(credential) = ctx.credentials.get(subject) else {
        warn!(subject, "No credential stored for subject");
        reject_credential(ctx);
        return BatchOutcome::CredentialRejected;
    };

    let units = match ctx.provider.fetch_family_group(&batch, &credential).await {
        Ok(units) => units,
        Err(e) if e.is_fatal() => {
            warn!(subject, "Provider rejected the access token, stopping crawl");
            reject_credential(ctx);
            return BatchOutcome::CredentialRejected;
        }
        Err(e) => {
            warn!(subject, batch = batch.len(), error = %e, "Dropping batch");
            return BatchOutcome::Dropped;
        }
    };

    let generation = session.generation();
    let options = session.options();
    let mut matches = 0;
    let mut rematches = 0;

    for unit in &units {
        // Results that arrive after a stop are thrown away
        if !session.is_running() {
            debug!(subject, "Session stopped mid-batch");
            return BatchOutcome::Cancelled;
        }

        let candidates = find_matches(ctx, unit, options).await;
        let unit_matched = !candidates.is_empty();
        matches += candidates.len();

        session.with(|s| {
            for candidate in candidates {
                if s.submit_match(candidate) == Submission::Exists {
                    rematches += 1;
                }
            }

            if options.complete {
                if let Some(focus) = &unit.focus {
                    s.ledger_mut().record_unit(generation, focus, &unit.parents);
                }
            }

            s.add_processed(unit.relatives.len());

            // A match closes this branch of the tree
            if !unit_matched {
                for parent in &unit.parents {
                    s.enqueue(parent.clone());
                }
            }
        });
    }

    // No second pass on the first generation
    if options.complete && generation > 0 {
        session.with(|s| {
            for unit in &units {
                if let Some(focus) = &unit.focus {
                    s.ledger_mut().project_ahead(generation, focus, &unit.parents);
                }
            }
        });
    }

    debug!(
        subject,
        generation,
        units = units.len(),
        matches,
        rematches,
        "Batch processed"
    );

    BatchOutcome::Processed {
        units: units.len(),
        matches,
    }
}

// Ends this session after an auth failure. When the subject has already been
// restarted, the newer session and its fresh credential are kept.
fn reject_credential(ctx: &CrawlContext) {
    let subject = ctx.session.subject();
    if ctx.store.stop_session(&ctx.session) {
        ctx.credentials.clear(subject);
    } else {
        debug!(subject, "Session was replaced, keeping the new credential");
    }
}

async fn find_matches(
    ctx: &CrawlContext,
    unit: &FamilyUnit,
    options: &CrawlOptions,
) -> Vec<MatchRecord> {
    let mut found = Vec::new();
    for relative in &unit.relatives {
        if let Some(candidate) = classify(ctx, relative, options).await {
            found.push(candidate);
        }
    }
    found
}

// Decides whether a relative is a match, first rule wins:
// reference-set member with projects, master profile, problem message
async fn classify(
    ctx: &CrawlContext,
    relative: &Relative,
    options: &CrawlOptions,
) -> Option<MatchRecord> {
    if options.wants_projects() && ctx.reference_set.contains(&relative.id) {
        let projects = match ctx
            .references
            .projects_for(&relative.id, options.project, options.problem)
            .await
        {
            Ok(projects) => projects,
            Err(e) => {
                warn!(profile = %relative.id, error = %e, "Project lookup failed");
                Vec::new()
            }
        };

        if projects.is_empty() {
            return None;
        }
        return Some(match_record(relative, None, projects));
    }

    if options.master && relative.master {
        return Some(match_record(relative, Some(MASTER_PROFILE.to_string()), Vec::new()));
    }

    if options.problem {
        if let Some(message) = relative.message.as_deref().filter(|m| !m.is_empty()) {
            return Some(match_record(relative, Some(message.to_string()), Vec::new()));
        }
    }

    None
}

fn match_record(
    relative: &Relative,
    message: Option<String>,
    projects: Vec<ProjectRef>,
) -> MatchRecord {
    MatchRecord {
        id: relative.id.clone(),
        relation: relative.relation.clone(),
        name: relative.name.clone(),
        message,
        projects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::testing::{context, relative, FakeTree};
    use crate::family::CatalogProject;
    use std::sync::Arc;
    use std::time::Duration;

    fn catalog() -> Vec<CatalogProject> {
        vec![
            CatalogProject {
                id: 42,
                name: "Mayflower".to_string(),
                profiles: vec!["pilgrim".to_string()],
            },
            CatalogProject {
                id: 10985,
                name: "Problem profiles".to_string(),
                profiles: vec!["trouble".to_string()],
            },
        ]
    }

    #[tokio::test]
    async fn test_project_match_closes_branch() {
        let tree = FakeTree::new().unit(
            "me",
            &["dad", "mom"],
            vec![relative("dad", "father"), relative("pilgrim", "great uncle")],
        );
        let ctx = context(tree, catalog(), CrawlOptions::default()).await;
        ctx.session.with(|s| s.take_wave());

        let outcome = run_batch(&ctx, vec!["me".to_string()]).await;
        assert_eq!(outcome, BatchOutcome::Processed { units: 1, matches: 1 });

        ctx.session.with(|s| {
            assert_eq!(s.matches().len(), 1);
            assert_eq!(s.matches()[0].id, "pilgrim");
            assert_eq!(s.matches()[0].message, None);
            assert_eq!(s.matches()[0].projects[0].name, "Mayflower");
            assert!(s.frontier().is_empty());
        });
        assert_eq!(ctx.session.status().processed, 2);
    }

    #[tokio::test]
    async fn test_reference_member_without_projects_is_not_a_match() {
        // "trouble" is only in the problem project, and problem filtering is off
        let mut trouble = relative("trouble", "grandmother");
        trouble.master = true;
        let tree = FakeTree::new().unit("me", &["dad", "mom"], vec![trouble]);
        let options = CrawlOptions {
            master: true,
            ..CrawlOptions::default()
        };
        let ctx = context(tree, catalog(), options).await;
        ctx.session.with(|s| s.take_wave());

        let outcome = run_batch(&ctx, vec!["me".to_string()]).await;
        assert_eq!(outcome, BatchOutcome::Processed { units: 1, matches: 0 });
        ctx.session.with(|s| {
            assert!(s.matches().is_empty());
            assert_eq!(s.frontier(), ["dad".to_string(), "mom".to_string()]);
        });
    }

    #[tokio::test]
    async fn test_master_and_problem_matches() {
        let mut master = relative("m1", "grandfather");
        master.master = true;
        let mut flagged = relative("f1", "grandmother");
        flagged.message = Some("Possible duplicate".to_string());
        let mut blank = relative("b1", "aunt");
        blank.message = Some(String::new());

        let tree = FakeTree::new().unit("me", &["dad"], vec![master, flagged, blank]);
        let options = CrawlOptions {
            master: true,
            problem: true,
            project: false,
            ..CrawlOptions::default()
        };
        let ctx = context(tree, Vec::new(), options).await;

        run_batch(&ctx, vec!["me".to_string()]).await;
        let matches = ctx.session.with(|s| s.matches().to_vec());
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].message.as_deref(), Some(MASTER_PROFILE));
        assert_eq!(matches[1].message.as_deref(), Some("Possible duplicate"));
    }

    #[tokio::test]
    async fn test_auth_error_stops_session_and_clears_credential() {
        let tree = FakeTree::new().unit("me", &["dad"], Vec::new()).reject_credentials();
        let ctx = context(tree, Vec::new(), CrawlOptions::default()).await;

        let outcome = run_batch(&ctx, vec!["me".to_string()]).await;
        assert_eq!(outcome, BatchOutcome::CredentialRejected);
        assert!(!ctx.session.is_running());
        assert!(ctx.store.get("me").is_none());
        assert!(ctx.credentials.get("me").is_none());
        assert_eq!(ctx.session.status().processed, 0);
    }

    #[tokio::test]
    async fn test_auth_error_from_replaced_session_keeps_the_new_one() {
        let tree = FakeTree::new()
            .with_delay(Duration::from_millis(50))
            .unit("me", &["dad"], Vec::new())
            .reject_credentials();
        let ctx = context(tree, Vec::new(), CrawlOptions::default()).await;

        // The subject restarts with a fresh token while the old batch is in flight
        let restart = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let fresh = ctx.store.start("me", CrawlOptions::default());
            ctx.credentials.set("me", "fresh-token");
            fresh
        };
        let (outcome, fresh) = tokio::join!(run_batch(&ctx, vec!["me".to_string()]), restart);

        assert_eq!(outcome, BatchOutcome::CredentialRejected);
        assert!(!ctx.session.is_running());
        assert!(fresh.is_running());
        assert!(Arc::ptr_eq(&ctx.store.get("me").unwrap(), &fresh));
        assert_eq!(ctx.credentials.get("me").as_deref(), Some("fresh-token"));
    }

    #[tokio::test]
    async fn test_provider_failure_drops_batch() {
        let tree = FakeTree::new().unit("me", &["dad"], Vec::new()).unavailable("me");
        let ctx = context(tree, Vec::new(), CrawlOptions::default()).await;
        ctx.session.with(|s| s.take_wave());

        let outcome = run_batch(&ctx, vec!["me".to_string()]).await;
        assert_eq!(outcome, BatchOutcome::Dropped);
        assert!(ctx.session.is_running());
        ctx.session.with(|s| assert!(s.frontier().is_empty()));
    }

    #[tokio::test]
    async fn test_stopped_session_has_no_side_effects() {
        let tree = FakeTree::new().unit("me", &["dad"], vec![relative("dad", "father")]);
        let ctx = context(tree, Vec::new(), CrawlOptions::default()).await;
        ctx.store.stop("me");

        let outcome = run_batch(&ctx, vec!["me".to_string()]).await;
        assert_eq!(outcome, BatchOutcome::Cancelled);
        assert_eq!(ctx.session.status().processed, 0);
        assert_eq!(ctx.provider_calls(), 0);
    }

    #[tokio::test]
    async fn test_parent_counts_recorded_when_complete() {
        let tree = FakeTree::new()
            .unit("sib1", &["dad", "mom"], Vec::new())
            .unit("sib2", &["dad", "mom"], Vec::new());
        let ctx = context(tree, Vec::new(), CrawlOptions::default()).await;
        ctx.session.with(|s| s.take_wave());

        run_batch(&ctx, vec!["sib1".to_string(), "sib2".to_string()]).await;
        ctx.session.with(|s| {
            assert_eq!(s.ledger().counts()[&0].count, 4);
            assert_eq!(s.ledger().multiplicity(1, "dad"), 2);
            // Shared parents are queued once
            assert_eq!(s.frontier().len(), 2);
        });

        let options = CrawlOptions {
            complete: false,
            ..CrawlOptions::default()
        };
        let tree = FakeTree::new().unit("me", &["dad", "mom"], Vec::new());
        let ctx = context(tree, Vec::new(), options).await;
        run_batch(&ctx, vec!["me".to_string()]).await;
        ctx.session.with(|s| assert!(s.ledger().counts().is_empty()));
    }
}
