// src/main.rs
// =============================================================================
// Entry point of the CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (RUST_LOG overrides the default filter)
// 3. Start the crawl and wait for it, or for Ctrl-C
// 4. Print matches, ancestor counts and the project tally
// 5. Exit with proper code (0 = finished or stopped, 1 = token rejected,
//    2 = error)
// =============================================================================

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, CrawlArgs};
use lineage_scout::crawl::{CrawlOutcome, Crawler, LogSink};
use lineage_scout::family::{HttpFamilyProvider, JsonCatalog, ReferenceProfiles, ReferenceSource};
use lineage_scout::session::{project_tally, GenerationCount, MatchRecord, ProjectTally};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lineage_scout=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl(args) => handle_crawl(&args).await,
    }
}

// Everything printed at the end of a run
#[derive(Serialize)]
struct Report {
    subject: String,
    outcome: CrawlOutcome,
    stage: String,
    processed: u64,
    matches: Vec<MatchRecord>,
    ancestors: BTreeMap<u32, GenerationCount>,
    projects: BTreeMap<u64, ProjectTally>,
}

async fn handle_crawl(args: &CrawlArgs) -> Result<i32> {
    let config = args.config();

    let catalog = match &args.catalog {
        Some(path) => JsonCatalog::load(path, config.problem_project)?,
        None => JsonCatalog::empty(config.problem_project),
    };
    let source: Arc<dyn ReferenceSource> = Arc::new(catalog);
    let provider = HttpFamilyProvider::new(&args.api_url, config.request_timeout)
        .context("Could not set up the relationship API client")?;

    let crawler = Crawler::new(
        Arc::new(provider),
        Arc::new(ReferenceProfiles::new(source)),
        Arc::new(LogSink),
        config,
    );

    let mut handle = crawler
        .start_crawl(&args.subject, &args.token, args.options())
        .await?;

    let outcome = tokio::select! {
        joined = &mut handle => joined.context("Crawl task failed")?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping crawl");
            // Read the results before the stop drops the session
            let report = report(&crawler, &args.subject, CrawlOutcome::Cancelled);
            crawler.stop_crawl(&args.subject);
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Crawl task did not shut down cleanly");
            }
            print_report(&report, args.json)?;
            return Ok(0);
        }
    };

    if outcome == CrawlOutcome::CredentialRejected {
        eprintln!("The access token was rejected, no results were kept");
        return Ok(1);
    }

    let report = report(&crawler, &args.subject, outcome);
    print_report(&report, args.json)?;

    Ok(0)
}

fn report(crawler: &Crawler, subject: &str, outcome: CrawlOutcome) -> Report {
    let status = crawler.status(subject);
    let matches = crawler.matches(subject);
    Report {
        subject: subject.to_string(),
        outcome,
        stage: status.stage,
        processed: status.processed,
        projects: project_tally(&matches),
        ancestors: crawler.ancestor_counts(subject),
        matches,
    }
}

fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_table(report);
    }
    Ok(())
}

fn print_table(report: &Report) {
    println!("{:<20} {:<28} {:<30} {:<30}", "PROFILE", "RELATION", "NAME", "NOTE");
    println!("{}", "=".repeat(108));

    for record in &report.matches {
        let note = match &record.message {
            Some(message) => message.clone(),
            None => record
                .projects
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        };
        println!(
            "{:<20} {:<28} {:<30} {:<30}",
            record.id,
            truncate(&record.relation, 27),
            truncate(&record.name, 29),
            note
        );
    }
    println!();

    if !report.ancestors.is_empty() {
        println!("Ancestors:");
        for count in report.ancestors.values() {
            println!("   {:<32} {}", count.label, count.count);
        }
        println!();
    }

    if !report.projects.is_empty() {
        println!("Projects:");
        for tally in report.projects.values() {
            println!("   {:<32} {}", tally.name, tally.count);
        }
        println!();
    }

    println!("Summary:");
    println!("   Outcome: {:?}", report.outcome);
    println!("   Reached: {}", report.stage);
    println!("   Relatives examined: {}", report.processed);
    println!("   Matches: {}", report.matches.len());
}

// Shortens a column value to `max` characters
fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        let head: String = value.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}
