// src/cli.rs
// =============================================================================
// Command-line interface, built with clap's derive API.
//
// Deployment values (API url, access token, catalog path) can also come from
// environment variables so they stay out of shell history.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use lineage_scout::config::ScoutConfig;
use lineage_scout::session::CrawlOptions;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "lineage-scout",
    version = "0.1.0",
    about = "Crawl a family tree looking for project members and flagged profiles",
    long_about = "lineage-scout walks a family tree breadth first, one generation at a time. \
                  Relatives that belong to a tracked project, are master profiles, or carry a \
                  problem message are reported as matches, and ancestors are counted per generation."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl the tree of one subject and report what was found
    ///
    /// Example: lineage-scout crawl 6000000012345 --master --limit 5
    Crawl(CrawlArgs),
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Profile id of the subject whose tree is crawled
    pub subject: String,

    /// Start the crawl at this profile instead of the subject
    #[arg(long)]
    pub root: Option<String>,

    /// Access token passed to the relationship API
    #[arg(long, env = "LINEAGE_ACCESS_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Base url of the relationship API
    #[arg(long, env = "LINEAGE_API_URL")]
    pub api_url: String,

    /// JSON file listing tracked projects and their profiles
    #[arg(long, env = "LINEAGE_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Report master profiles
    #[arg(long)]
    pub master: bool,

    /// Report profiles with a problem message and members of the problem project
    #[arg(long)]
    pub problem: bool,

    /// Do not report members of regular projects
    #[arg(long)]
    pub no_project: bool,

    /// Skip ancestor counting
    #[arg(long)]
    pub no_complete: bool,

    /// Last generation to expand (0 = the root's parents only)
    #[arg(long)]
    pub limit: Option<u32>,

    /// Output results in JSON format instead of a table
    #[arg(long)]
    pub json: bool,

    /// Number of provider requests in flight at once
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// Profiles per provider request
    #[arg(long, default_value_t = 10)]
    pub batch_size: usize,

    /// Provider request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Id of the project that holds problem profiles
    #[arg(long, default_value_t = lineage_scout::config::DEFAULT_PROBLEM_PROJECT)]
    pub problem_project: u64,
}

impl CrawlArgs {
    pub fn options(&self) -> CrawlOptions {
        CrawlOptions {
            root_profile: self.root.clone(),
            master: self.master,
            problem: self.problem,
            project: !self.no_project,
            complete: !self.no_complete,
            generation_limit: self.limit,
        }
    }

    pub fn config(&self) -> ScoutConfig {
        ScoutConfig {
            worker_slots: self.workers,
            batch_size: self.batch_size,
            request_timeout: Duration::from_secs(self.timeout),
            problem_project: self.problem_project,
        }
    }
}
