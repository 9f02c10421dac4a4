use crate::github::RepoRef;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "deltascape")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Summarize merged pull requests and roll them up into weekly updates",
    long_about = "deltascape compresses the diffs of merged GitHub pull requests with Claude, \
                  stores a short report per pull request, and rolls those reports up into \
                  weekly updates for a repository or a whole organization."
)]
pub struct Cli {
    /// Path to config file (default: ~/.config/deltascape/config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Which Monday-to-Monday week to cover (0 = the current week)
    #[arg(long, value_name = "N", default_value_t = 1, global = true)]
    pub weeks_ago: u32,

    /// Disable the chunk compression cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the pull requests merged during the week
    LastWeekPulls {
        /// owner/repo or a GitHub repository URL
        #[arg(value_parser = parse_repo)]
        repo: RepoRef,
    },

    /// Summarize and store every pull request merged during the week
    StorePrs {
        #[arg(value_parser = parse_repo)]
        repo: RepoRef,
    },

    /// Roll the week's stored pull request reports up into a repository update
    StoreRepoUpdate {
        #[arg(value_parser = parse_repo)]
        repo: RepoRef,
    },

    /// Roll the week's repository updates up into an organization update
    StoreOrgUpdate {
        /// Organization or user that owns the repositories
        owner: String,
    },

    /// Summarize a single merged pull request
    PrReport {
        #[arg(value_parser = parse_repo)]
        repo: RepoRef,

        /// Pull request number
        number: u64,

        /// Also store the report
        #[arg(long)]
        store: bool,
    },

    /// Show the latest stored weekly update
    Show {
        owner: String,

        /// Show a repository update instead of the organization update
        #[arg(long)]
        repo: Option<String>,

        /// Show the stored report of this pull request of `--repo`
        #[arg(long, requires = "repo")]
        pr: Option<u64>,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Config,

    /// Clear the cache
    ClearCache,

    /// Show cache statistics
    CacheStats,
}

impl Cli {
    /// Log filter used when RUST_LOG is not set
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn parse_repo(input: &str) -> Result<RepoRef, String> {
    RepoRef::parse(input)
        .ok_or_else(|| format!("'{}' is not owner/repo or a GitHub repository URL", input))
}
