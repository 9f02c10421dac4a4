mod ai;
mod cli;
mod config;
mod diff;
mod error;
mod github;
mod orchestrator;
mod report;
mod storage;
#[cfg(test)]
mod testing;

use ai::cache::ChunkCache;
use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use error::DeltascapeError;
use github::pulls::fetch_week_pulls;
use indicatif::{ProgressBar, ProgressStyle};
use orchestrator::{github_client, Orchestrator};
use report::WeekWindow;
use storage::Store;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level());

    match cli.command {
        Commands::Init { force } => return init_config(&cli, force),
        Commands::Config => {
            let config = load_config(&cli)?;
            println!("Current configuration:\n");
            println!("{}", toml::to_string_pretty(&config)?);
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(&cli)?;
    let window = WeekWindow::weeks_ago(Utc::now(), cli.weeks_ago)?;

    // The store is opened per command and released when `run` returns
    let data_dir = config.data_dir()?;
    let store = Store::open(&data_dir)
        .with_context(|| format!("Could not open data directory {}", data_dir.display()))?;

    run(&cli, &config, &store, &window).await
}

async fn run(cli: &Cli, config: &Config, store: &Store, window: &WeekWindow) -> anyhow::Result<()> {
    match cli.command {
        Commands::LastWeekPulls { ref repo } => {
            let github = github_client(config)?;
            let numbers = fetch_week_pulls(&github, repo, window).await?;

            println!(
                "{} pull requests merged in {} during the week of {}",
                numbers.len(),
                repo,
                window.start.format("%Y-%m-%d")
            );
            for number in numbers {
                println!("  #{} {}", number, repo.pr_url(number));
            }
        }
        Commands::StorePrs { ref repo } => {
            let orchestrator = orchestrator(config, store)?;

            let progress = ProgressBar::new(0);
            progress.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                    .progress_chars("=>-"),
            );
            progress.set_message(format!("Summarizing {}", repo));

            let outcome = orchestrator
                .store_week_prs(store, repo, window, |done, total| {
                    progress.set_length(total as u64);
                    progress.set_position(done as u64);
                })
                .await?;
            progress.finish_with_message("Done");

            println!(
                "\n✓ Stored {} · skipped {} unmerged · {} failed",
                outcome.stored.len(),
                outcome.skipped.len(),
                outcome.failed.len()
            );
            for (number, error) in &outcome.failed {
                println!("  ❌ #{}: {}", number, error);
            }
            if !outcome.is_success() {
                bail!("{} pull requests of {} could not be reported", outcome.failed.len(), repo);
            }
        }
        Commands::StoreRepoUpdate { ref repo } => {
            let update = orchestrator(config, store)?
                .store_repo_week_update(store, repo, window)
                .await?;
            println!("{}", update.to_markdown());
        }
        Commands::StoreOrgUpdate { ref owner } => {
            let update = orchestrator(config, store)?
                .store_org_week_update(store, owner, window)
                .await?;
            println!("{}", update.to_markdown());
        }
        Commands::PrReport { ref repo, number, store: persist } => {
            let orchestrator = orchestrator(config, store)?;
            let report = if persist {
                orchestrator.store_pr_report(store, repo, number).await?
            } else {
                orchestrator.build_pr_report(repo, number).await?
            };
            println!("{}", report.to_markdown());
        }
        Commands::Show { ref owner, ref repo, pr } => match (repo, pr) {
            (Some(repo), Some(number)) => match store.find_pr_report(owner, repo, number)? {
                Some(report) => println!("{}", report.to_markdown()),
                None => println!("No report stored for {}/{}#{}", owner, repo, number),
            },
            (Some(repo), None) => match store.latest_repo_week_update(owner, repo)? {
                Some(update) => println!("{}", update.to_markdown()),
                None => println!("No weekly update stored for {}/{}", owner, repo),
            },
            (None, _) => match store.latest_org_week_update(owner)? {
                Some(update) => println!("{}", update.to_markdown()),
                None => println!("No weekly update stored for {}", owner),
            },
        },
        Commands::ClearCache => {
            ChunkCache::open(store, config.cache_ttl_hours)?.clear()?;
            println!("✓ Cache cleared");
        }
        Commands::CacheStats => {
            let cache = ChunkCache::open(store, config.cache_ttl_hours)?;
            let removed = cache.cleanup_expired()?;
            let stats = cache.stats();

            println!("Data directory: {}", config.data_dir()?.display());
            println!("Total entries: {}", stats.total_entries);
            println!("Expired entries removed: {}", removed);
            println!("Database size: {}", stats.format_size());
        }
        Commands::Init { .. } | Commands::Config => {}
    }

    Ok(())
}

fn orchestrator(config: &Config, store: &Store) -> anyhow::Result<Orchestrator> {
    let cache = if config.cache_enabled {
        Some(ChunkCache::open(store, config.cache_ttl_hours)?)
    } else {
        None
    };

    match Orchestrator::from_config(config, cache) {
        Err(e @ DeltascapeError::MissingConfig(_)) => Err(anyhow::Error::new(e).context(
            "Set the ANTHROPIC_AUTH_TOKEN environment variable or add claude_api_key to the config file",
        )),
        result => Ok(result?),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load_or_create_default()?,
    };

    if cli.no_cache {
        config.cache_enabled = false;
    }

    Ok(config)
}

fn init_config(cli: &Cli, force: bool) -> anyhow::Result<()> {
    let config_path = match cli.config {
        Some(ref path) => path.clone(),
        None => Config::default_config_path()?,
    };

    if config_path.exists() && !force {
        bail!(
            "Config file already exists at: {} (use --force to overwrite)",
            config_path.display()
        );
    }

    Config::create_default_at(&config_path)?;
    println!("✓ Created config file at: {}", config_path.display());
    println!("\nTo authenticate with Claude, either:");
    println!("  1. Set the ANTHROPIC_AUTH_TOKEN environment variable");
    println!("  2. Add claude_api_key to the config file:");
    println!("     claude_api_key = \"sk-ant-YOUR_KEY_HERE\"");
    println!("\nSet GITHUB_TOKEN (or github_token) to read private repositories.");

    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
