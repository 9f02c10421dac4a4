use crate::ai::cache::{CachedSummarizer, ChunkCache};
use crate::ai::claude::ClaudeClient;
use crate::ai::compress::DiffCompressor;
use crate::ai::prompt::{
    org_week_changes, pr_summary_prompt, repo_week_changes, DIGEST_SYSTEM, ORG_WEEK_SYSTEM,
    PR_SUMMARY_SYSTEM, REPO_WEEK_SYSTEM,
};
use crate::ai::{CompletionOptions, Summarizer};
use crate::config::Config;
use crate::error::{DeltascapeError, Result};
use crate::github::client::GitHubClient;
use crate::github::pulls::fetch_week_pulls;
use crate::github::{PullRequestSource, RepoRef};
use crate::report::{OrgWeekUpdate, PrReport, RepoWeekUpdate, WeekWindow};
use crate::storage::Store;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-PR results of storing a week of pull requests
#[derive(Debug, Default)]
pub struct StoreOutcome {
    pub stored: Vec<u64>,
    /// PRs that turned out not to be merged
    pub skipped: Vec<u64>,
    pub failed: Vec<(u64, String)>,
}

impl StoreOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Orchestrator for coordinating the report and rollup pipelines
///
/// Persistence is passed into each operation so the caller controls how long
/// the store stays open.
pub struct Orchestrator {
    summarizer: Arc<dyn Summarizer>,
    github: Arc<dyn PullRequestSource>,
    compressor: DiffCompressor,
    narrative: CompletionOptions,
}

impl Orchestrator {
    pub fn new(
        summarizer: Arc<dyn Summarizer>,
        github: Arc<dyn PullRequestSource>,
        compressor: DiffCompressor,
        narrative: CompletionOptions,
    ) -> Self {
        Self {
            summarizer,
            github,
            compressor,
            narrative,
        }
    }

    /// Wire up the Claude and GitHub clients described by `config`
    ///
    /// With a cache, deterministic chunk compressions are reused across runs.
    pub fn from_config(config: &Config, cache: Option<ChunkCache>) -> Result<Self> {
        let mut claude = ClaudeClient::new(config.api_key()?)?.with_model(config.model.clone());
        if let Some(ref api_url) = config.claude_api_url {
            claude = claude.with_api_url(api_url.clone());
        }
        let summarizer: Arc<dyn Summarizer> = match cache {
            Some(cache) => Arc::new(CachedSummarizer::new(claude, cache, config.model.clone())),
            None => Arc::new(claude),
        };

        Ok(Self::new(
            summarizer,
            Arc::new(github_client(config)?),
            DiffCompressor::new(config.compression()),
            config.narrative(),
        ))
    }

    /// Numbers of the PRs of `repo` merged inside `window`
    pub async fn last_week_pulls(&self, repo: &RepoRef, window: &WeekWindow) -> Result<Vec<u64>> {
        fetch_week_pulls(self.github.as_ref(), repo, window).await
    }

    /// Fetch, compress and summarize one merged pull request
    ///
    /// Fails with `NotMerged` before any model call when the PR has no merge
    /// timestamp.
    pub async fn build_pr_report(&self, repo: &RepoRef, number: u64) -> Result<PrReport> {
        let pull = self
            .github
            .fetch_pull_request(&repo.owner, &repo.repo, number)
            .await?;
        if pull.number != number {
            return Err(DeltascapeError::fetch(format!(
                "Asked {} for pull request #{} but got #{}",
                repo, number, pull.number
            )));
        }
        debug!(repo = %repo, number, updated_at = %pull.updated_at, "Pull request fetched");

        let merged_at = pull.merged_at.ok_or_else(|| DeltascapeError::NotMerged {
            owner: repo.owner.clone(),
            repo: repo.repo.clone(),
            number,
        })?;

        let diff = self.github.fetch_diff_text(&pull.diff_url).await?;
        let compressed_diff = self.compressor.compress(self.summarizer.as_ref(), &diff).await?;
        debug!(
            repo = %repo,
            number,
            diff_chars = diff.len(),
            compressed_chars = compressed_diff.len(),
            "Diff compressed"
        );

        let prompt = pr_summary_prompt(&pull.title, pull.body.as_deref(), &compressed_diff);
        let summary = self.narrate(PR_SUMMARY_SYSTEM, &prompt).await?;

        let (author, author_avatar, author_html_url) = match pull.user {
            Some(user) => (Some(user.login), user.avatar_url, user.html_url),
            None => (None, None, None),
        };

        Ok(PrReport {
            owner: repo.owner.clone(),
            repo: repo.repo.clone(),
            number,
            html_url: pull.html_url,
            diff_url: pull.diff_url,
            title: pull.title,
            body: pull.body,
            author,
            author_avatar,
            author_html_url,
            comments_url: pull.comments_url,
            merged_at,
            summary,
            compressed_diff,
        })
    }

    /// Build a report and upsert it; nothing is written unless every stage succeeds
    pub async fn store_pr_report(&self, store: &Store, repo: &RepoRef, number: u64) -> Result<PrReport> {
        let report = self.build_pr_report(repo, number).await?;
        store.upsert_pr_report(&report)?;
        info!(repo = %repo, number, "Stored PR report");
        Ok(report)
    }

    /// Report every PR merged in `window`, one at a time
    ///
    /// A failing PR does not stop the others. `progress` receives
    /// `(done, total)` before the first PR and after each one.
    pub async fn store_week_prs<F>(
        &self,
        store: &Store,
        repo: &RepoRef,
        window: &WeekWindow,
        mut progress: F,
    ) -> Result<StoreOutcome>
    where
        F: FnMut(usize, usize),
    {
        let numbers = self.last_week_pulls(repo, window).await?;
        let total = numbers.len();
        let mut outcome = StoreOutcome::default();
        progress(0, total);

        for (done, number) in numbers.into_iter().enumerate() {
            match self.store_pr_report(store, repo, number).await {
                Ok(_) => outcome.stored.push(number),
                Err(e) if e.is_skippable() => {
                    warn!(repo = %repo, number, "Skipping unmerged pull request");
                    outcome.skipped.push(number);
                }
                Err(e) => {
                    warn!(repo = %repo, number, error = %e, "Failed to report pull request");
                    outcome.failed.push((number, e.to_string()));
                }
            }
            progress(done + 1, total);
        }

        Ok(outcome)
    }

    /// Roll the stored reports of `repo` for `window` up into one narrative
    pub async fn summarize_repo_week(
        &self,
        store: &Store,
        repo: &RepoRef,
        window: &WeekWindow,
    ) -> Result<RepoWeekUpdate> {
        let reports = store.find_pr_reports_in_window(&repo.owner, &repo.repo, window)?;
        if reports.is_empty() {
            return Err(DeltascapeError::NoActivity(format!(
                "{} in the week of {}",
                repo,
                window.start.format("%Y-%m-%d")
            )));
        }

        debug!(repo = %repo, reports = reports.len(), "Summarizing repository week");
        let update = self
            .narrate(REPO_WEEK_SYSTEM, &repo_week_changes(&reports))
            .await?;

        Ok(RepoWeekUpdate {
            owner: repo.owner.clone(),
            repo: repo.repo.clone(),
            week_start_at: window.start,
            created_at: Utc::now(),
            update,
        })
    }

    pub async fn store_repo_week_update(
        &self,
        store: &Store,
        repo: &RepoRef,
        window: &WeekWindow,
    ) -> Result<RepoWeekUpdate> {
        let update = self.summarize_repo_week(store, repo, window).await?;
        store.insert_repo_week_update(&update)?;
        info!(repo = %repo, week = %window.start.format("%Y-%m-%d"), "Stored repository week update");
        Ok(update)
    }

    /// Roll the repository updates of `owner` for `window` up into a narrative and a digest
    pub async fn summarize_org_week(
        &self,
        store: &Store,
        owner: &str,
        window: &WeekWindow,
    ) -> Result<OrgWeekUpdate> {
        let updates = store.find_repo_week_updates_in_window(owner, window)?;
        if updates.is_empty() {
            return Err(DeltascapeError::NoActivity(format!(
                "{} in the week of {}",
                owner,
                window.start.format("%Y-%m-%d")
            )));
        }

        debug!(owner, repos = updates.len(), "Summarizing organization week");
        let changes = org_week_changes(&updates);
        let update = self.narrate(ORG_WEEK_SYSTEM, &changes).await?;
        let short_update = self.narrate(DIGEST_SYSTEM, &changes).await?;

        Ok(OrgWeekUpdate {
            owner: owner.to_string(),
            week_start_at: window.start,
            created_at: Utc::now(),
            update,
            short_update,
        })
    }

    pub async fn store_org_week_update(
        &self,
        store: &Store,
        owner: &str,
        window: &WeekWindow,
    ) -> Result<OrgWeekUpdate> {
        let update = self.summarize_org_week(store, owner, window).await?;
        store.insert_org_week_update(&update)?;
        info!(owner, week = %window.start.format("%Y-%m-%d"), "Stored organization week update");
        Ok(update)
    }

    /// Narrative call that must produce text
    async fn narrate(&self, system: &str, user: &str) -> Result<String> {
        let text = self.summarizer.summarize(system, user, self.narrative).await?;
        if text.trim().is_empty() {
            return Err(DeltascapeError::summarization("model returned an empty narrative"));
        }
        Ok(text)
    }
}

/// GitHub client for `config`, honoring a custom API root
pub fn github_client(config: &Config) -> Result<GitHubClient> {
    let client = GitHubClient::new(config.github_token())?;
    Ok(match config.github_api_url {
        Some(ref api_url) => client.with_api_url(api_url.clone()),
        None => client,
    })
}
