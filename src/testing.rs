//! Deterministic doubles for the language model and GitHub.

use crate::ai::{CompletionOptions, Summarizer};
use crate::error::{DeltascapeError, Result};
use crate::github::{GitHubUser, PullListItem, PullPage, PullRequest, PullRequestSource};
use crate::report::{PrReport, RepoWeekUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Respond = Box<dyn Fn(&str, &str) -> Result<String> + Send + Sync>;
type Delay = Box<dyn Fn(&str) -> Duration + Send + Sync>;

/// One recorded summarization request
#[derive(Debug, Clone)]
pub struct Call {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Summarizer double with scripted answers, optional latency and concurrency tracking
pub struct FakeSummarizer {
    respond: Respond,
    delay: Delay,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeSummarizer {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str, &str) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            delay: Box::new(|_| Duration::ZERO),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Answers with the request text
    pub fn echo() -> Self {
        Self::new(|_, user| Ok(format!("echo: {}", user)))
    }

    /// Sleep for a duration derived from the request text before answering
    pub fn with_delay<D>(mut self, delay: D) -> Self
    where
        D: Fn(&str) -> Duration + Send + Sync + 'static,
    {
        self.delay = Box::new(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of requests observed in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
        self.peak.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(
        &self,
        system: &str,
        user: &str,
        options: CompletionOptions,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(Call {
            system: system.to_string(),
            user: user.to_string(),
            temperature: options.temperature,
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = (self.delay)(user);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.respond)(system, user)
    }
}

/// GitHub double backed by canned pull requests, diffs and listing pages
#[derive(Default)]
pub struct FakeGitHub {
    pulls: HashMap<u64, PullRequest>,
    diffs: HashMap<String, String>,
    pages: Vec<Vec<PullListItem>>,
    page_requests: AtomicUsize,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a PR and the diff served at its `diff_url`
    pub fn with_pull(mut self, pull: PullRequest, diff: &str) -> Self {
        self.diffs.insert(pull.diff_url.clone(), diff.to_string());
        self.with_metadata(pull)
    }

    /// Register a PR whose diff cannot be downloaded
    pub fn with_metadata(self, pull: PullRequest) -> Self {
        let number = pull.number;
        self.with_metadata_at(number, pull)
    }

    /// Serve `pull` when PR `number` is requested
    pub fn with_metadata_at(mut self, number: u64, pull: PullRequest) -> Self {
        self.pulls.insert(number, pull);
        self
    }

    pub fn with_pages(mut self, pages: Vec<Vec<PullListItem>>) -> Self {
        self.pages = pages;
        self
    }

    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PullRequestSource for FakeGitHub {
    async fn fetch_pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest> {
        self.pulls.get(&number).cloned().ok_or_else(|| {
            DeltascapeError::fetch(format!("GET /repos/{}/{}/pulls/{} failed with status 404", owner, repo, number))
        })
    }

    async fn fetch_diff_text(&self, url: &str) -> Result<String> {
        self.diffs
            .get(url)
            .cloned()
            .ok_or_else(|| DeltascapeError::fetch(format!("GET {} failed with status 404", url)))
    }

    async fn list_pulls_page(&self, _owner: &str, _repo: &str, page: u32) -> Result<PullPage> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);

        let index = page.saturating_sub(1) as usize;
        Ok(PullPage {
            items: self.pages.get(index).cloned().unwrap_or_default(),
            has_next: index + 1 < self.pages.len(),
        })
    }
}

pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// A merged pull request of acme/widgets
pub fn sample_pull(number: u64, merged_at: Option<&str>) -> PullRequest {
    PullRequest {
        number,
        title: format!("Change number {}", number),
        body: Some("Makes widgets better.".to_string()),
        user: Some(GitHubUser {
            login: "octocat".to_string(),
            avatar_url: Some("https://avatars.githubusercontent.com/u/583231".to_string()),
            html_url: Some("https://github.com/octocat".to_string()),
        }),
        html_url: format!("https://github.com/acme/widgets/pull/{}", number),
        diff_url: format!("https://github.com/acme/widgets/pull/{}.diff", number),
        comments_url: format!("https://api.github.com/repos/acme/widgets/issues/{}/comments", number),
        merged_at: merged_at.map(at),
        updated_at: at("2024-05-08T12:30:00Z"),
    }
}

/// A report for a PR merged on Wednesday 2024-05-08
pub fn sample_report(owner: &str, repo: &str, number: u64) -> PrReport {
    PrReport {
        owner: owner.to_string(),
        repo: repo.to_string(),
        number,
        html_url: format!("https://github.com/{}/{}/pull/{}", owner, repo, number),
        diff_url: format!("https://github.com/{}/{}/pull/{}.diff", owner, repo, number),
        title: format!("Change number {}", number),
        body: None,
        author: Some("octocat".to_string()),
        author_avatar: None,
        author_html_url: Some("https://github.com/octocat".to_string()),
        comments_url: format!("https://api.github.com/repos/{}/{}/issues/{}/comments", owner, repo, number),
        merged_at: at("2024-05-08T12:00:00Z"),
        summary: format!("Change {} makes things better.", number),
        compressed_diff: "Touches one file.".to_string(),
    }
}

/// A repo-week update for the week starting Monday 2024-05-06
pub fn sample_repo_update(owner: &str, repo: &str, update: &str) -> RepoWeekUpdate {
    RepoWeekUpdate {
        owner: owner.to_string(),
        repo: repo.to_string(),
        week_start_at: at("2024-05-06T00:00:00Z"),
        created_at: at("2024-05-13T08:00:00Z"),
        update: update.to_string(),
    }
}
