pub mod client;
pub mod pulls;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// GitHub repository coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    /// Repository owner/organization
    pub owner: String,
    /// Repository name
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parse `owner/repo` or any GitHub repository URL
    pub fn parse(input: &str) -> Option<Self> {
        if let Some(repo) = parse_github_url(input) {
            return Some(repo);
        }

        let (owner, repo) = input.trim().split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(Self::new(owner, repo.trim_end_matches(".git")))
    }

    /// Create a GitHub PR URL
    pub fn pr_url(&self, number: u64) -> String {
        format!("https://github.com/{}/{}/pull/{}", self.owner, self.repo, number)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Pull request author
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
}

/// Pull request metadata as returned by `GET /repos/{owner}/{repo}/pulls/{number}`
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub user: Option<GitHubUser>,
    pub html_url: String,
    pub diff_url: String,
    pub comments_url: String,
    pub merged_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Entry of the pull request listing
#[derive(Debug, Clone, Deserialize)]
pub struct PullListItem {
    pub number: u64,
    pub merged_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// One page of closed pull requests, most recently updated first
#[derive(Debug, Clone, Default)]
pub struct PullPage {
    pub items: Vec<PullListItem>,
    pub has_next: bool,
}

/// Where pull request data comes from
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    async fn fetch_pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest>;

    /// Download the raw diff behind a PR's `diff_url`
    async fn fetch_diff_text(&self, url: &str) -> Result<String>;

    /// Page `page` (1-based) of closed PRs sorted by update time, newest first
    async fn list_pulls_page(&self, owner: &str, repo: &str, page: u32) -> Result<PullPage>;
}

/// Parse GitHub repository information from a remote URL
pub fn parse_github_url(url: &str) -> Option<RepoRef> {
    // Handle different GitHub URL formats:
    // - https://github.com/owner/repo(.git)
    // - git@github.com:owner/repo.git
    // - git://github.com/owner/repo.git
    let url = url.trim();

    let patterns = [
        r"^https://github\.com/([^/]+)/([^/]+?)(?:\.git)?/?$",
        r"^https://github\.com/([^/]+)/([^/]+?)/",
        r"^git@github\.com:([^/]+)/([^/]+?)(?:\.git)?$",
        r"^git://github\.com/([^/]+)/([^/]+?)(?:\.git)?$",
    ];

    for pattern in patterns {
        if let Some(captures) = Regex::new(pattern).ok()?.captures(url) {
            return Some(RepoRef::new(
                captures.get(1)?.as_str(),
                captures.get(2)?.as_str(),
            ));
        }
    }

    None
}

/// Whether a `Link` response header advertises another page
pub fn has_next_page(link_header: &str) -> bool {
    Regex::new(r#"<[^>]+>;\s*rel="next""#)
        .map(|re| re.is_match(link_header))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_github_url_https() {
        let repo = parse_github_url("https://github.com/rust-lang/rust.git").unwrap();
        assert_eq!(repo, RepoRef::new("rust-lang", "rust"));

        // Without .git
        let repo = parse_github_url("https://github.com/rust-lang/rust").unwrap();
        assert_eq!(repo, RepoRef::new("rust-lang", "rust"));

        // Deep link into the repository
        let repo = parse_github_url("https://github.com/tokio-rs/tokio/pull/1234").unwrap();
        assert_eq!(repo, RepoRef::new("tokio-rs", "tokio"));
    }

    #[test]
    fn test_parse_github_url_keeps_dots_in_name() {
        let repo = parse_github_url("https://github.com/vercel/next.js").unwrap();
        assert_eq!(repo.repo, "next.js");
    }

    #[test]
    fn test_parse_github_url_ssh() {
        let repo = parse_github_url("git@github.com:rust-lang/rust.git").unwrap();
        assert_eq!(repo, RepoRef::new("rust-lang", "rust"));
    }

    #[test]
    fn test_parse_github_url_git_protocol() {
        let repo = parse_github_url("git://github.com/rust-lang/rust.git").unwrap();
        assert_eq!(repo, RepoRef::new("rust-lang", "rust"));
    }

    #[test]
    fn test_parse_github_url_invalid() {
        assert!(parse_github_url("https://gitlab.com/owner/repo").is_none());
        assert!(parse_github_url("not a url").is_none());
        assert!(parse_github_url("").is_none());
    }

    #[test]
    fn test_repo_ref_parse_short_form() {
        assert_eq!(RepoRef::parse("acme/widgets"), Some(RepoRef::new("acme", "widgets")));
        assert_eq!(
            RepoRef::parse("git@github.com:acme/widgets.git"),
            Some(RepoRef::new("acme", "widgets"))
        );
        assert!(RepoRef::parse("acme").is_none());
        assert!(RepoRef::parse("/widgets").is_none());
        assert!(RepoRef::parse("a/b/c").is_none());
    }

    #[test]
    fn test_repo_ref_urls() {
        let repo = RepoRef::new("owner", "repo");
        assert_eq!(repo.pr_url(123), "https://github.com/owner/repo/pull/123");
        assert_eq!(repo.to_string(), "owner/repo");
    }

    #[test]
    fn test_has_next_page() {
        let link = r#"<https://api.github.com/repositories/1/pulls?page=2>; rel="next", <https://api.github.com/repositories/1/pulls?page=9>; rel="last""#;
        assert!(has_next_page(link));

        let last = r#"<https://api.github.com/repositories/1/pulls?page=8>; rel="prev", <https://api.github.com/repositories/1/pulls?page=1>; rel="first""#;
        assert!(!has_next_page(last));
        assert!(!has_next_page(""));
    }

    #[test]
    fn test_pull_request_deserialization() {
        let json = r#"{
            "number": 42,
            "title": "Add digest",
            "body": null,
            "user": {"login": "octocat", "avatar_url": "https://avatars.example/u/1", "html_url": "https://github.com/octocat"},
            "html_url": "https://github.com/acme/widgets/pull/42",
            "diff_url": "https://github.com/acme/widgets/pull/42.diff",
            "comments_url": "https://api.github.com/repos/acme/widgets/issues/42/comments",
            "merged_at": "2024-05-08T12:00:00Z",
            "updated_at": "2024-05-08T12:05:00Z",
            "state": "closed"
        }"#;

        let pull: PullRequest = serde_json::from_str(json).unwrap();
        assert_eq!(pull.number, 42);
        assert!(pull.body.is_none());
        assert_eq!(pull.user.unwrap().login, "octocat");
        assert!(pull.merged_at.is_some());
    }
}
