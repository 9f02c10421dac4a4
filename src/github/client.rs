use crate::error::{DeltascapeError, Result};
use crate::github::{has_next_page, PullListItem, PullPage, PullRequest, PullRequestSource};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, LINK, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;

const GITHUB_API_URL: &str = "https://api.github.com";
const GITHUB_JSON: &str = "application/vnd.github+json";
const PAGE_SIZE: u32 = 10;

/// GitHub REST API client
pub struct GitHubClient {
    client: Client,
    token: Option<String>,
    api_url: String,
}

impl GitHubClient {
    /// Create a new GitHub client; a token raises rate limits and unlocks private repos
    pub fn new(token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            token,
            api_url: GITHUB_API_URL.to_string(),
        })
    }

    /// Point the client at a different API root (GitHub Enterprise)
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(USER_AGENT, concat!("deltascape/", env!("CARGO_PKG_VERSION")));

        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(request: RequestBuilder, url: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| DeltascapeError::fetch(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DeltascapeError::fetch(format!(
                "GET {} failed with status {}: {}",
                url, status, error_text
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    async fn fetch_pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest> {
        let url = format!("{}/repos/{}/{}/pulls/{}", self.api_url, owner, repo, number);
        debug!(url = %url, "Fetching pull request");

        let response = Self::send(self.get(&url).header(ACCEPT, GITHUB_JSON), &url).await?;
        response
            .json()
            .await
            .map_err(|e| DeltascapeError::fetch(format!("Unreadable pull request from {}: {}", url, e)))
    }

    async fn fetch_diff_text(&self, url: &str) -> Result<String> {
        debug!(url = %url, "Fetching diff");

        let response = Self::send(self.get(url), url).await?;
        response
            .text()
            .await
            .map_err(|e| DeltascapeError::fetch(format!("Unreadable diff from {}: {}", url, e)))
    }

    async fn list_pulls_page(&self, owner: &str, repo: &str, page: u32) -> Result<PullPage> {
        let url = format!(
            "{}/repos/{}/{}/pulls?state=closed&sort=updated&direction=desc&per_page={}&page={}",
            self.api_url, owner, repo, PAGE_SIZE, page
        );
        debug!(url = %url, "Listing pull requests");

        let response = Self::send(self.get(&url).header(ACCEPT, GITHUB_JSON), &url).await?;
        let has_next = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .map(has_next_page)
            .unwrap_or(false);
        let items: Vec<PullListItem> = response
            .json()
            .await
            .map_err(|e| DeltascapeError::fetch(format!("Unreadable pull listing from {}: {}", url, e)))?;

        Ok(PullPage { items, has_next })
    }
}
