use crate::error::Result;
use crate::report::{OrgWeekUpdate, PrReport, RepoWeekUpdate, WeekWindow};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sled::{Db, Tree};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const PULLS_TREE: &str = "pulls";
const REPO_UPDATES_TREE: &str = "weekly_updates";
const ORG_UPDATES_TREE: &str = "weekly_org_updates";
pub const CHUNK_CACHE_TREE: &str = "compressed_chunks";

/// Durable store for PR reports and weekly updates
///
/// Opened once per command and closed when dropped.
pub struct Store {
    db: Db,
    pulls: Tree,
    repo_updates: Tree,
    org_updates: Tree,
}

impl Store {
    /// Create or open the store in `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;

        let db = sled::open(data_dir.join("deltascape.sled"))?;
        let pulls = db.open_tree(PULLS_TREE)?;
        let repo_updates = db.open_tree(REPO_UPDATES_TREE)?;
        let org_updates = db.open_tree(ORG_UPDATES_TREE)?;

        Ok(Self {
            db,
            pulls,
            repo_updates,
            org_updates,
        })
    }

    /// Handle to the underlying database, for trees owned by other components
    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Insert or replace the report for (owner, repo, number)
    pub fn upsert_pr_report(&self, report: &PrReport) -> Result<()> {
        let key = pull_key(&report.owner, &report.repo, report.number);
        self.pulls.insert(key, serde_json::to_vec(report)?)?;
        self.pulls.flush()?;

        debug!(owner = %report.owner, repo = %report.repo, number = report.number, "Stored PR report");
        Ok(())
    }

    /// Append a repo-week update; older updates for the same week are kept
    pub fn insert_repo_week_update(&self, update: &RepoWeekUpdate) -> Result<()> {
        let key = format!(
            "{}{}/{}",
            repo_prefix(&update.owner, &update.repo),
            sortable(&update.week_start_at),
            sortable(&update.created_at)
        );
        self.repo_updates.insert(key, serde_json::to_vec(update)?)?;
        self.repo_updates.flush()?;
        Ok(())
    }

    /// Append an org-week update
    pub fn insert_org_week_update(&self, update: &OrgWeekUpdate) -> Result<()> {
        let key = format!(
            "{}{}/{}",
            owner_prefix(&update.owner),
            sortable(&update.week_start_at),
            sortable(&update.created_at)
        );
        self.org_updates.insert(key, serde_json::to_vec(update)?)?;
        self.org_updates.flush()?;
        Ok(())
    }

    pub fn find_pr_report(&self, owner: &str, repo: &str, number: u64) -> Result<Option<PrReport>> {
        match self.pulls.get(pull_key(owner, repo, number))? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Reports of PRs merged inside `window`, oldest merge first
    pub fn find_pr_reports_in_window(
        &self,
        owner: &str,
        repo: &str,
        window: &WeekWindow,
    ) -> Result<Vec<PrReport>> {
        let mut reports: Vec<PrReport> = scan(&self.pulls, &repo_prefix(owner, repo))?
            .into_iter()
            .filter(|report: &PrReport| window.contains(&report.merged_at))
            .collect();

        reports.sort_by_key(|report| (report.merged_at, report.number));
        Ok(reports)
    }

    /// Repo-week updates of an owner whose week starts inside `window`
    ///
    /// When a repo has several updates for the same week only the newest is
    /// returned. Results are ordered by repository name.
    pub fn find_repo_week_updates_in_window(
        &self,
        owner: &str,
        window: &WeekWindow,
    ) -> Result<Vec<RepoWeekUpdate>> {
        let mut latest: HashMap<(String, DateTime<Utc>), RepoWeekUpdate> = HashMap::new();

        for update in scan::<RepoWeekUpdate>(&self.repo_updates, &owner_prefix(owner))? {
            if !window.contains(&update.week_start_at) {
                continue;
            }
            let key = (update.repo.to_lowercase(), update.week_start_at);
            match latest.get(&key) {
                Some(existing) if existing.created_at >= update.created_at => {}
                _ => {
                    latest.insert(key, update);
                }
            }
        }

        let mut updates: Vec<RepoWeekUpdate> = latest.into_values().collect();
        updates.sort_by(|a, b| (&a.repo, a.week_start_at).cmp(&(&b.repo, b.week_start_at)));
        Ok(updates)
    }

    /// Newest update of a repository, by week and then creation time
    pub fn latest_repo_week_update(&self, owner: &str, repo: &str) -> Result<Option<RepoWeekUpdate>> {
        last(&self.repo_updates, &repo_prefix(owner, repo))
    }

    /// Newest update of an organization, by week and then creation time
    pub fn latest_org_week_update(&self, owner: &str) -> Result<Option<OrgWeekUpdate>> {
        last(&self.org_updates, &owner_prefix(owner))
    }
}

// GitHub owner and repository names are case-insensitive
fn owner_prefix(owner: &str) -> String {
    format!("{}/", owner.to_lowercase())
}

fn repo_prefix(owner: &str, repo: &str) -> String {
    format!("{}{}/", owner_prefix(owner), repo.to_lowercase())
}

fn pull_key(owner: &str, repo: &str, number: u64) -> String {
    format!("{}{:010}", repo_prefix(owner, repo), number)
}

/// Timestamp that sorts lexicographically in time order
fn sortable(at: &DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%S%.9fZ").to_string()
}

fn scan<T: DeserializeOwned>(tree: &Tree, prefix: &str) -> Result<Vec<T>> {
    let mut items = Vec::new();
    for item in tree.scan_prefix(prefix) {
        let (_, value) = item?;
        items.push(serde_json::from_slice(&value)?);
    }
    Ok(items)
}

fn last<T: DeserializeOwned>(tree: &Tree, prefix: &str) -> Result<Option<T>> {
    match tree.scan_prefix(prefix).next_back() {
        Some(item) => {
            let (_, value) = item?;
            Ok(Some(serde_json::from_slice(&value)?))
        }
        None => Ok(None),
    }
}
