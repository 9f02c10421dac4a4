use crate::error::{DeltascapeError, Result};
use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Summarized pull request, keyed by (owner, repo, number)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrReport {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub html_url: String,
    pub diff_url: String,
    pub title: String,
    pub body: Option<String>,
    pub author: Option<String>,
    pub author_avatar: Option<String>,
    pub author_html_url: Option<String>,
    pub comments_url: String,
    pub merged_at: DateTime<Utc>,
    /// Narrative of what the PR changes
    pub summary: String,
    /// Concatenated chunk compressions of the diff
    pub compressed_diff: String,
}

impl PrReport {
    /// Format report as markdown
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "# {}/{}#{}: {}\n\n",
            self.owner, self.repo, self.number, self.title
        ));
        if let Some(ref author) = self.author {
            output.push_str(&format!("By @{} · ", author));
        }
        output.push_str(&format!(
            "merged {} · {}\n\n",
            self.merged_at.format("%Y-%m-%d %H:%M UTC"),
            self.html_url
        ));
        output.push_str("## Summary\n\n");
        output.push_str(&self.summary);
        output.push_str("\n\n## Compressed diff\n\n");
        output.push_str(&self.compressed_diff);
        output.push('\n');

        output
    }
}

/// One repository's narrative for one week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoWeekUpdate {
    pub owner: String,
    pub repo: String,
    pub week_start_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub update: String,
}

impl RepoWeekUpdate {
    pub fn to_markdown(&self) -> String {
        format!(
            "# {}/{}: week of {}\n\n{}\n\n*Generated at: {}*\n",
            self.owner,
            self.repo,
            self.week_start_at.format("%Y-%m-%d"),
            self.update,
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

/// One organization's narrative and digest for one week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgWeekUpdate {
    pub owner: String,
    pub week_start_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub update: String,
    /// 1-2 sentence digest of `update`'s inputs
    pub short_update: String,
}

impl OrgWeekUpdate {
    pub fn to_markdown(&self) -> String {
        format!(
            "# {}: week of {}\n\n> {}\n\n{}\n\n*Generated at: {}*\n",
            self.owner,
            self.week_start_at.format("%Y-%m-%d"),
            self.short_update,
            self.update,
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

/// Half-open window `[start, end)` of merge times covered by a rollup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WeekWindow {
    /// Create a window from specific dates
    pub fn from_dates(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Monday-to-Monday week, `weeks_ago` weeks before the one containing `now`
    ///
    /// `weeks_ago == 0` is the current, still running week. Fails with a
    /// config error when the week falls outside the supported calendar.
    pub fn weeks_ago(now: DateTime<Utc>, weeks_ago: u32) -> Result<Self> {
        let out_of_range =
            || DeltascapeError::config(format!("--weeks-ago {} is out of the supported date range", weeks_ago));

        let today = now.date_naive();
        let start_day = today
            .checked_sub_signed(Duration::days(i64::from(today.weekday().num_days_from_monday())))
            .and_then(|monday| monday.checked_sub_signed(Duration::weeks(i64::from(weeks_ago))))
            .ok_or_else(out_of_range)?;
        let start = Utc.from_utc_datetime(&start_day.and_time(NaiveTime::default()));
        let end = start
            .checked_add_signed(Duration::weeks(1))
            .ok_or_else(out_of_range)?;

        Ok(Self::from_dates(start, end))
    }

    /// Check if a date is within this window
    pub fn contains(&self, date: &DateTime<Utc>) -> bool {
        date >= &self.start && date < &self.end
    }
}
