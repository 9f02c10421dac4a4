use crate::error::Result;
use crate::github::{PullRequestSource, RepoRef};
use crate::report::WeekWindow;
use tracing::debug;

/// Numbers of the PRs merged inside `window`, most recently updated first
///
/// Pages through closed PRs sorted by update time and stops at the first
/// page that reaches back before the window, or when pages run out.
pub async fn fetch_week_pulls(
    source: &dyn PullRequestSource,
    repo: &RepoRef,
    window: &WeekWindow,
) -> Result<Vec<u64>> {
    let mut numbers = Vec::new();
    let mut page = 1;

    loop {
        let listing = source.list_pulls_page(&repo.owner, &repo.repo, page).await?;

        numbers.extend(
            listing
                .items
                .iter()
                .filter(|pull| pull.merged_at.map_or(false, |merged_at| window.contains(&merged_at)))
                .map(|pull| pull.number),
        );

        let reached_window_start = listing
            .items
            .iter()
            .any(|pull| pull.updated_at < window.start);
        if reached_window_start || !listing.has_next || listing.items.is_empty() {
            break;
        }
        page += 1;
    }

    debug!(repo = %repo, pages = page, merged = numbers.len(), "Listed pull requests for week");
    Ok(numbers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::PullListItem;
    use crate::testing::FakeGitHub;
    use chrono::{DateTime, Utc};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn week() -> WeekWindow {
        WeekWindow::from_dates(at("2024-05-06T00:00:00Z"), at("2024-05-13T00:00:00Z"))
    }

    fn item(number: u64, merged_at: Option<&str>, updated_at: &str) -> PullListItem {
        PullListItem {
            number,
            merged_at: merged_at.map(at),
            updated_at: at(updated_at),
        }
    }

    #[tokio::test]
    async fn test_filters_merged_in_window() {
        let github = FakeGitHub::new().with_pages(vec![vec![
            item(9, Some("2024-05-14T10:00:00Z"), "2024-05-14T10:00:00Z"),
            item(8, Some("2024-05-10T10:00:00Z"), "2024-05-10T10:00:00Z"),
            item(7, None, "2024-05-09T10:00:00Z"),
            item(6, Some("2024-05-06T00:00:00Z"), "2024-05-08T10:00:00Z"),
            item(5, Some("2024-05-01T10:00:00Z"), "2024-05-07T10:00:00Z"),
        ]]);

        let numbers = fetch_week_pulls(&github, &RepoRef::new("acme", "widgets"), &week())
            .await
            .unwrap();

        assert_eq!(numbers, vec![8, 6]);
    }

    #[tokio::test]
    async fn test_stops_at_page_older_than_window() {
        let github = FakeGitHub::new().with_pages(vec![
            vec![
                item(20, Some("2024-05-12T10:00:00Z"), "2024-05-12T10:00:00Z"),
                item(19, Some("2024-05-11T10:00:00Z"), "2024-05-11T10:00:00Z"),
            ],
            vec![
                item(18, Some("2024-05-07T10:00:00Z"), "2024-05-07T10:00:00Z"),
                item(17, Some("2024-04-30T10:00:00Z"), "2024-04-30T10:00:00Z"),
            ],
            vec![item(16, Some("2024-05-08T10:00:00Z"), "2024-04-20T10:00:00Z")],
        ]);

        let numbers = fetch_week_pulls(&github, &RepoRef::new("acme", "widgets"), &week())
            .await
            .unwrap();

        assert_eq!(numbers, vec![20, 19, 18]);
        assert_eq!(github.page_requests(), 2);
    }

    #[tokio::test]
    async fn test_stops_when_pages_run_out() {
        let github = FakeGitHub::new().with_pages(vec![vec![item(
            3,
            Some("2024-05-09T10:00:00Z"),
            "2024-05-09T10:00:00Z",
        )]]);

        let numbers = fetch_week_pulls(&github, &RepoRef::new("acme", "widgets"), &week())
            .await
            .unwrap();

        assert_eq!(numbers, vec![3]);
        assert_eq!(github.page_requests(), 1);
    }

    #[tokio::test]
    async fn test_empty_repository() {
        let github = FakeGitHub::new();
        let numbers = fetch_week_pulls(&github, &RepoRef::new("acme", "empty"), &week())
            .await
            .unwrap();
        assert!(numbers.is_empty());
    }
}
