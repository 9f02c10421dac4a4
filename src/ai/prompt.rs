use crate::report::{PrReport, RepoWeekUpdate};

/// Instruction for compressing one chunk of a diff
pub const COMPRESS_DIFF_SYSTEM: &str = "You are a tool for extreme compression of git diffs. \
The user sends you part of a git diff and you rewrite it so that the meaning of the changes is preserved. \
Answer with just a couple of sentences per diff. \
Do not enumerate the resulting items and do not prefix lines with hyphens or minus signs.";

/// Instruction for turning PR metadata plus a compressed diff into a narrative
pub const PR_SUMMARY_SYSTEM: &str = "You are a tool for summarizing pull request changes.
You receive the following structure:
- TITLE: pull request title
- DESCRIPTION: pull request description
- DIFF: compressed pull request code diff
Answer with a short and concise description of the changes this pull request introduces.
Mention every important change without overwhelming the reader with details.
Describe what the change DOES rather than what the change IS.
Your main goal is to tell what is new. Be brief and straight to the point.";

/// Instruction for a repository's weekly rollup
pub const REPO_WEEK_SYSTEM: &str = "You are a tool for summarizing the past week of changes in a project repository. \
The user sends you a list of pull request titles and their descriptions. \
Answer with a short and concise description of the changes introduced. \
Describe what the changes DO rather than what they ARE. Your main goal is to tell what is new. \
Be brief and straight to the point, mention all important changes without overwhelming the reader with details. \
Group related changes together and prioritize important changes over fixes and dependency updates.";

/// Instruction for an organization's weekly rollup
pub const ORG_WEEK_SYSTEM: &str = "You are a tool for summarizing the past week of changes across an organization. \
The user sends you a list of updates, each describing one week of changes in one of the organization's projects. \
Answer with a short and concise description of the changes introduced across the whole organization. \
Describe what the changes DO rather than what they ARE. Your main goal is to tell what is new. \
Be brief and straight to the point, mention all important changes without overwhelming the reader with details. \
Group related changes together and prioritize important changes over fixes and dependency updates.";

/// Instruction for the one-to-two sentence digest of a week
pub const DIGEST_SYSTEM: &str = "You are a summarization tool. \
Given a list of changes made over the last week, summarize them in 1-2 sentences. \
Be straight to the point and concise.";

/// Separator between entries of a weekly rollup input
const ENTRY_SEPARATOR: &str = "\n\n";

/// Build the structured user message for the PR summary call
pub fn pr_summary_prompt(title: &str, body: Option<&str>, compressed_diff: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("TITLE: {}\n", title));
    prompt.push_str("DESCRIPTION:\n");
    prompt.push_str(body.unwrap_or(""));
    prompt.push_str("\n\n\nDIFF:\n");
    prompt.push_str(compressed_diff);

    prompt
}

/// Concatenate PR titles and summaries for the repo-week rollup
pub fn repo_week_changes(reports: &[PrReport]) -> String {
    reports
        .iter()
        .map(|report| format!("{}\n{}", report.title, report.summary))
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR)
}

/// Concatenate repo-week narratives for the org-week rollup
pub fn org_week_changes(updates: &[RepoWeekUpdate]) -> String {
    updates
        .iter()
        .map(|update| update.update.as_str())
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR)
}
