//! Commit and pull-request documentation generation.
//!
//! Stateless wrapper: fetches the change from GitHub, asks the generator for
//! structured documentation plus a pre-rendered HTML fragment, and never
//! caches. A generator failure degrades to a fallback document carrying the
//! error, so the endpoint still returns something displayable.

use crate::error::AppError;
use crate::github::{CommitDetail, PullDetail, RepoRef};
use crate::llm::{CommitDocumentation, PrDocumentation};
use crate::AppState;

/// Diff text beyond this is cut from the PR prompt to stay within token limits.
const MAX_DIFF_CHARS: usize = 3000;

pub async fn document_commit(
    state: &AppState,
    repo: &RepoRef,
    sha: &str,
) -> Result<CommitDocumentation, AppError> {
    let detail = state.github.commit_detail(repo, sha).await?;
    let prompt = commit_prompt(&detail);

    match state.generator.generate::<CommitDocumentation>(&prompt).await {
        Ok(doc) => Ok(doc),
        Err(e) => {
            tracing::warn!(sha, "commit documentation generation failed: {:?}", e);
            Ok(commit_fallback(&detail, &e))
        }
    }
}

pub async fn document_pr(
    state: &AppState,
    repo: &RepoRef,
    number: u64,
) -> Result<PrDocumentation, AppError> {
    let detail = state.github.pull_detail(repo, number).await?;
    let diff = state.github.pull_diff(repo, number).await?;
    let prompt = pr_prompt(&detail, &diff);

    match state.generator.generate::<PrDocumentation>(&prompt).await {
        Ok(doc) => Ok(doc),
        Err(e) => {
            tracing::warn!(number, "PR documentation generation failed: {:?}", e);
            Ok(pr_fallback(&detail, &e))
        }
    }
}

fn commit_prompt(detail: &CommitDetail) -> String {
    let mut changes_summary = String::new();
    for file in &detail.files {
        changes_summary.push_str(&format!(
            "File: {}\nChanges: +{} -{}\nStatus: {}\nPatch:\n{}\n",
            file.filename,
            file.additions,
            file.deletions,
            file.status,
            file.patch.as_deref().unwrap_or("No patch available"),
        ));
    }

    format!(
        "As a technical documentation expert, analyze this commit and generate \
         comprehensive documentation.\n\n\
         Commit Message:\n{}\n\n\
         Changes Made:\n{}\n\
         Generate documentation with the following sections:\n\
         - Summary: A concise overview of what this commit does\n\
         - Purpose: The goal and reasoning behind these changes\n\
         - Technical Details: Specific implementation details and approach\n\
         - Impact: How these changes affect the codebase\n\
         - Testing Recommendations: Suggested testing approaches\n\n\
         Also include an HTML formatted version of the complete documentation \
         in the html_content field. The HTML should be well-structured and \
         styled for direct display.",
        detail.message, changes_summary
    )
}

fn pr_prompt(detail: &PullDetail, diff: &str) -> String {
    let truncated: String = diff.chars().take(MAX_DIFF_CHARS).collect();
    let description = if detail.description.is_empty() {
        "No description provided"
    } else {
        detail.description.as_str()
    };

    format!(
        "As a technical documentation expert, analyze this pull request and \
         generate comprehensive documentation.\n\n\
         Pull Request Title: {}\n\
         Description: {}\n\n\
         Changes Overview:\n\
         - Files Changed: {}\n\
         - Additions: +{}\n\
         - Deletions: -{}\n\n\
         Diff:\n{}\n\n\
         Generate documentation with the following sections:\n\
         - Summary: A high-level overview of the changes\n\
         - Purpose: The motivation and goals behind these changes\n\
         - Technical Details: Implementation specifics and approach\n\
         - Impact: System-wide effects and considerations\n\
         - Testing Considerations: Testing strategy and requirements\n\
         - Review Checklist: Specific items reviewers should check\n\
         - Risks: Potential issues or areas needing attention\n\n\
         Also include an HTML formatted version of the complete documentation \
         in the html_content field. The HTML should be well-structured and \
         styled for direct display.",
        detail.title, description, detail.changed_files, detail.additions, detail.deletions, truncated
    )
}

fn commit_fallback(detail: &CommitDetail, err: &AppError) -> CommitDocumentation {
    CommitDocumentation {
        summary: "Error generating documentation".to_string(),
        purpose: "N/A".to_string(),
        technical_details: "N/A".to_string(),
        impact: "N/A".to_string(),
        testing_recommendations: "N/A".to_string(),
        html_content: format!(
            "<h2>Error Generating Documentation</h2>\
             <p>There was an error generating the documentation: {:?}</p>\
             <h3>Raw Changes:</h3><pre>{}</pre>",
            err, detail.message
        ),
    }
}

fn pr_fallback(detail: &PullDetail, err: &AppError) -> PrDocumentation {
    PrDocumentation {
        summary: "Error generating documentation".to_string(),
        purpose: "N/A".to_string(),
        technical_details: "N/A".to_string(),
        impact: "N/A".to_string(),
        testing_considerations: "N/A".to_string(),
        review_checklist: vec![],
        risks: vec![],
        html_content: format!(
            "<h2>Error Generating Documentation</h2>\
             <p>There was an error generating the documentation: {:?}</p>\
             <h3>Pull Request Details:</h3><pre>{}</pre>",
            err, detail.title
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{generator_response, test_state};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo() -> RepoRef {
        RepoRef {
            owner: "acme".into(),
            repo: "widgets".into(),
        }
    }

    async fn mount_commit_detail(github: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/commits/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sha": "abc123",
                "commit": {"message": "Fix widget rendering"},
                "files": [
                    {"filename": "src/widget.rs", "additions": 10, "deletions": 2,
                     "status": "modified", "patch": "@@ -1 +1 @@"}
                ]
            })))
            .mount(github)
            .await;
    }

    #[tokio::test]
    async fn test_commit_documentation_happy_path() {
        let github = MockServer::start().await;
        let llm = MockServer::start().await;
        let state = test_state(&github, &llm).await;
        mount_commit_detail(&github).await;
        generator_response(
            &llm,
            serde_json::json!({
                "summary": "Fixes rendering",
                "purpose": "Correct a glitch",
                "technical_details": "Adjusted layout math",
                "impact": "Widget module only",
                "testing_recommendations": "Snapshot tests",
                "html_content": "<h2>Fixes rendering</h2>"
            }),
        )
        .await;

        let doc = document_commit(&state, &repo(), "abc123").await.unwrap();
        assert_eq!(doc.summary, "Fixes rendering");
    }

    #[tokio::test]
    async fn test_generator_failure_yields_fallback_doc() {
        let github = MockServer::start().await;
        let llm = MockServer::start().await;
        let state = test_state(&github, &llm).await;
        mount_commit_detail(&github).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&llm)
            .await;

        let doc = document_commit(&state, &repo(), "abc123").await.unwrap();
        assert_eq!(doc.summary, "Error generating documentation");
        assert!(doc.html_content.contains("Fix widget rendering"));
    }

    #[tokio::test]
    async fn test_missing_commit_propagates_upstream_error() {
        let github = MockServer::start().await;
        let llm = MockServer::start().await;
        let state = test_state(&github, &llm).await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/commits/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&github)
            .await;

        let err = document_commit(&state, &repo(), "missing").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_pr_documentation_uses_diff() {
        let github = MockServer::start().await;
        let llm = MockServer::start().await;
        let state = test_state(&github, &llm).await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/pulls/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "number": 7, "title": "Add search", "body": "full text search",
                "user": {"login": "bob"}, "state": "open",
                "changed_files": 3, "additions": 120, "deletions": 4
            })))
            .mount(&github)
            .await;
        generator_response(
            &llm,
            serde_json::json!({
                "summary": "Adds search",
                "purpose": "Findability",
                "technical_details": "Inverted index",
                "impact": "Search module",
                "testing_considerations": "Integration tests",
                "review_checklist": ["check index size"],
                "risks": ["memory growth"],
                "html_content": "<h2>Adds search</h2>"
            }),
        )
        .await;

        let doc = document_pr(&state, &repo(), 7).await.unwrap();
        assert_eq!(doc.summary, "Adds search");
        assert_eq!(doc.review_checklist, vec!["check index size"]);
    }

    #[test]
    fn test_pr_prompt_truncates_diff() {
        let detail = PullDetail {
            number: 1,
            title: "t".into(),
            description: "d".into(),
            changed_files: 1,
            additions: 1,
            deletions: 1,
        };
        let huge_diff = "x".repeat(10_000);
        let prompt = pr_prompt(&detail, &huge_diff);
        assert!(prompt.len() < 5_000);
    }
}
