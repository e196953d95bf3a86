//! Codebase Q&A pipeline.
//!
//! Answers "where in this codebase is X" in three generation stages:
//! shortlist candidate files from the repository tree, score each candidate's
//! content for relevance, then synthesize a final answer from the files that
//! cleared the relevance threshold. A failure on one file skips that file,
//! never the whole query.

use serde::Serialize;

use crate::error::AppError;
use crate::github::RepoRef;
use crate::llm::{CodeAnalysis, CodebaseAnalysis};
use crate::AppState;

/// Files scoring at or below this are excluded from the final answer.
const RELEVANCE_THRESHOLD: f64 = 0.3;

/// A candidate file that was fetched and scored successfully.
#[derive(Debug, Clone, Serialize)]
pub struct FileAnalysis {
    pub path: String,
    pub relevance_score: f64,
    pub explanation: String,
}

/// Per-candidate pipeline outcome.
#[derive(Debug)]
pub enum FileOutcome {
    Analyzed(FileAnalysis),
    Skipped { path: String, reason: String },
}

/// A candidate dropped because its fetch or scoring failed.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Full analyzer result: the synthesized answer plus the candidates that
/// had to be skipped along the way.
#[derive(Debug, Serialize)]
pub struct AnalyzeResult {
    pub answer: String,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

pub async fn analyze(
    state: &AppState,
    repo: &RepoRef,
    query: &str,
) -> Result<AnalyzeResult, AppError> {
    let branch = state.github.default_branch(repo).await?;
    let tree = state.github.file_tree(repo, &branch).await?;
    let paths: Vec<&str> = tree.iter().map(|e| e.path.as_str()).collect();

    let shortlist: CodeAnalysis = state
        .generator
        .generate(&shortlist_prompt(query, &paths))
        .await?;
    tracing::debug!(
        candidates = shortlist.code_snippets.len(),
        "analyzer shortlist"
    );

    let mut outcomes = Vec::with_capacity(shortlist.code_snippets.len());
    for path in &shortlist.code_snippets {
        outcomes.push(analyze_file(state, repo, query, path).await);
    }

    let mut retained = Vec::new();
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            FileOutcome::Analyzed(a) if a.relevance_score > RELEVANCE_THRESHOLD => {
                retained.push(a)
            }
            FileOutcome::Analyzed(a) => {
                tracing::debug!(path = %a.path, score = a.relevance_score, "below threshold");
            }
            FileOutcome::Skipped { path, reason } => {
                tracing::warn!(%path, %reason, "skipping candidate file");
                skipped.push(SkippedFile { path, reason });
            }
        }
    }
    retained.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let analysis: CodebaseAnalysis = state
        .generator
        .generate(&summary_prompt(query, &retained)?)
        .await?;

    Ok(AnalyzeResult {
        answer: analysis.answer,
        confidence: analysis.confidence,
        sources: analysis.sources,
        skipped,
    })
}

/// Fetch and score one candidate. Failures become a `Skipped` outcome.
async fn analyze_file(
    state: &AppState,
    repo: &RepoRef,
    query: &str,
    path: &str,
) -> FileOutcome {
    let content = match state.github.file_content(repo, path).await {
        Ok(content) => content,
        Err(e) => {
            return FileOutcome::Skipped {
                path: path.to_string(),
                reason: format!("fetch failed: {}", e),
            }
        }
    };

    match state
        .generator
        .generate::<CodeAnalysis>(&file_prompt(query, path, &content))
        .await
    {
        Ok(analysis) => FileOutcome::Analyzed(FileAnalysis {
            path: path.to_string(),
            relevance_score: analysis.relevance_score,
            explanation: analysis.explanation,
        }),
        Err(e) => FileOutcome::Skipped {
            path: path.to_string(),
            reason: format!("analysis failed: {}", e),
        },
    }
}

fn shortlist_prompt(query: &str, paths: &[&str]) -> String {
    format!(
        "Given this repository file list and the query \"{}\", identify the \
         most relevant files that might contain information about this feature.\n\n\
         Return a json object with the following fields:\n\
         {{\n\
             \"relevance_score\": 0-1 score of how relevant the shortlist is,\n\
             \"explanation\": brief explanation of the selection,\n\
             \"code_snippets\": [\"path/to/file\", ...]\n\
         }}\n\n\
         Repository files:\n{}",
        query,
        paths.join("\n")
    )
}

fn file_prompt(query: &str, path: &str, content: &str) -> String {
    format!(
        "Analyze this code file and determine if it contains information about \
         the feature described in the query: \"{}\"\n\n\
         Your response should be a json object with the following fields:\n\
         {{\n\
             \"relevance_score\": 0-1 score of how relevant this file is,\n\
             \"explanation\": brief explanation of why this file is relevant\n\
         }}\n\n\
         File path: {}\n\
         Content:\n{}",
        query, path, content
    )
}

fn summary_prompt(query: &str, retained: &[FileAnalysis]) -> Result<String, AppError> {
    Ok(format!(
        "Based on the analysis of these files, provide a comprehensive answer \
         to the query: \"{}\"\n\n\
         Analysis results:\n{}",
        query,
        serde_json::to_string_pretty(retained)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_state;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo() -> RepoRef {
        RepoRef {
            owner: "acme".into(),
            repo: "widgets".into(),
        }
    }

    fn envelope(payload: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": payload.to_string()}]}}]
        })
    }

    async fn mount_repo_basics(github: &MockServer, files: &[&str]) {
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"default_branch": "main"})),
            )
            .mount(github)
            .await;
        let tree: Vec<serde_json::Value> = files
            .iter()
            .map(|p| serde_json::json!({"path": p, "type": "blob"}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/git/trees/main"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"tree": tree})),
            )
            .mount(github)
            .await;
    }

    async fn mount_file(github: &MockServer, file: &str, content: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/repos/acme/widgets/contents/{}", file)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": BASE64.encode(content),
                "encoding": "base64"
            })))
            .mount(github)
            .await;
    }

    /// Mount a generator response matched by a marker substring of the prompt.
    async fn mount_generation(llm: &MockServer, marker: &str, payload: serde_json::Value) {
        Mock::given(method("POST"))
            .and(body_string_contains(marker))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(payload)))
            .mount(llm)
            .await;
    }

    #[tokio::test]
    async fn test_threshold_and_skip_behavior() {
        let github = MockServer::start().await;
        let llm = MockServer::start().await;
        let state = test_state(&github, &llm).await;

        mount_repo_basics(&github, &["src/auth.rs", "src/db.rs", "src/gone.rs"]).await;
        mount_file(&github, "src/auth.rs", "fn login() {}").await;
        mount_file(&github, "src/db.rs", "fn connect() {}").await;
        // src/gone.rs has no contents mock → 404 → skipped

        // Stage 1: shortlist all three
        mount_generation(
            &llm,
            "Repository files:",
            serde_json::json!({
                "relevance_score": 1.0,
                "explanation": "candidates",
                "code_snippets": ["src/auth.rs", "src/db.rs", "src/gone.rs"]
            }),
        )
        .await;
        // Stage 2: per-file scores (0.9 kept, 0.3 excluded by the strict threshold)
        mount_generation(
            &llm,
            "File path: src/auth.rs",
            serde_json::json!({"relevance_score": 0.9, "explanation": "login lives here"}),
        )
        .await;
        mount_generation(
            &llm,
            "File path: src/db.rs",
            serde_json::json!({"relevance_score": 0.3, "explanation": "unrelated"}),
        )
        .await;
        // Stage 3: synthesis
        mount_generation(
            &llm,
            "comprehensive answer",
            serde_json::json!({
                "answer": "Login is implemented in src/auth.rs",
                "confidence": 0.8,
                "sources": ["src/auth.rs"]
            }),
        )
        .await;

        let result = analyze(&state, &repo(), "where is login handled?")
            .await
            .unwrap();

        assert_eq!(result.answer, "Login is implemented in src/auth.rs");
        assert_eq!(result.sources, vec!["src/auth.rs"]);
        // A file scoring exactly the threshold never appears as a source
        assert!(!result.sources.contains(&"src/db.rs".to_string()));
        // The unfetchable file shows up as skipped, not as a failure
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].path, "src/gone.rs");
    }

    #[tokio::test]
    async fn test_tree_fetch_failure_propagates() {
        let github = MockServer::start().await;
        let llm = MockServer::start().await;
        let state = test_state(&github, &llm).await;

        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&github)
            .await;

        let err = analyze(&state, &repo(), "anything").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
