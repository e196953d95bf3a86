//! Read-only GitHub REST client.
//!
//! The base URL is configurable so tests can point it at a local mock
//! server. All non-2xx responses surface as upstream errors carrying the
//! status and a snippet of the body.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use super::models::*;
use crate::error::AppError;

const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_DIFF: &str = "application/vnd.github.v3.diff";
const USER_AGENT: &str = concat!("intersect-server/", env!("CARGO_PKG_VERSION"));

/// Thread-safe and cheaply cloneable (shares the reqwest client internally).
#[derive(Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let text = self.get_raw(path, query, ACCEPT_JSON).await?;
        serde_json::from_str(&text)
            .map_err(|e| AppError::Upstream(format!("Malformed GitHub response for {path}: {e}")))
    }

    async fn get_raw(
        &self,
        path: &str,
        query: &[(&str, String)],
        accept: &str,
    ) -> Result<String, AppError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .client
            .get(&url)
            .header("Accept", accept)
            .header("User-Agent", USER_AGENT)
            .query(query);
        if let Some(ref token) = self.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let response = req.send().await.map_err(|e| {
            AppError::Upstream(format!("Failed to reach GitHub at {}: {}", url, e))
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(AppError::Upstream(format!(
                "GitHub returned {} for {}: {}",
                status.as_u16(),
                path,
                snippet
            )));
        }
        Ok(body)
    }

    /// Most recent commit on the default branch, `None` for an empty repo.
    pub async fn latest_commit(&self, repo: &RepoRef) -> Result<Option<CommitRecord>, AppError> {
        let path = format!("/repos/{}/{}/commits", repo.owner, repo.repo);
        let commits: Vec<CommitPayload> = self
            .get_json(&path, &[("per_page", "1".to_string())])
            .await?;
        Ok(commits.into_iter().next().map(CommitPayload::into_record))
    }

    /// Commits in a time window, newest first.
    pub async fn commits_between(
        &self,
        repo: &RepoRef,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<CommitRecord>, AppError> {
        let path = format!("/repos/{}/{}/commits", repo.owner, repo.repo);
        let commits: Vec<CommitPayload> = self
            .get_json(
                &path,
                &[
                    ("since", since.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
                    ("until", until.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
                    ("per_page", "100".to_string()),
                ],
            )
            .await?;
        Ok(commits.into_iter().map(CommitPayload::into_record).collect())
    }

    /// Full commit history, optionally filtered by author login.
    pub async fn list_commits(
        &self,
        repo: &RepoRef,
        author: Option<&str>,
    ) -> Result<Vec<CommitRecord>, AppError> {
        let path = format!("/repos/{}/{}/commits", repo.owner, repo.repo);
        let mut query = vec![("per_page", "100".to_string())];
        if let Some(author) = author {
            query.push(("author", author.to_string()));
        }
        let commits: Vec<CommitPayload> = self.get_json(&path, &query).await?;
        Ok(commits.into_iter().map(CommitPayload::into_record).collect())
    }

    /// A single commit with per-file change stats and patches.
    pub async fn commit_detail(
        &self,
        repo: &RepoRef,
        sha: &str,
    ) -> Result<CommitDetail, AppError> {
        let path = format!("/repos/{}/{}/commits/{}", repo.owner, repo.repo, sha);
        let detail: CommitDetailPayload = self.get_json(&path, &[]).await?;
        Ok(CommitDetail {
            sha: detail.sha,
            message: detail.commit.message,
            files: detail.files,
        })
    }

    /// All pull requests (any state), newest first.
    pub async fn list_pulls(&self, repo: &RepoRef) -> Result<Vec<PullRecord>, AppError> {
        let path = format!("/repos/{}/{}/pulls", repo.owner, repo.repo);
        let pulls: Vec<PullPayload> = self
            .get_json(
                &path,
                &[
                    ("state", "all".to_string()),
                    ("per_page", "100".to_string()),
                ],
            )
            .await?;
        Ok(pulls.into_iter().map(PullPayload::into_record).collect())
    }

    pub async fn pull_detail(&self, repo: &RepoRef, number: u64) -> Result<PullDetail, AppError> {
        let path = format!("/repos/{}/{}/pulls/{}", repo.owner, repo.repo, number);
        let pull: PullPayload = self.get_json(&path, &[]).await?;
        Ok(pull.into_detail())
    }

    /// Unified diff for a pull request.
    pub async fn pull_diff(&self, repo: &RepoRef, number: u64) -> Result<String, AppError> {
        let path = format!("/repos/{}/{}/pulls/{}", repo.owner, repo.repo, number);
        self.get_raw(&path, &[], ACCEPT_DIFF).await
    }

    pub async fn default_branch(&self, repo: &RepoRef) -> Result<String, AppError> {
        let path = format!("/repos/{}/{}", repo.owner, repo.repo);
        let info: RepoPayload = self.get_json(&path, &[]).await?;
        Ok(info.default_branch)
    }

    /// Recursive file tree of a branch; directories filtered out.
    pub async fn file_tree(
        &self,
        repo: &RepoRef,
        branch: &str,
    ) -> Result<Vec<TreeEntry>, AppError> {
        let path = format!(
            "/repos/{}/{}/git/trees/{}",
            repo.owner, repo.repo, branch
        );
        let tree: TreePayload = self
            .get_json(&path, &[("recursive", "1".to_string())])
            .await?;
        Ok(tree
            .tree
            .into_iter()
            .filter(|e| e.kind == "blob")
            .collect())
    }

    /// Decoded content of a single file.
    pub async fn file_content(&self, repo: &RepoRef, file_path: &str) -> Result<String, AppError> {
        let path = format!(
            "/repos/{}/{}/contents/{}",
            repo.owner, repo.repo, file_path
        );
        let content: ContentPayload = self.get_json(&path, &[]).await?;
        // GitHub wraps base64 at 60 columns
        let compact: String = content.content.split_whitespace().collect();
        let bytes = BASE64
            .decode(compact.as_bytes())
            .map_err(|e| AppError::Upstream(format!("Invalid file encoding for {file_path}: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Upstream(format!("Non-UTF8 file content for {file_path}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo() -> RepoRef {
        RepoRef {
            owner: "acme".into(),
            repo: "widgets".into(),
        }
    }

    fn commit_json(sha: &str, message: &str) -> serde_json::Value {
        serde_json::json!({
            "sha": sha,
            "commit": {"message": message, "author": {"name": "Alice", "date": "2026-08-29T08:00:00Z"}},
            "author": {"login": "alice"}
        })
    }

    #[tokio::test]
    async fn test_latest_commit_empty_repo_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/commits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = GithubClient::new(server.uri(), None);
        assert!(client.latest_commit(&repo()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_commit_uses_per_page_one() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/commits"))
            .and(query_param("per_page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([commit_json("abc123", "tip")])),
            )
            .mount(&server)
            .await;

        let client = GithubClient::new(server.uri(), None);
        let latest = client.latest_commit(&repo()).await.unwrap().unwrap();
        assert_eq!(latest.sha, "abc123");
        assert_eq!(latest.author.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_non_2xx_maps_to_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/commits"))
            .respond_with(ResponseTemplate::new(403).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = GithubClient::new(server.uri(), None);
        let err = client.latest_commit(&repo()).await.unwrap_err();
        match err {
            AppError::Upstream(msg) => {
                assert!(msg.contains("403"), "message was: {}", msg);
                assert!(msg.contains("rate limited"));
            }
            other => panic!("expected Upstream, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_token_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets"))
            .and(header("Authorization", "Bearer tok-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"default_branch": "main"})),
            )
            .mount(&server)
            .await;

        let client = GithubClient::new(server.uri(), Some("tok-1".into()));
        assert_eq!(client.default_branch(&repo()).await.unwrap(), "main");
    }

    #[tokio::test]
    async fn test_file_tree_filters_directories() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/git/trees/main"))
            .and(query_param("recursive", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tree": [
                    {"path": "src", "type": "tree"},
                    {"path": "src/main.rs", "type": "blob"},
                    {"path": "README.md", "type": "blob"}
                ]
            })))
            .mount(&server)
            .await;

        let client = GithubClient::new(server.uri(), None);
        let tree = client.file_tree(&repo(), "main").await.unwrap();
        let paths: Vec<_> = tree.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["src/main.rs", "README.md"]);
    }

    #[tokio::test]
    async fn test_file_content_decodes_wrapped_base64() {
        let server = MockServer::start().await;
        // "fn main() {}" base64-encoded, split across lines as GitHub does
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/contents/src/main.rs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": "Zm4gbWFpbigp\nIHt9\n",
                "encoding": "base64"
            })))
            .mount(&server)
            .await;

        let client = GithubClient::new(server.uri(), None);
        let content = client.file_content(&repo(), "src/main.rs").await.unwrap();
        assert_eq!(content, "fn main() {}");
    }

    #[tokio::test]
    async fn test_list_commits_passes_author_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/commits"))
            .and(query_param("author", "bob"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([commit_json("c1", "bob's commit")])),
            )
            .mount(&server)
            .await;

        let client = GithubClient::new(server.uri(), None);
        let commits = client.list_commits(&repo(), Some("bob")).await.unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "bob's commit");
    }
}
