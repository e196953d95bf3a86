//! GitHub wire payloads and the canonical records the rest of the crate
//! consumes.
//!
//! Wire shapes are deserialized privately to the client and converted into
//! canonical records at the boundary, so report logic never sees raw API
//! JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// An owner/repo pair parsed out of a stored repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Parse `https://github.com/owner/repo` (trailing slash and `.git`
    /// tolerated). Fewer than two path segments is a configuration error.
    pub fn parse(url: &str) -> Result<Self, AppError> {
        let trimmed = url.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
        // Drop the scheme and host from an absolute URL; only the path
        // carries owner/repo.
        let path = match trimmed.split_once("://") {
            Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
            None => trimmed,
        };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() < 2 {
            return Err(AppError::BadConfig(format!(
                "Invalid GitHub URL format: {}",
                url
            )));
        }
        Ok(Self {
            owner: segments[segments.len() - 2].to_string(),
            repo: segments[segments.len() - 1].to_string(),
        })
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

// ============================================================================
// Canonical records
// ============================================================================

/// A commit, normalized for report building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

/// A pull request, normalized for report building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRecord {
    pub number: u64,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub state: String,
}

/// Per-file change stats from a commit detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub filename: String,
    pub additions: u64,
    pub deletions: u64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

/// A single commit with its file-level changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDetail {
    pub sha: String,
    pub message: String,
    pub files: Vec<FileChange>,
}

/// Pull request metadata used for documentation prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullDetail {
    pub number: u64,
    pub title: String,
    pub description: String,
    pub changed_files: u64,
    pub additions: u64,
    pub deletions: u64,
}

/// One entry of the recursive repository tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    /// "blob" for files, "tree" for directories.
    #[serde(rename = "type")]
    pub kind: String,
}

// ============================================================================
// Wire payloads (GitHub REST v3)
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct CommitPayload {
    pub sha: String,
    pub commit: CommitBody,
    pub author: Option<ActorPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitBody {
    pub message: String,
    pub author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitAuthor {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActorPayload {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitDetailPayload {
    pub sha: String,
    pub commit: CommitBody,
    #[serde(default)]
    pub files: Vec<FileChange>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PullPayload {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub user: Option<ActorPayload>,
    pub state: String,
    #[serde(default)]
    pub changed_files: u64,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepoPayload {
    pub default_branch: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TreePayload {
    pub tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentPayload {
    pub content: String,
}

impl CommitPayload {
    pub(crate) fn into_record(self) -> CommitRecord {
        let author = self
            .author
            .map(|a| a.login)
            .or_else(|| self.commit.author.as_ref().and_then(|a| a.name.clone()));
        let date = self.commit.author.and_then(|a| a.date);
        CommitRecord {
            sha: self.sha,
            message: self.commit.message,
            author,
            date,
        }
    }
}

impl PullPayload {
    pub(crate) fn into_record(self) -> PullRecord {
        PullRecord {
            number: self.number,
            title: self.title,
            description: self.body.unwrap_or_default(),
            author: self.user.map(|u| u.login),
            state: self.state,
        }
    }

    pub(crate) fn into_detail(self) -> PullDetail {
        PullDetail {
            number: self.number,
            title: self.title,
            description: self.body.unwrap_or_default(),
            changed_files: self.changed_files,
            additions: self.additions,
            deletions: self.deletions,
        }
    }
}
