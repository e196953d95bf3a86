//! Read-only gateway to the GitHub REST API.

pub mod client;
pub mod models;

pub use client::GithubClient;
pub use models::{
    CommitDetail, CommitRecord, FileChange, PullDetail, PullRecord, RepoRef, TreeEntry,
};
