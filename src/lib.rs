//! Intersect backend
//!
//! A CRUD backend that connects an organization to a GitHub repository and
//! layers automated reporting on top:
//! - daily dev reports with an incremental commit-SHA cache
//! - per-goal progress reports
//! - commit / pull-request documentation
//! - free-text codebase Q&A

pub mod analyzer;
pub mod api;
pub mod documentation;
pub mod error;
pub mod github;
pub mod llm;
pub mod reports;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::{Context, Result};
use std::sync::Arc;

/// Application configuration, loaded from environment variables (and `.env`
/// via dotenvy in `main`).
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the SQLite document store. Required.
    pub database_path: String,
    /// LLM provider API key. Required.
    pub gemini_api_key: String,
    pub gemini_api_url: String,
    pub gemini_model: String,
    pub github_api_url: String,
    /// Optional token for private repositories / higher rate limits.
    pub github_token: Option<String>,
    pub server_port: u16,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `DATABASE_PATH` and `GEMINI_API_KEY` are required at process start;
    /// everything else has a sensible default.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_path: std::env::var("DATABASE_PATH")
                .context("DATABASE_PATH must be set (path of the SQLite store)")?,
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .context("GEMINI_API_KEY must be set")?,
            gemini_api_url: std::env::var("GEMINI_API_URL")
                .unwrap_or_else(|_| llm::DEFAULT_API_URL.to_string()),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| llm::DEFAULT_MODEL.to_string()),
            github_api_url: std::env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
            github_token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
        })
    }
}

/// Shared application state: the document store and the two upstream
/// gateways, constructed once at process start and injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: store::Store,
    pub github: github::GithubClient,
    pub generator: llm::Generator,
    pub config: Arc<Config>,
}

impl AppState {
    /// Resolve an organization's linked repository.
    ///
    /// Missing link → `NotConfigured`; URL that does not parse into
    /// owner/repo segments → `BadConfig`.
    pub async fn linked_repo(
        &self,
        organization_id: &str,
    ) -> std::result::Result<github::RepoRef, error::AppError> {
        let url = self
            .store
            .get_github(organization_id)
            .await?
            .ok_or_else(|| {
                error::AppError::NotConfigured(
                    "No GitHub repository linked to this organization".to_string(),
                )
            })?;
        github::RepoRef::parse(&url)
    }

    pub fn new(config: Config) -> Result<Self> {
        let store = store::Store::open(&config.database_path)?;
        let github = github::GithubClient::new(&config.github_api_url, config.github_token.clone());
        let generator = llm::Generator::new(
            &config.gemini_api_url,
            &config.gemini_api_key,
            &config.gemini_model,
        );
        Ok(Self {
            store,
            github,
            generator,
            config: Arc::new(config),
        })
    }
}

/// Build the application state and serve the API until the process exits.
pub async fn start_server(config: Config) -> Result<()> {
    let port = config.server_port;
    let state = AppState::new(config)?;
    let app = api::create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await.context("server error")
}
