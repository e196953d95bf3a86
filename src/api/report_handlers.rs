//! Report, documentation, activity and analysis handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::{analyzer, documentation, reports, AppState};

/// GET /get-latest-dev-report/{user_id}
pub async fn get_latest_dev_report(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let org = state
        .store
        .organization_for_user(&user_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("User is not affiliated with any organization".to_string())
        })?;
    let report = reports::dev_report::get_or_refresh(&state, &org.id).await?;
    Ok(Json(serde_json::json!({ "report": report })))
}

/// GET /get-progress-report/{org_id}
pub async fn get_progress_report(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .store
        .get_organization(&org_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Organization {} not found", org_id)))?;
    let reports = reports::progress::get_or_generate(&state, &org_id).await?;
    Ok(Json(serde_json::json!({ "reports": reports })))
}

/// GET /get-user-commits/{org_id}/{github_id}
pub async fn get_user_commits(
    State(state): State<AppState>,
    Path((org_id, github_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let repo = state.linked_repo(&org_id).await?;
    let commits = state.github.list_commits(&repo, Some(&github_id)).await?;
    Ok(Json(serde_json::json!({ "commits": commits })))
}

/// GET /get-user-prs/{org_id}/{github_id}
pub async fn get_user_prs(
    State(state): State<AppState>,
    Path((org_id, github_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let repo = state.linked_repo(&org_id).await?;
    let pulls = state.github.list_pulls(&repo).await?;
    let pulls: Vec<_> = pulls
        .into_iter()
        .filter(|pr| pr.author.as_deref() == Some(github_id.as_str()))
        .collect();
    Ok(Json(serde_json::json!({ "pull_requests": pulls })))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocTarget {
    Commit,
    Pr,
}

#[derive(Deserialize)]
pub struct DocumentationRequest {
    #[serde(rename = "type")]
    pub target: DocTarget,
    /// Commit SHA or pull request number, depending on `type`.
    pub id: String,
    /// Requester; resolves the organization and its linked repository.
    pub github_id: String,
}

/// POST /generate-documentation
pub async fn generate_documentation(
    State(state): State<AppState>,
    Json(req): Json<DocumentationRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let org = state
        .store
        .organization_for_user(&req.github_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("User is not affiliated with any organization".to_string())
        })?;
    let repo = state.linked_repo(&org.id).await?;

    let doc = match req.target {
        DocTarget::Commit => {
            let doc = documentation::document_commit(&state, &repo, &req.id).await?;
            serde_json::to_value(doc)?
        }
        DocTarget::Pr => {
            let number: u64 = req.id.parse().map_err(|_| {
                AppError::BadRequest(format!("Invalid pull request number: {}", req.id))
            })?;
            let doc = documentation::document_pr(&state, &repo, number).await?;
            serde_json::to_value(doc)?
        }
    };

    Ok(Json(serde_json::json!({ "documentation": doc })))
}

#[derive(Deserialize)]
pub struct AnalyzeQuery {
    pub query: String,
}

/// GET /analyze-codebase/{user_id}?query=...
pub async fn analyze_codebase(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<AnalyzeQuery>,
) -> Result<Json<analyzer::AnalyzeResult>, AppError> {
    if params.query.trim().is_empty() {
        return Err(AppError::BadRequest("Query must not be empty".to_string()));
    }
    let org = state
        .store
        .organization_for_user(&user_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("User is not affiliated with any organization".to_string())
        })?;
    let repo = state.linked_repo(&org.id).await?;
    let result = analyzer::analyze(&state, &repo, &params.query).await?;
    Ok(Json(result))
}
