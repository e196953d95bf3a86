//! Organization / user / application / goal handlers.

use axum::extract::{Path, State};
use axum::Json;
use base64::engine::general_purpose::URL_SAFE as BASE64_URL;
use base64::Engine;
use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::store::{
    ApplicationState, ApplicationStatus, Organization, OrganizationMember, ProductGoal, Role,
    User,
};
use crate::AppState;

// ============================================================================
// Health
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Organizations
// ============================================================================

#[derive(Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub image_url: Option<String>,
}

#[derive(Serialize)]
pub struct CreateOrganizationResponse {
    pub message: &'static str,
    /// The join key, returned once at creation time.
    pub key: String,
}

/// POST /create-organization
pub async fn create_organization(
    State(state): State<AppState>,
    Json(req): Json<CreateOrganizationRequest>,
) -> Result<Json<CreateOrganizationResponse>, AppError> {
    let key = generate_join_key();
    let org = Organization {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        description: req.description,
        owner_id: req.owner_id,
        key: key.clone(),
        image_url: req.image_url,
    };
    state.store.create_organization(org).await?;

    Ok(Json(CreateOrganizationResponse {
        message: "Organization created successfully",
        key,
    }))
}

/// GET /get-organization/{user_id}
pub async fn get_organization(
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
    Ok(Json(serde_json::json!({ "organization": org })))
}

/// GET /get-key/{org_id}
pub async fn get_key(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let org = state
        .store
        .get_organization(&org_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Organization {} not found", org_id)))?;
    Ok(Json(serde_json::json!({ "key": org.key })))
}

// ============================================================================
// GitHub link
// ============================================================================

/// GET /get-github/{user_id}
pub async fn get_github(
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
    let github_url = state.store.get_github(&org.id).await?.ok_or_else(|| {
        AppError::NotConfigured("No GitHub repository linked to this organization".to_string())
    })?;
    Ok(Json(serde_json::json!({ "github_url": github_url })))
}

#[derive(Deserialize)]
pub struct SetGithubRequest {
    pub github_url: String,
}

/// POST /set-github/{admin_id}
pub async fn set_github(
    State(state): State<AppState>,
    Path(admin_id): Path<String>,
    Json(req): Json<SetGithubRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let org = state
        .store
        .get_organization_by_owner(&admin_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No organization found for admin with ID {}", admin_id))
        })?;

    // Reject URLs that would break every report endpoint later
    crate::github::RepoRef::parse(&req.github_url)?;

    state.store.set_github(&org.id, &req.github_url).await?;
    Ok(Json(serde_json::json!({
        "message": "Organization GitHub set successfully"
    })))
}

// ============================================================================
// Users
// ============================================================================

/// POST /create-user
pub async fn create_user(
    State(state): State<AppState>,
    Json(user): Json<User>,
) -> Result<Json<serde_json::Value>, AppError> {
    let github_id = user.github_id.clone();
    state.store.upsert_user(user).await?;
    Ok(Json(serde_json::json!({
        "message": "User created successfully",
        "github_id": github_id
    })))
}

// ============================================================================
// Applications
// ============================================================================

#[derive(Deserialize)]
pub struct ApplyRequest {
    pub github_id: String,
    pub key: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

/// POST /apply-organization
///
/// Creates a pending application against the organization the join key
/// resolves to, auto-creating the user when all profile fields are present
/// and the user is unknown.
pub async fn apply_organization(
    State(state): State<AppState>,
    Json(req): Json<ApplyRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut existing = state.store.get_user(&req.github_id).await?;
    if existing.is_none() {
        if let Some(ref email) = req.email {
            existing = state.store.get_user_by_email(email).await?;
        }
    }
    if existing.is_none() {
        if let (Some(name), Some(email), Some(image)) = (&req.name, &req.email, &req.image) {
            state
                .store
                .upsert_user(User {
                    github_id: req.github_id.clone(),
                    name: name.clone(),
                    email: email.clone(),
                    image: image.clone(),
                })
                .await?;
        }
    }

    let org = state
        .store
        .get_organization_by_key(&req.key)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;

    state
        .store
        .insert_application(ApplicationStatus {
            id: Uuid::new_v4().to_string(),
            github_id: req.github_id,
            organization_id: org.id,
            status: ApplicationState::Pending,
        })
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Application status created successfully"
    })))
}

/// Application enriched with the applicant's profile for admin listings.
#[derive(Serialize)]
pub struct ApplicationView {
    pub id: String,
    pub github_id: String,
    pub organization_id: String,
    pub status: ApplicationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// GET /applications/{admin_id}
pub async fn get_applications(
    State(state): State<AppState>,
    Path(admin_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Some(org) = state.store.get_organization_by_owner(&admin_id).await? else {
        return Ok(Json(serde_json::json!({ "applications": [] })));
    };

    let applications = state.store.applications_for_org(&org.id).await?;
    let mut views = Vec::with_capacity(applications.len());
    for app in applications {
        let user = state.store.get_user(&app.github_id).await?;
        views.push(ApplicationView {
            id: app.id,
            github_id: app.github_id,
            organization_id: app.organization_id,
            status: app.status,
            name: user.as_ref().map(|u| u.name.clone()),
            image: user.map(|u| u.image),
        });
    }

    Ok(Json(serde_json::json!({ "applications": views })))
}

#[derive(Deserialize)]
pub struct UpdateApplicationRequest {
    pub application_id: String,
    pub status: ApplicationState,
    pub role: Option<Role>,
}

/// POST /update-application-status
///
/// Approval requires a role and creates the membership record; any decision
/// without that prerequisite leaves the store untouched.
pub async fn update_application_status(
    State(state): State<AppState>,
    Json(req): Json<UpdateApplicationRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let application = state
        .store
        .get_application(&req.application_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Application with ID {} not found",
                req.application_id
            ))
        })?;

    let role = match (req.status, req.role) {
        (ApplicationState::Approved, None) => {
            return Err(AppError::BadConfig(
                "Role is required when approving an application".to_string(),
            ))
        }
        (ApplicationState::Approved, Some(role)) => Some(role),
        (_, _) => None,
    };

    state
        .store
        .set_application_status(&req.application_id, req.status)
        .await?;

    if let Some(role) = role {
        state
            .store
            .insert_member(OrganizationMember {
                organization_id: application.organization_id,
                github_id: application.github_id,
                role,
            })
            .await?;
    }

    Ok(Json(serde_json::json!({
        "message": "Application status updated successfully"
    })))
}

// ============================================================================
// Members
// ============================================================================

/// POST /organization-members
pub async fn create_member(
    State(state): State<AppState>,
    Json(member): Json<OrganizationMember>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.insert_member(member).await?;
    Ok(Json(serde_json::json!({
        "message": "Organization member created successfully"
    })))
}

/// GET /organizations/{organization_id}/members
pub async fn get_members(
    State(state): State<AppState>,
    Path(organization_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let members = state.store.members_of(&organization_id).await?;
    Ok(Json(serde_json::json!({ "members": members })))
}

/// Member joined with the user profile, for team views.
#[derive(Serialize)]
pub struct TeamMemberView {
    pub github_id: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// GET /get-dev-team/{org_id}
pub async fn get_dev_team(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let members = state.store.members_of(&org_id).await?;
    let mut team = Vec::with_capacity(members.len());
    for member in members {
        let user = state.store.get_user(&member.github_id).await?;
        team.push(TeamMemberView {
            github_id: member.github_id,
            role: member.role,
            name: user.as_ref().map(|u| u.name.clone()),
            image: user.map(|u| u.image),
        });
    }
    Ok(Json(serde_json::json!({ "members": team })))
}

// ============================================================================
// Product goals
// ============================================================================

#[derive(Deserialize)]
pub struct CreateGoalRequest {
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub due_date: Option<String>,
    pub assignee: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// POST /create-product-goals/{org_id}
pub async fn create_product_goal(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(req): Json<CreateGoalRequest>,
) -> Result<Json<ProductGoal>, AppError> {
    let goal = ProductGoal {
        id: Uuid::new_v4().to_string(),
        organization_id: org_id,
        title: req.title,
        description: req.description,
        status: req.status,
        priority: req.priority,
        due_date: req.due_date,
        assignee: req.assignee,
        tags: req.tags,
        created_at: Utc::now(),
    };
    state.store.insert_goal(goal.clone()).await?;
    Ok(Json(goal))
}

/// GET /get-product-goals/{org_id}
pub async fn get_product_goals(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let goals = state.store.goals_of(&org_id).await?;
    Ok(Json(serde_json::json!({ "goals": goals })))
}

// ============================================================================
// Utilities
// ============================================================================

/// 32 random bytes, URL-safe base64. Same shape as a Fernet key, which is
/// what the join key historically was.
fn generate_join_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE64_URL.encode(bytes)
}
