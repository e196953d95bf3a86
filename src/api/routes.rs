//! API route definitions

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::{handlers, report_handlers};
use crate::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // ====================================================================
        // Organizations
        // ====================================================================
        .route("/create-organization", post(handlers::create_organization))
        .route("/get-organization/{user_id}", get(handlers::get_organization))
        .route("/get-key/{org_id}", get(handlers::get_key))
        .route("/get-github/{user_id}", get(handlers::get_github))
        .route("/set-github/{admin_id}", post(handlers::set_github))
        // ====================================================================
        // Users, applications and membership
        // ====================================================================
        .route("/create-user", post(handlers::create_user))
        .route("/apply-organization", post(handlers::apply_organization))
        .route("/applications/{admin_id}", get(handlers::get_applications))
        .route(
            "/update-application-status",
            post(handlers::update_application_status),
        )
        .route("/organization-members", post(handlers::create_member))
        .route(
            "/organizations/{organization_id}/members",
            get(handlers::get_members),
        )
        .route("/get-dev-team/{org_id}", get(handlers::get_dev_team))
        // ====================================================================
        // Product goals
        // ====================================================================
        .route(
            "/create-product-goals/{org_id}",
            post(handlers::create_product_goal),
        )
        .route(
            "/get-product-goals/{org_id}",
            get(handlers::get_product_goals),
        )
        // ====================================================================
        // Reports, documentation and analysis
        // ====================================================================
        .route(
            "/get-latest-dev-report/{user_id}",
            get(report_handlers::get_latest_dev_report),
        )
        .route(
            "/get-progress-report/{org_id}",
            get(report_handlers::get_progress_report),
        )
        .route(
            "/get-user-commits/{org_id}/{github_id}",
            get(report_handlers::get_user_commits),
        )
        .route(
            "/get-user-prs/{org_id}/{github_id}",
            get(report_handlers::get_user_prs),
        )
        .route(
            "/generate-documentation",
            post(report_handlers::generate_documentation),
        )
        .route(
            "/analyze-codebase/{user_id}",
            get(report_handlers::analyze_codebase),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
