//! Dev report cache controller.
//!
//! Per organization per day, decides whether the cached report is still
//! fresh (the recorded commit SHA matches GitHub's latest) or must be
//! regenerated. Regeneration covers commits since midnight UTC of the
//! current day and records the latest SHA as the new staleness cursor.

use chrono::{NaiveDate, Utc};

use crate::error::AppError;
use crate::llm::DevReport;
use crate::store::DevReportRecord;
use crate::AppState;

/// Return today's dev report for the organization, regenerating only when
/// the commit cursor says the cache is stale.
///
/// At most one store write per invocation: the report body and the new
/// cursor land together in a single (org, date) upsert.
pub async fn get_or_refresh(
    state: &AppState,
    organization_id: &str,
) -> Result<serde_json::Value, AppError> {
    let repo = state.linked_repo(organization_id).await?;

    let latest = state
        .github
        .latest_commit(&repo)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Repository {} has no commits", repo)))?;

    let today = Utc::now().date_naive();
    let cursor = state.store.last_commit_sha(organization_id).await?;

    if cursor.as_deref() == Some(latest.sha.as_str()) {
        if let Some(record) = state.store.get_dev_report(organization_id, today).await? {
            tracing::debug!(org = organization_id, sha = %latest.sha, "dev report cache hit");
            return Ok(record.report);
        }
        // Cursor matches but today has no record (e.g. the cursor was
        // written on a previous day and nothing changed since). The cursor
        // alone says nothing about today's cache, so regenerate.
        tracing::debug!(org = organization_id, "fresh cursor but no record for today");
    }

    let report = regenerate(state, organization_id, &repo, today, &latest.sha).await?;
    Ok(report)
}

async fn regenerate(
    state: &AppState,
    organization_id: &str,
    repo: &crate::github::RepoRef,
    today: NaiveDate,
    latest_sha: &str,
) -> Result<serde_json::Value, AppError> {
    // Window policy: strictly today (UTC midnight to now), matching the
    // per-day cache key.
    let start = today
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("invalid day start")))?
        .and_utc();
    let now = Utc::now();

    let commits = state.github.commits_between(repo, start, now).await?;
    let messages: Vec<&str> = commits.iter().map(|c| c.message.as_str()).collect();
    tracing::info!(
        org = organization_id,
        commits = messages.len(),
        "regenerating dev report"
    );

    let report: DevReport = state.generator.generate(&dev_report_prompt(&messages)).await?;
    let report = serde_json::to_value(&report)?;

    state
        .store
        .upsert_dev_report(DevReportRecord {
            organization_id: organization_id.to_string(),
            date: today,
            report: report.clone(),
            last_commit_sha: latest_sha.to_string(),
        })
        .await?;

    Ok(report)
}

fn dev_report_prompt(commit_messages: &[&str]) -> String {
    format!(
        "Generate a report of the following commit messages: {:?}\n\n\
         The report should have the following sections:\n\
         - Summary: A summary of the changes\n\
         - Changes: A list of the changes\n\
         - Issues: A list of the issues\n\
         - Suggestions: A list of the suggestions",
        commit_messages
    )
}
