//! Progress report assembler.
//!
//! For every goal of an organization, asks the generator to compare expected
//! vs. confirmed progress against the full commit and PR history, and caches
//! the whole batch for the day. A batch cached for today is returned verbatim;
//! there is no partial refresh, and a failure on any goal aborts the batch.

use chrono::Utc;

use crate::error::AppError;
use crate::github::{CommitRecord, PullRecord};
use crate::llm::GoalProgress;
use crate::store::{ProductGoal, ProgressReportRecord};
use crate::AppState;

pub async fn get_or_generate(
    state: &AppState,
    organization_id: &str,
) -> Result<Vec<serde_json::Value>, AppError> {
    let today = Utc::now().date_naive();
    if let Some(batch) = state
        .store
        .get_progress_report(organization_id, today)
        .await?
    {
        tracing::debug!(org = organization_id, "progress batch cache hit");
        return Ok(batch.reports);
    }

    let repo = state.linked_repo(organization_id).await?;
    let commits = state.github.list_commits(&repo, None).await?;
    let pulls = state.github.list_pulls(&repo).await?;
    let goals = state.store.goals_of(organization_id).await?;

    tracing::info!(
        org = organization_id,
        goals = goals.len(),
        commits = commits.len(),
        pulls = pulls.len(),
        "generating progress batch"
    );

    let mut reports = Vec::with_capacity(goals.len());
    for goal in &goals {
        let mut progress: GoalProgress = state
            .generator
            .generate(&progress_prompt(goal, &commits, &pulls))
            .await?;
        progress.goal_id = goal.id.clone();
        reports.push(serde_json::to_value(&progress)?);
    }

    state
        .store
        .upsert_progress_report(ProgressReportRecord {
            organization_id: organization_id.to_string(),
            date: today,
            reports: reports.clone(),
        })
        .await?;

    Ok(reports)
}

fn progress_prompt(goal: &ProductGoal, commits: &[CommitRecord], pulls: &[PullRecord]) -> String {
    let commit_lines: Vec<&str> = commits.iter().map(|c| c.message.as_str()).collect();
    let pull_lines: Vec<String> = pulls
        .iter()
        .map(|p| format!("{}: {}", p.title, p.description))
        .collect();

    format!(
        "You are a helpful assistant that generates a progress report for a \
         given goal from commits and PRs.\n\
         The goal is {}\n\
         The description is {}\n\n\
         Commit messages:\n{:?}\n\n\
         Pull requests (title: description):\n{:?}\n\n\
         Assess the expected progress toward the goal and the progress the \
         commits and PRs actually confirm.",
        goal.title, goal.description, commit_lines, pull_lines
    )
}
