//! Structured response types the generator is asked to produce.

use serde::{Deserialize, Serialize};

/// Daily dev report built from commit messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevReport {
    pub summary: String,
    pub changes: Vec<String>,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Expected-vs-confirmed progress assessment for a single goal.
///
/// `goal_id` is filled in by the assembler after generation; the generator
/// itself only sees the goal text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalProgress {
    #[serde(default)]
    pub goal_id: String,
    pub expected_progress: String,
    pub confirmed_progress: String,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Structured documentation for a single commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDocumentation {
    pub summary: String,
    pub purpose: String,
    pub technical_details: String,
    pub impact: String,
    pub testing_recommendations: String,
    pub html_content: String,
}

/// Structured documentation for a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrDocumentation {
    pub summary: String,
    pub purpose: String,
    pub technical_details: String,
    pub impact: String,
    pub testing_considerations: String,
    pub review_checklist: Vec<String>,
    pub risks: Vec<String>,
    pub html_content: String,
}

/// Shortlist / relevance verdict for codebase analysis.
///
/// Used twice: once over the repository tree (where `code_snippets` carries
/// candidate file paths) and once per file (where only the score and
/// explanation matter).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeAnalysis {
    pub relevance_score: f64,
    pub explanation: String,
    #[serde(default)]
    pub code_snippets: Vec<String>,
}

/// Final synthesized answer for a codebase query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodebaseAnalysis {
    pub answer: String,
    pub confidence: f64,
    pub sources: Vec<String>,
}
