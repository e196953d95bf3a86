//! Persisted entity types, one per store collection.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Member role within an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Developer,
}

/// Application lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationState {
    Pending,
    Approved,
    Rejected,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Developer => "developer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "developer" => Some(Role::Developer),
            _ => None,
        }
    }
}

impl ApplicationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationState::Pending => "pending",
            ApplicationState::Approved => "approved",
            ApplicationState::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ApplicationState::Pending),
            "approved" => Some(ApplicationState::Approved),
            "rejected" => Some(ApplicationState::Rejected),
            _ => None,
        }
    }
}

/// A tenant unit owning members, a linked repository, goals, and reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub description: String,
    /// GitHub id of the owner. The owner is implicitly an admin member.
    pub owner_id: String,
    /// Shared join secret, distributed out-of-band. Unique across orgs.
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// One role per (organization, member) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationMember {
    pub organization_id: String,
    pub github_id: String,
    pub role: Role,
}

/// A user, keyed by their external GitHub id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub github_id: String,
    pub name: String,
    pub email: String,
    pub image: String,
}

/// A pending/decided membership request linking a user to an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationStatus {
    pub id: String,
    pub github_id: String,
    pub organization_id: String,
    pub status: ApplicationState,
}

/// A product goal tracked for progress reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductGoal {
    pub id: String,
    pub organization_id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Cached dev report, one per (organization, calendar date).
///
/// `last_commit_sha` is the staleness cursor: when GitHub's latest commit
/// still matches it, the cached report is served without regeneration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevReportRecord {
    pub organization_id: String,
    pub date: NaiveDate,
    pub report: serde_json::Value,
    pub last_commit_sha: String,
}

/// Cached per-goal progress batch, one per (organization, calendar date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReportRecord {
    pub organization_id: String,
    pub date: NaiveDate,
    pub reports: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let r: Role = serde_json::from_str("\"developer\"").unwrap();
        assert_eq!(r, Role::Developer);
    }

    #[test]
    fn test_application_state_roundtrip() {
        for (state, text) in [
            (ApplicationState::Pending, "\"pending\""),
            (ApplicationState::Approved, "\"approved\""),
            (ApplicationState::Rejected, "\"rejected\""),
        ] {
            assert_eq!(serde_json::to_string(&state).unwrap(), text);
            let parsed: ApplicationState = serde_json::from_str(text).unwrap();
            assert_eq!(parsed, state);
        }
    }

    #[test]
    fn test_organization_optional_image_omitted() {
        let org = Organization {
            id: "o1".into(),
            name: "Acme".into(),
            description: "desc".into(),
            owner_id: "alice".into(),
            key: "k".into(),
            image_url: None,
        };
        let json = serde_json::to_value(&org).unwrap();
        assert!(json.get("image_url").is_none());
    }
}
