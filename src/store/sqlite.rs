//! SQLite-backed document store.
//!
//! One table per collection, entity bodies persisted as JSON with the
//! handful of columns we query on pulled out alongside. Synchronous
//! rusqlite calls run on the blocking pool via `tokio::task::spawn_blocking`
//! so handlers never block the async runtime.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{
    ApplicationState, ApplicationStatus, DevReportRecord, Organization, OrganizationMember,
    ProductGoal, ProgressReportRecord, Role, User,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS organizations (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    join_key TEXT NOT NULL UNIQUE,
    body TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS organization_members (
    organization_id TEXT NOT NULL,
    github_id TEXT NOT NULL,
    role TEXT NOT NULL,
    PRIMARY KEY (organization_id, github_id)
);
CREATE TABLE IF NOT EXISTS users (
    github_id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    body TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS application_statuses (
    id TEXT PRIMARY KEY,
    github_id TEXT NOT NULL,
    organization_id TEXT NOT NULL,
    status TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS organization_githubs (
    organization_id TEXT PRIMARY KEY,
    github_url TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS product_goals (
    id TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL,
    body TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS dev_reports (
    organization_id TEXT NOT NULL,
    date TEXT NOT NULL,
    report TEXT NOT NULL,
    last_commit_sha TEXT NOT NULL,
    PRIMARY KEY (organization_id, date)
);
CREATE TABLE IF NOT EXISTS progress_reports (
    organization_id TEXT NOT NULL,
    date TEXT NOT NULL,
    reports TEXT NOT NULL,
    PRIMARY KEY (organization_id, date)
);
"#;

/// Document store shared across handlers.
///
/// Cheaply cloneable; all clones share one connection. SQLite gives
/// per-statement atomicity, which is all the data model requires (no
/// multi-document transactions).
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database at `path` and initialize the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create store directory {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        Self::from_connection(conn)
    }

    /// Open an ephemeral in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).context("initialize schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a synchronous closure against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| anyhow!("store mutex poisoned"))?;
            f(&conn)
        })
        .await
        .context("store task join")?
    }

    // ========================================================================
    // Organizations
    // ========================================================================

    /// Insert an organization and its owner's implicit admin membership.
    pub async fn create_organization(&self, org: Organization) -> Result<()> {
        self.with_conn(move |conn| {
            let body = serde_json::to_string(&org)?;
            conn.execute(
                "INSERT INTO organizations (id, owner_id, join_key, body) VALUES (?1, ?2, ?3, ?4)",
                params![org.id, org.owner_id, org.key, body],
            )?;
            conn.execute(
                "INSERT INTO organization_members (organization_id, github_id, role)
                 VALUES (?1, ?2, 'admin')",
                params![org.id, org.owner_id],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_organization(&self, id: &str) -> Result<Option<Organization>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            query_org(conn, "SELECT body FROM organizations WHERE id = ?1", &id)
        })
        .await
    }

    pub async fn get_organization_by_owner(&self, owner_id: &str) -> Result<Option<Organization>> {
        let owner_id = owner_id.to_string();
        self.with_conn(move |conn| {
            query_org(
                conn,
                "SELECT body FROM organizations WHERE owner_id = ?1",
                &owner_id,
            )
        })
        .await
    }

    pub async fn get_organization_by_key(&self, key: &str) -> Result<Option<Organization>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            query_org(
                conn,
                "SELECT body FROM organizations WHERE join_key = ?1",
                &key,
            )
        })
        .await
    }

    /// Resolve the organization a user belongs to: owner first, then any
    /// membership record.
    pub async fn organization_for_user(&self, github_id: &str) -> Result<Option<Organization>> {
        let github_id = github_id.to_string();
        self.with_conn(move |conn| {
            if let Some(org) = query_org(
                conn,
                "SELECT body FROM organizations WHERE owner_id = ?1",
                &github_id,
            )? {
                return Ok(Some(org));
            }
            let org_id: Option<String> = conn
                .query_row(
                    "SELECT organization_id FROM organization_members WHERE github_id = ?1",
                    params![github_id],
                    |row| row.get(0),
                )
                .optional()?;
            match org_id {
                Some(org_id) => {
                    query_org(conn, "SELECT body FROM organizations WHERE id = ?1", &org_id)
                }
                None => Ok(None),
            }
        })
        .await
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Store a user keyed by external GitHub id. Re-storing replaces.
    pub async fn upsert_user(&self, user: User) -> Result<()> {
        self.with_conn(move |conn| {
            let body = serde_json::to_string(&user)?;
            conn.execute(
                "INSERT OR REPLACE INTO users (github_id, email, body) VALUES (?1, ?2, ?3)",
                params![user.github_id, user.email, body],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_user(&self, github_id: &str) -> Result<Option<User>> {
        let github_id = github_id.to_string();
        self.with_conn(move |conn| {
            let body: Option<String> = conn
                .query_row(
                    "SELECT body FROM users WHERE github_id = ?1",
                    params![github_id],
                    |row| row.get(0),
                )
                .optional()?;
            body.map(|b| serde_json::from_str(&b).context("corrupt user body"))
                .transpose()
        })
        .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            let body: Option<String> = conn
                .query_row(
                    "SELECT body FROM users WHERE email = ?1",
                    params![email],
                    |row| row.get(0),
                )
                .optional()?;
            body.map(|b| serde_json::from_str(&b).context("corrupt user body"))
                .transpose()
        })
        .await
    }

    // ========================================================================
    // Members
    // ========================================================================

    pub async fn insert_member(&self, member: OrganizationMember) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO organization_members (organization_id, github_id, role)
                 VALUES (?1, ?2, ?3)",
                params![member.organization_id, member.github_id, member.role.as_str()],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn members_of(&self, organization_id: &str) -> Result<Vec<OrganizationMember>> {
        let organization_id = organization_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT organization_id, github_id, role FROM organization_members
                 WHERE organization_id = ?1",
            )?;
            let rows = stmt.query_map(params![organization_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            let mut members = Vec::new();
            for row in rows {
                let (organization_id, github_id, role) = row?;
                let role = Role::parse(&role)
                    .ok_or_else(|| anyhow!("unknown member role '{}'", role))?;
                members.push(OrganizationMember {
                    organization_id,
                    github_id,
                    role,
                });
            }
            Ok(members)
        })
        .await
    }

    // ========================================================================
    // Applications
    // ========================================================================

    pub async fn insert_application(&self, application: ApplicationStatus) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO application_statuses (id, github_id, organization_id, status)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    application.id,
                    application.github_id,
                    application.organization_id,
                    application.status.as_str()
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_application(&self, id: &str) -> Result<Option<ApplicationStatus>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, github_id, organization_id, status FROM application_statuses
                 WHERE id = ?1",
                params![id],
                application_from_row,
            )
            .optional()
            .map_err(Into::into)
        })
        .await
    }

    pub async fn applications_for_org(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ApplicationStatus>> {
        let organization_id = organization_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, github_id, organization_id, status FROM application_statuses
                 WHERE organization_id = ?1",
            )?;
            let rows = stmt.query_map(params![organization_id], application_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Into::into)
        })
        .await
    }

    pub async fn set_application_status(&self, id: &str, status: ApplicationState) -> Result<()> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE application_statuses SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )?;
            Ok(())
        })
        .await
    }

    // ========================================================================
    // GitHub links
    // ========================================================================

    /// Link a repository URL to an organization. One-to-one, latest wins.
    pub async fn set_github(&self, organization_id: &str, github_url: &str) -> Result<()> {
        let organization_id = organization_id.to_string();
        let github_url = github_url.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO organization_githubs (organization_id, github_url) VALUES (?1, ?2)
                 ON CONFLICT(organization_id) DO UPDATE SET github_url = excluded.github_url",
                params![organization_id, github_url],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_github(&self, organization_id: &str) -> Result<Option<String>> {
        let organization_id = organization_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT github_url FROM organization_githubs WHERE organization_id = ?1",
                params![organization_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
        })
        .await
    }

    // ========================================================================
    // Product goals
    // ========================================================================

    pub async fn insert_goal(&self, goal: ProductGoal) -> Result<()> {
        self.with_conn(move |conn| {
            let body = serde_json::to_string(&goal)?;
            conn.execute(
                "INSERT INTO product_goals (id, organization_id, body) VALUES (?1, ?2, ?3)",
                params![goal.id, goal.organization_id, body],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn goals_of(&self, organization_id: &str) -> Result<Vec<ProductGoal>> {
        let organization_id = organization_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt =
                conn.prepare("SELECT body FROM product_goals WHERE organization_id = ?1")?;
            let rows = stmt.query_map(params![organization_id], |row| row.get::<_, String>(0))?;
            let mut goals = Vec::new();
            for body in rows {
                goals.push(serde_json::from_str(&body?).context("corrupt goal body")?);
            }
            Ok(goals)
        })
        .await
    }

    // ========================================================================
    // Dev reports (cache + staleness cursor)
    // ========================================================================

    pub async fn get_dev_report(
        &self,
        organization_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DevReportRecord>> {
        let organization_id = organization_id.to_string();
        self.with_conn(move |conn| {
            let row: Option<(String, String)> = conn
                .query_row(
                    "SELECT report, last_commit_sha FROM dev_reports
                     WHERE organization_id = ?1 AND date = ?2",
                    params![organization_id, date.to_string()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            match row {
                Some((report, last_commit_sha)) => Ok(Some(DevReportRecord {
                    organization_id,
                    date,
                    report: serde_json::from_str(&report).context("corrupt report body")?,
                    last_commit_sha,
                })),
                None => Ok(None),
            }
        })
        .await
    }

    /// Most recently recorded commit SHA for an organization, across all
    /// report dates. Absent until the first report is generated.
    pub async fn last_commit_sha(&self, organization_id: &str) -> Result<Option<String>> {
        let organization_id = organization_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT last_commit_sha FROM dev_reports WHERE organization_id = ?1
                 ORDER BY date DESC LIMIT 1",
                params![organization_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
        })
        .await
    }

    /// Upsert keyed by (org, date); report body and cursor land in one write.
    pub async fn upsert_dev_report(&self, record: DevReportRecord) -> Result<()> {
        self.with_conn(move |conn| {
            let report = serde_json::to_string(&record.report)?;
            conn.execute(
                "INSERT INTO dev_reports (organization_id, date, report, last_commit_sha)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(organization_id, date) DO UPDATE SET
                     report = excluded.report,
                     last_commit_sha = excluded.last_commit_sha",
                params![
                    record.organization_id,
                    record.date.to_string(),
                    report,
                    record.last_commit_sha
                ],
            )?;
            Ok(())
        })
        .await
    }

    // ========================================================================
    // Progress reports
    // ========================================================================

    pub async fn get_progress_report(
        &self,
        organization_id: &str,
        date: NaiveDate,
    ) -> Result<Option<ProgressReportRecord>> {
        let organization_id = organization_id.to_string();
        self.with_conn(move |conn| {
            let reports: Option<String> = conn
                .query_row(
                    "SELECT reports FROM progress_reports
                     WHERE organization_id = ?1 AND date = ?2",
                    params![organization_id, date.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            match reports {
                Some(reports) => Ok(Some(ProgressReportRecord {
                    organization_id,
                    date,
                    reports: serde_json::from_str(&reports).context("corrupt batch body")?,
                })),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn upsert_progress_report(&self, record: ProgressReportRecord) -> Result<()> {
        self.with_conn(move |conn| {
            let reports = serde_json::to_string(&record.reports)?;
            conn.execute(
                "INSERT INTO progress_reports (organization_id, date, reports)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(organization_id, date) DO UPDATE SET reports = excluded.reports",
                params![record.organization_id, record.date.to_string(), reports],
            )?;
            Ok(())
        })
        .await
    }
}

fn query_org(conn: &Connection, sql: &str, param: &str) -> Result<Option<Organization>> {
    let body: Option<String> = conn
        .query_row(sql, params![param], |row| row.get(0))
        .optional()?;
    body.map(|b| serde_json::from_str(&b).context("corrupt organization body"))
        .transpose()
}

fn application_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApplicationStatus> {
    let status: String = row.get(3)?;
    let status = ApplicationState::parse(&status).unwrap_or(ApplicationState::Pending);
    Ok(ApplicationStatus {
        id: row.get(0)?,
        github_id: row.get(1)?,
        organization_id: row.get(2)?,
        status,
    })
}
