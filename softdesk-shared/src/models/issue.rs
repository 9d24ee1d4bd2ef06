//! Issue model and database operations
//!
//! # Status
//!
//! ```text
//! TODO ⇄ IN_PROGRESS ⇄ FINISHED
//! ```
//!
//! Status is a label, not a workflow gate: any authorized update may set any
//! value, so there is no transition table.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE issue_priority AS ENUM ('LOW', 'MEDIUM', 'HIGH');
//! CREATE TYPE issue_label AS ENUM ('BUG', 'FEATURE', 'TASK');
//! CREATE TYPE issue_status AS ENUM ('TODO', 'IN_PROGRESS', 'FINISHED');
//!
//! CREATE TABLE issues (
//!     id BIGSERIAL PRIMARY KEY,
//!     title VARCHAR(128) NOT NULL,
//!     description TEXT,
//!     project_id BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
//!     author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     assignee_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
//!     priority issue_priority NOT NULL,
//!     label issue_label NOT NULL,
//!     status issue_status NOT NULL DEFAULT 'TODO',
//!     created_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

const ISSUE_COLUMNS: &str = "id, title, description, project_id, author_id, assignee_id, \
     priority, label, status, created_time";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "issue_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuePriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "issue_label", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueLabel {
    Bug,
    Feature,
    Task,
}

/// Progress of an issue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "issue_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    #[default]
    Todo,
    InProgress,
    Finished,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Todo => "TODO",
            IssueStatus::InProgress => "IN_PROGRESS",
            IssueStatus::Finished => "FINISHED",
        }
    }
}

/// Issue filed against a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Issue {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,

    /// Owning project (immutable)
    pub project_id: i64,

    /// Author (immutable)
    pub author_id: i64,

    /// User responsible for the issue; must be a contributor of the project
    pub assignee_id: Option<i64>,

    pub priority: IssuePriority,
    pub label: IssueLabel,
    pub status: IssueStatus,
    pub created_time: DateTime<Utc>,
}

/// Input for creating an issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIssue {
    pub title: String,
    pub description: Option<String>,
    pub project_id: i64,
    pub author_id: i64,
    pub assignee_id: Option<i64>,
    pub priority: IssuePriority,
    pub label: IssueLabel,
    pub status: IssueStatus,
}

/// Input for updating an issue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateIssue {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub assignee_id: Option<Option<i64>>,
    pub priority: Option<IssuePriority>,
    pub label: Option<IssueLabel>,
    pub status: Option<IssueStatus>,
}

impl UpdateIssue {
    pub fn apply(self, issue: &mut Issue) {
        if let Some(title) = self.title {
            issue.title = title;
        }
        if let Some(description) = self.description {
            issue.description = description;
        }
        if let Some(assignee_id) = self.assignee_id {
            issue.assignee_id = assignee_id;
        }
        if let Some(priority) = self.priority {
            issue.priority = priority;
        }
        if let Some(label) = self.label {
            issue.label = label;
        }
        if let Some(status) = self.status {
            issue.status = status;
        }
    }
}

/// Filters for listing a project's issues
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueFilter {
    pub priority: Option<IssuePriority>,
    pub label: Option<IssueLabel>,
    pub status: Option<IssueStatus>,
    pub assignee_id: Option<i64>,
}

impl IssueFilter {
    pub fn matches(&self, issue: &Issue) -> bool {
        self.priority.map_or(true, |p| issue.priority == p)
            && self.label.map_or(true, |l| issue.label == l)
            && self.status.map_or(true, |s| issue.status == s)
            && self
                .assignee_id
                .map_or(true, |a| issue.assignee_id == Some(a))
    }
}

impl Issue {
    /// True when `user_id` is the assignee
    pub fn is_assigned_to(&self, user_id: i64) -> bool {
        self.assignee_id == Some(user_id)
    }

    /// Creates an issue
    pub async fn create(pool: &PgPool, data: CreateIssue) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Issue>(&format!(
            r#"
            INSERT INTO issues (title, description, project_id, author_id, assignee_id,
                                priority, label, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ISSUE_COLUMNS}
            "#
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.project_id)
        .bind(data.author_id)
        .bind(data.assignee_id)
        .bind(data.priority)
        .bind(data.label)
        .bind(data.status)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Issue>(&format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a project's issues, newest first
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: i64,
        filter: &IssueFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE project_id = "
        ));
        query.push_bind(project_id);

        if let Some(priority) = filter.priority {
            query.push(" AND priority = ").push_bind(priority);
        }
        if let Some(label) = filter.label {
            query.push(" AND label = ").push_bind(label);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(assignee_id) = filter.assignee_id {
            query.push(" AND assignee_id = ").push_bind(assignee_id);
        }
        query.push(" ORDER BY created_time DESC, id DESC");

        query.build_query_as::<Issue>().fetch_all(pool).await
    }

    /// Updates an issue
    ///
    /// # Returns
    ///
    /// The updated issue, or `None` if it does not exist
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateIssue,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let current = sqlx::query_as::<_, Issue>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut issue) = current else {
            return Ok(None);
        };
        data.apply(&mut issue);

        let updated = sqlx::query_as::<_, Issue>(&format!(
            r#"
            UPDATE issues
            SET title = $2, description = $3, assignee_id = $4, priority = $5,
                label = $6, status = $7
            WHERE id = $1
            RETURNING {ISSUE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(issue.title)
        .bind(issue.description)
        .bind(issue.assignee_id)
        .bind(issue.priority)
        .bind(issue.label)
        .bind(issue.status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    /// Deletes an issue; its comments cascade
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM issues WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts a project's issues
    pub async fn count_by_project(pool: &PgPool, project_id: i64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM issues WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_issue() -> Issue {
        Issue {
            id: 3,
            title: "Bug A".to_string(),
            description: None,
            project_id: 7,
            author_id: 1,
            assignee_id: Some(2),
            priority: IssuePriority::High,
            label: IssueLabel::Bug,
            status: IssueStatus::default(),
            created_time: Utc::now(),
        }
    }

    #[test]
    fn test_status_default_and_wire_format() {
        assert_eq!(IssueStatus::default(), IssueStatus::Todo);
        assert_eq!(
            serde_json::to_value(IssueStatus::InProgress).unwrap(),
            serde_json::json!("IN_PROGRESS")
        );
        assert_eq!(IssueStatus::Todo.as_str(), "TODO");
    }

    #[test]
    fn test_status_is_unconstrained() {
        let mut issue = sample_issue();
        issue.status = IssueStatus::Finished;

        UpdateIssue {
            status: Some(IssueStatus::Todo),
            ..Default::default()
        }
        .apply(&mut issue);

        assert_eq!(issue.status, IssueStatus::Todo);
    }

    #[test]
    fn test_update_clears_assignee() {
        let mut issue = sample_issue();
        UpdateIssue {
            assignee_id: Some(None),
            ..Default::default()
        }
        .apply(&mut issue);

        assert_eq!(issue.assignee_id, None);
        assert_eq!(issue.project_id, 7);
    }

    #[test]
    fn test_issue_filter() {
        let issue = sample_issue();
        assert!(IssueFilter {
            priority: Some(IssuePriority::High),
            assignee_id: Some(2),
            ..Default::default()
        }
        .matches(&issue));
        assert!(!IssueFilter {
            label: Some(IssueLabel::Task),
            ..Default::default()
        }
        .matches(&issue));
        assert!(issue.is_assigned_to(2));
        assert!(!issue.is_assigned_to(1));
    }
}
