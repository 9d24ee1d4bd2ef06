//! Project model and database operations
//!
//! A project is the root of the resource hierarchy: it owns contributors and
//! issues, and issues own comments. Creating a project also creates the
//! author's contributor row in the same transaction, so the author is always
//! a member of their own project.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE project_type AS ENUM ('BACKEND', 'FRONTEND', 'IOS', 'ANDROID');
//!
//! CREATE TABLE projects (
//!     id BIGSERIAL PRIMARY KEY,
//!     name VARCHAR(128) NOT NULL UNIQUE,
//!     type project_type NOT NULL,
//!     description TEXT,
//!     author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     created_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::contributor::Contributor;

const PROJECT_COLUMNS: &str = "p.id, p.name, p.type, p.description, p.author_id, p.created_time";

/// Platform a project targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectType {
    Backend,
    Frontend,
    Ios,
    Android,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Backend => "BACKEND",
            ProjectType::Frontend => "FRONTEND",
            ProjectType::Ios => "IOS",
            ProjectType::Android => "ANDROID",
        }
    }
}

/// Project owned by its author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Sequential project ID
    pub id: i64,

    /// Unique project name
    pub name: String,

    /// Target platform
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub project_type: ProjectType,

    pub description: Option<String>,

    /// Author (immutable after creation)
    pub author_id: i64,

    pub created_time: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub project_type: ProjectType,
    pub description: Option<String>,
    pub author_id: i64,
}

/// Input for updating a project
///
/// The author is deliberately absent: it never changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub project_type: Option<ProjectType>,
    pub description: Option<Option<String>>,
}

impl UpdateProject {
    pub fn apply(self, project: &mut Project) {
        if let Some(name) = self.name {
            project.name = name;
        }
        if let Some(project_type) = self.project_type {
            project.project_type = project_type;
        }
        if let Some(description) = self.description {
            project.description = description;
        }
    }
}

/// Filters for listing projects
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFilter {
    pub id: Option<i64>,
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub project_type: Option<ProjectType>,

    /// Username of the project author
    pub author_username: Option<String>,

    /// Restricts the listing to projects this user contributes to
    ///
    /// Set by the API from the caller's identity, never from the query string.
    #[serde(skip)]
    pub member_id: Option<i64>,
}

impl ProjectFilter {
    /// Checks the column filters (everything except the joins on users and
    /// contributors, which the caller resolves)
    pub fn matches_columns(&self, project: &Project) -> bool {
        self.id.map_or(true, |id| project.id == id)
            && self.name.as_deref().map_or(true, |name| project.name == name)
            && self
                .project_type
                .map_or(true, |project_type| project.project_type == project_type)
    }
}

impl Project {
    /// Creates a project and the author's contributor row atomically
    ///
    /// # Returns
    ///
    /// The new project together with the author's contributor record
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken (unique constraint violation),
    /// the author does not exist, or the database is unreachable. Nothing is
    /// written in that case.
    pub async fn create(
        pool: &PgPool,
        data: CreateProject,
    ) -> Result<(Self, Contributor), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, type, description, author_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, type, description, author_id, created_time
            "#,
        )
        .bind(data.name)
        .bind(data.project_type)
        .bind(data.description)
        .bind(data.author_id)
        .fetch_one(&mut *tx)
        .await?;

        let contributor = sqlx::query_as::<_, Contributor>(
            r#"
            INSERT INTO contributors (project_id, user_id)
            VALUES ($1, $2)
            RETURNING id, project_id, user_id, created_time
            "#,
        )
        .bind(project.id)
        .bind(project.author_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((project, contributor))
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a project by its unique name
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.name = $1"
        ))
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Lists projects matching a filter, newest first
    pub async fn list(pool: &PgPool, filter: &ProjectFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p JOIN users u ON u.id = p.author_id WHERE TRUE"
        ));

        if let Some(id) = filter.id {
            query.push(" AND p.id = ").push_bind(id);
        }
        if let Some(name) = &filter.name {
            query.push(" AND p.name = ").push_bind(name.clone());
        }
        if let Some(project_type) = filter.project_type {
            query.push(" AND p.type = ").push_bind(project_type);
        }
        if let Some(username) = &filter.author_username {
            query.push(" AND u.username = ").push_bind(username.clone());
        }
        if let Some(member_id) = filter.member_id {
            query
                .push(" AND EXISTS (SELECT 1 FROM contributors c WHERE c.project_id = p.id AND c.user_id = ")
                .push_bind(member_id)
                .push(")");
        }
        query.push(" ORDER BY p.created_time DESC, p.id DESC");

        query.build_query_as::<Project>().fetch_all(pool).await
    }

    /// Updates a project
    ///
    /// # Returns
    ///
    /// The updated project, or `None` if it does not exist
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let current = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut project) = current else {
            return Ok(None);
        };
        data.apply(&mut project);

        let updated = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = $2, type = $3, description = $4
            WHERE id = $1
            RETURNING id, name, type, description, author_id, created_time
            "#,
        )
        .bind(id)
        .bind(project.name)
        .bind(project.project_type)
        .bind(project.description)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    /// Deletes a project
    ///
    /// Contributors, issues and (through issues) comments cascade.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project() -> Project {
        Project {
            id: 7,
            name: "SoftDesk".to_string(),
            project_type: ProjectType::Backend,
            description: None,
            author_id: 1,
            created_time: Utc::now(),
        }
    }

    #[test]
    fn test_project_type_serde() {
        assert_eq!(
            serde_json::to_value(ProjectType::Frontend).unwrap(),
            serde_json::json!("FRONTEND")
        );
        let parsed: ProjectType = serde_json::from_str("\"IOS\"").unwrap();
        assert_eq!(parsed, ProjectType::Ios);
        assert!(serde_json::from_str::<ProjectType>("\"ios\"").is_err());
    }

    #[test]
    fn test_project_serializes_type_key() {
        let json = serde_json::to_value(sample_project()).unwrap();
        assert_eq!(json["type"], "BACKEND");
        assert!(json.get("project_type").is_none());
    }

    #[test]
    fn test_update_keeps_author() {
        let mut project = sample_project();
        UpdateProject {
            name: Some("Renamed".to_string()),
            description: Some(Some("text".to_string())),
            ..Default::default()
        }
        .apply(&mut project);

        assert_eq!(project.name, "Renamed");
        assert_eq!(project.description.as_deref(), Some("text"));
        assert_eq!(project.author_id, 1);
    }

    #[test]
    fn test_filter_matches_columns() {
        let project = sample_project();
        assert!(ProjectFilter::default().matches_columns(&project));
        assert!(ProjectFilter {
            project_type: Some(ProjectType::Backend),
            ..Default::default()
        }
        .matches_columns(&project));
        assert!(!ProjectFilter {
            id: Some(8),
            ..Default::default()
        }
        .matches_columns(&project));
    }
}
