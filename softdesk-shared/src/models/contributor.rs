//! Contributor model: project membership
//!
//! A contributor row binds a user to a project and is the only source of
//! project visibility for non-admin users. Pairs are unique.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE contributors (
//!     id BIGSERIAL PRIMARY KEY,
//!     project_id BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
//!     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     created_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     CONSTRAINT contributors_project_user_key UNIQUE (project_id, user_id)
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::project::Project;

/// Membership of a user in a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contributor {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub created_time: DateTime<Utc>,
}

impl Contributor {
    /// True when this membership belongs to the project's author
    pub fn is_author(&self, project: &Project) -> bool {
        self.project_id == project.id && self.user_id == project.author_id
    }
}

/// Input for adding a contributor
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreateContributor {
    pub project_id: i64,
    pub user_id: i64,
}

/// Filters for listing a project's contributors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContributorFilter {
    pub id: Option<i64>,

    /// Username of the member
    pub username: Option<String>,

    /// Only the author (`true`) or everyone but the author (`false`)
    pub is_author: Option<bool>,
}

impl Contributor {
    /// Adds a user to a project
    ///
    /// # Errors
    ///
    /// Returns a unique violation on `contributors_project_user_key` if the
    /// pair already exists. Callers are expected to check
    /// [`Contributor::find_by_pair`] first and report a friendly error.
    pub async fn create(pool: &PgPool, data: CreateContributor) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Contributor>(
            r#"
            INSERT INTO contributors (project_id, user_id)
            VALUES ($1, $2)
            RETURNING id, project_id, user_id, created_time
            "#,
        )
        .bind(data.project_id)
        .bind(data.user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contributor>(
            "SELECT id, project_id, user_id, created_time FROM contributors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds the membership of a user in a project
    pub async fn find_by_pair(
        pool: &PgPool,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contributor>(
            r#"
            SELECT id, project_id, user_id, created_time
            FROM contributors
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Lists the members of a project in the order they joined
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: i64,
        filter: &ContributorFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT c.id, c.project_id, c.user_id, c.created_time
            FROM contributors c
            JOIN users u ON u.id = c.user_id
            JOIN projects p ON p.id = c.project_id
            WHERE c.project_id = "#,
        );
        query.push_bind(project_id);

        if let Some(id) = filter.id {
            query.push(" AND c.id = ").push_bind(id);
        }
        if let Some(username) = &filter.username {
            query.push(" AND u.username = ").push_bind(username.clone());
        }
        match filter.is_author {
            Some(true) => {
                query.push(" AND c.user_id = p.author_id");
            }
            Some(false) => {
                query.push(" AND c.user_id <> p.author_id");
            }
            None => {}
        }
        query.push(" ORDER BY c.created_time ASC, c.id ASC");

        query.build_query_as::<Contributor>().fetch_all(pool).await
    }

    /// Counts the members of a project
    pub async fn count_by_project(pool: &PgPool, project_id: i64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM contributors WHERE project_id = $1")
                .bind(project_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    /// Removes a membership and unassigns the user from the project's issues
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let removed: Option<(i64, i64)> = sqlx::query_as(
            "DELETE FROM contributors WHERE id = $1 RETURNING project_id, user_id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((project_id, user_id)) = removed else {
            return Ok(false);
        };

        sqlx::query(
            "UPDATE issues SET assignee_id = NULL WHERE project_id = $1 AND assignee_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::ProjectType;

    #[test]
    fn test_is_author() {
        let project = Project {
            id: 3,
            name: "p".to_string(),
            project_type: ProjectType::Android,
            description: None,
            author_id: 10,
            created_time: Utc::now(),
        };
        let author = Contributor {
            id: 1,
            project_id: 3,
            user_id: 10,
            created_time: Utc::now(),
        };
        let teammate = Contributor {
            id: 2,
            user_id: 11,
            ..author.clone()
        };
        let elsewhere = Contributor {
            id: 3,
            project_id: 4,
            ..author.clone()
        };

        assert!(author.is_author(&project));
        assert!(!teammate.is_author(&project));
        assert!(!elsewhere.is_author(&project));
    }
}
