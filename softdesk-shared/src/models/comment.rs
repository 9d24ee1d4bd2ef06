//! Comment model and database operations
//!
//! Comment IDs are random UUIDs so they cannot be enumerated.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE comments (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     content VARCHAR(2048) NOT NULL,
//!     issue_id BIGINT NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
//!     author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     created_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Maximum comment length in characters
pub const MAX_CONTENT_LENGTH: usize = 2048;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,

    /// Owning issue (immutable)
    pub issue_id: i64,

    /// Author (immutable)
    pub author_id: i64,

    pub created_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComment {
    pub content: String,
    pub issue_id: i64,
    pub author_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateComment {
    pub content: Option<String>,
}

impl UpdateComment {
    pub fn apply(self, comment: &mut Comment) {
        if let Some(content) = self.content {
            comment.content = content;
        }
    }
}

impl Comment {
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (content, issue_id, author_id)
            VALUES ($1, $2, $3)
            RETURNING id, content, issue_id, author_id, created_time
            "#,
        )
        .bind(data.content)
        .bind(data.issue_id)
        .bind(data.author_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            "SELECT id, content, issue_id, author_id, created_time FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists an issue's comments, newest first
    pub async fn list_by_issue(pool: &PgPool, issue_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, content, issue_id, author_id, created_time
            FROM comments
            WHERE issue_id = $1
            ORDER BY created_time DESC
            "#,
        )
        .bind(issue_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_by_issue(pool: &PgPool, issue_id: i64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments WHERE issue_id = $1")
            .bind(issue_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateComment,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments
            SET content = COALESCE($2, content)
            WHERE id = $1
            RETURNING id, content, issue_id, author_id, created_time
            "#,
        )
        .bind(id)
        .bind(data.content)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
