//! User model and database operations
//!
//! Users authenticate with a username and password and may belong to any
//! number of projects through [`Contributor`](super::contributor::Contributor)
//! rows. The `is_admin` flag is the only stored role; every other role is
//! derived by the authorization engine.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id BIGSERIAL PRIMARY KEY,
//!     username VARCHAR(100) NOT NULL UNIQUE,
//!     email VARCHAR(254) UNIQUE,
//!     password_hash VARCHAR(255) NOT NULL,
//!     first_name VARCHAR(30),
//!     last_name VARCHAR(30),
//!     age INTEGER NOT NULL CHECK (age >= 15 AND age <= 99),
//!     is_admin BOOLEAN NOT NULL DEFAULT FALSE,
//!     can_be_contacted BOOLEAN NOT NULL DEFAULT FALSE,
//!     can_data_be_shared BOOLEAN NOT NULL DEFAULT FALSE,
//!     created_time TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! # Example
//!
//! ```no_run
//! use softdesk_shared::models::user::{User, CreateUser};
//! use softdesk_shared::db::pool::{create_pool, DatabaseConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//!
//! let user = User::create(&pool, CreateUser {
//!     username: "ada".to_string(),
//!     email: Some("ada@example.com".to_string()),
//!     password_hash: "$argon2id$...".to_string(),
//!     first_name: None,
//!     last_name: None,
//!     age: 36,
//!     is_admin: false,
//!     can_be_contacted: false,
//!     can_data_be_shared: false,
//! }).await?;
//!
//! let found = User::find_by_username(&pool, "ada").await?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Minimum age accepted at registration
pub const MIN_AGE: i32 = 15;

/// Maximum age accepted at registration
pub const MAX_AGE: i32 = 99;

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, age, \
     is_admin, can_be_contacted, can_data_be_shared, created_time";

/// User account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Sequential user ID
    pub id: i64,

    /// Unique public handle
    pub username: String,

    /// Optional email address, unique when present
    pub email: Option<String>,

    /// Argon2id password hash
    ///
    /// Never serialized into API responses.
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: Option<String>,

    pub last_name: Option<String>,

    /// Age in years (15..=99)
    pub age: i32,

    /// Global administrator flag
    pub is_admin: bool,

    /// Consent to be contacted by SoftDesk
    pub can_be_contacted: bool,

    /// Consent to share data with third parties
    pub can_data_be_shared: bool,

    /// When the account was created
    pub created_time: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: Option<String>,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: i32,
    pub is_admin: bool,
    pub can_be_contacted: bool,
    pub can_data_be_shared: bool,
}

/// Input for updating an existing user
///
/// Only `Some` fields are written. Nullable columns use `Option<Option<_>>`
/// so that `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<Option<String>>,
    pub password_hash: Option<String>,
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub age: Option<i32>,
    pub is_admin: Option<bool>,
    pub can_be_contacted: Option<bool>,
    pub can_data_be_shared: Option<bool>,
}

impl UpdateUser {
    /// Applies the changes to an in-memory user
    pub fn apply(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(password_hash) = self.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if let Some(age) = self.age {
            user.age = age;
        }
        if let Some(is_admin) = self.is_admin {
            user.is_admin = is_admin;
        }
        if let Some(can_be_contacted) = self.can_be_contacted {
            user.can_be_contacted = can_be_contacted;
        }
        if let Some(can_data_be_shared) = self.can_data_be_shared {
            user.can_data_be_shared = can_data_be_shared;
        }
    }
}

/// Query-string filters for listing users
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter {
    pub id: Option<i64>,
    pub username: Option<String>,

    /// Matches `can_be_contacted`
    pub contact_ok: Option<bool>,

    /// Matches `can_data_be_shared`
    pub data_shared_ok: Option<bool>,
}

impl UserFilter {
    /// Checks whether a user passes every set filter
    pub fn matches(&self, user: &User) -> bool {
        self.id.map_or(true, |id| user.id == id)
            && self
                .username
                .as_deref()
                .map_or(true, |username| user.username == username)
            && self
                .contact_ok
                .map_or(true, |flag| user.can_be_contacted == flag)
            && self
                .data_shared_ok
                .map_or(true, |flag| user.can_data_be_shared == flag)
    }
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the username or email is already taken (unique
    /// constraint violation) or the database is unreachable.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, age,
                               is_admin, can_be_contacted, can_data_be_shared)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.username)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.age)
        .bind(data.is_admin)
        .bind(data.can_be_contacted)
        .bind(data.can_data_be_shared)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by username (exact match)
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(pool)
        .await
    }

    /// Finds a user by email address
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Lists users matching a filter, newest first
    pub async fn list(pool: &PgPool, filter: &UserFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));

        if let Some(id) = filter.id {
            query.push(" AND id = ").push_bind(id);
        }
        if let Some(username) = &filter.username {
            query.push(" AND username = ").push_bind(username.clone());
        }
        if let Some(flag) = filter.contact_ok {
            query.push(" AND can_be_contacted = ").push_bind(flag);
        }
        if let Some(flag) = filter.data_shared_ok {
            query.push(" AND can_data_be_shared = ").push_bind(flag);
        }
        query.push(" ORDER BY created_time DESC, id DESC");

        query.build_query_as::<User>().fetch_all(pool).await
    }

    /// Updates a user
    ///
    /// Fields left as `None` in `data` keep their current value. The row is
    /// read and written inside one transaction.
    ///
    /// # Returns
    ///
    /// The updated user, or `None` if no user has this ID
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let current = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut user) = current else {
            return Ok(None);
        };
        data.apply(&mut user);

        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, first_name = $5,
                last_name = $6, age = $7, is_admin = $8, can_be_contacted = $9,
                can_data_be_shared = $10
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user.username)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.age)
        .bind(user.is_admin)
        .bind(user.can_be_contacted)
        .bind(user.can_data_be_shared)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    /// Deletes a user
    ///
    /// Authored projects, issues and comments and the user's contributor rows
    /// are removed by `ON DELETE CASCADE`; issues assigned to the user get
    /// `assignee_id = NULL`.
    ///
    /// # Returns
    ///
    /// True if a row was deleted
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 1,
            username: "ada".to_string(),
            email: Some("ada@example.com".to_string()),
            password_hash: "hash".to_string(),
            first_name: None,
            last_name: None,
            age: 36,
            is_admin: false,
            can_be_contacted: false,
            can_data_be_shared: true,
            created_time: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "ada");
    }

    #[test]
    fn test_update_user_apply() {
        let mut user = sample_user();
        UpdateUser {
            email: Some(None),
            age: Some(40),
            can_be_contacted: Some(true),
            ..Default::default()
        }
        .apply(&mut user);

        assert_eq!(user.email, None);
        assert_eq!(user.age, 40);
        assert!(user.can_be_contacted);
        assert_eq!(user.username, "ada");
    }

    #[test]
    fn test_user_filter_matches() {
        let user = sample_user();

        assert!(UserFilter::default().matches(&user));
        assert!(UserFilter {
            data_shared_ok: Some(true),
            ..Default::default()
        }
        .matches(&user));
        assert!(!UserFilter {
            contact_ok: Some(true),
            ..Default::default()
        }
        .matches(&user));
        assert!(!UserFilter {
            username: Some("grace".to_string()),
            ..Default::default()
        }
        .matches(&user));
    }
}
