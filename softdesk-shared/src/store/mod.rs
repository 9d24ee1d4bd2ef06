//! Persistence boundary
//!
//! Request handlers, the resolver and the view renderer talk to storage only
//! through the [`Store`] trait. Two backends implement it:
//!
//! - [`PgStore`]: PostgreSQL through the model functions in [`crate::models`]
//! - [`MemoryStore`]: in-process maps, used by tests and `STORE_BACKEND=memory`
//!
//! Both backends enforce the same constraints: unique usernames, emails,
//! project names and (project, user) contributor pairs; cascading deletes;
//! and clearing `assignee_id` when the assignee is deleted.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use softdesk_shared::store::{MemoryStore, Store};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
//! assert!(store.find_user(1).await?.is_none());
//! # Ok(())
//! # }
//! ```

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Comment, Contributor, ContributorFilter, CreateComment, CreateContributor, CreateIssue,
    CreateProject, CreateUser, Issue, IssueFilter, Project, ProjectFilter, UpdateComment,
    UpdateIssue, UpdateProject, UpdateUser, User, UserFilter,
};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    ///
    /// Carries the name of the offending request field.
    #[error("{0} already exists")]
    UniqueViolation(String),

    /// A referenced row does not exist
    #[error("referenced {0} does not exist")]
    MissingReference(String),

    /// Any other database failure
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(
                    field_for_constraint(db_err.constraint()).to_string(),
                );
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::MissingReference(
                    field_for_constraint(db_err.constraint()).to_string(),
                );
            }
        }
        StoreError::Database(err)
    }
}

/// Maps a Postgres constraint name to the request field it guards
fn field_for_constraint(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_username_key") => "username",
        Some("users_email_key") => "email",
        Some("projects_name_key") => "name",
        Some("contributors_project_user_key") => "user",
        Some("projects_author_id_fkey")
        | Some("issues_author_id_fkey")
        | Some("comments_author_id_fkey") => "author",
        Some("issues_assignee_id_fkey") => "assignee",
        Some("contributors_user_id_fkey") => "user",
        Some("contributors_project_id_fkey") | Some("issues_project_id_fkey") => "project",
        Some("comments_issue_id_fkey") => "issue",
        _ => "record",
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operations used by the API
///
/// `find_*` return `Ok(None)` for missing rows; `delete_*` return `Ok(false)`.
/// Every listing has a deterministic order: users, projects and issues newest
/// first, contributors in join order, comments newest first.
#[async_trait]
pub trait Store: Send + Sync {
    /// Checks that the backend is reachable
    async fn ping(&self) -> StoreResult<()>;

    // Users

    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>>;
    async fn update_user(&self, id: i64, data: UpdateUser) -> StoreResult<Option<User>>;

    /// Deletes a user with everything they authored and their memberships
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;

    // Projects

    /// Creates a project and the author's contributor row atomically
    async fn create_project(&self, data: CreateProject) -> StoreResult<(Project, Contributor)>;
    async fn find_project(&self, id: i64) -> StoreResult<Option<Project>>;
    async fn find_project_by_name(&self, name: &str) -> StoreResult<Option<Project>>;
    async fn list_projects(&self, filter: &ProjectFilter) -> StoreResult<Vec<Project>>;
    async fn update_project(&self, id: i64, data: UpdateProject) -> StoreResult<Option<Project>>;
    async fn delete_project(&self, id: i64) -> StoreResult<bool>;

    // Contributors

    async fn create_contributor(&self, data: CreateContributor) -> StoreResult<Contributor>;
    async fn find_contributor(&self, id: i64) -> StoreResult<Option<Contributor>>;

    /// Finds the membership of `user_id` in `project_id`
    async fn find_membership(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> StoreResult<Option<Contributor>>;
    async fn list_contributors(
        &self,
        project_id: i64,
        filter: &ContributorFilter,
    ) -> StoreResult<Vec<Contributor>>;

    /// Removes a membership, clearing the user's assignments in that project
    async fn delete_contributor(&self, id: i64) -> StoreResult<bool>;

    // Issues

    async fn create_issue(&self, data: CreateIssue) -> StoreResult<Issue>;
    async fn find_issue(&self, id: i64) -> StoreResult<Option<Issue>>;
    async fn list_issues(&self, project_id: i64, filter: &IssueFilter) -> StoreResult<Vec<Issue>>;
    async fn count_issues(&self, project_id: i64) -> StoreResult<i64>;
    async fn update_issue(&self, id: i64, data: UpdateIssue) -> StoreResult<Option<Issue>>;
    async fn delete_issue(&self, id: i64) -> StoreResult<bool>;

    // Comments

    async fn create_comment(&self, data: CreateComment) -> StoreResult<Comment>;
    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;
    async fn list_comments(&self, issue_id: i64) -> StoreResult<Vec<Comment>>;
    async fn count_comments(&self, issue_id: i64) -> StoreResult<i64>;
    async fn update_comment(&self, id: Uuid, data: UpdateComment) -> StoreResult<Option<Comment>>;
    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool>;
}

/// PostgreSQL backend
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(crate::db::pool::health_check(&self.pool).await?)
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_username(&self.pool, username).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        Ok(User::list(&self.pool, filter).await?)
    }

    async fn update_user(&self, id: i64, data: UpdateUser) -> StoreResult<Option<User>> {
        Ok(User::update(&self.pool, id, data).await?)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        Ok(User::delete(&self.pool, id).await?)
    }

    async fn create_project(&self, data: CreateProject) -> StoreResult<(Project, Contributor)> {
        Ok(Project::create(&self.pool, data).await?)
    }

    async fn find_project(&self, id: i64) -> StoreResult<Option<Project>> {
        Ok(Project::find_by_id(&self.pool, id).await?)
    }

    async fn find_project_by_name(&self, name: &str) -> StoreResult<Option<Project>> {
        Ok(Project::find_by_name(&self.pool, name).await?)
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> StoreResult<Vec<Project>> {
        Ok(Project::list(&self.pool, filter).await?)
    }

    async fn update_project(&self, id: i64, data: UpdateProject) -> StoreResult<Option<Project>> {
        Ok(Project::update(&self.pool, id, data).await?)
    }

    async fn delete_project(&self, id: i64) -> StoreResult<bool> {
        Ok(Project::delete(&self.pool, id).await?)
    }

    async fn create_contributor(&self, data: CreateContributor) -> StoreResult<Contributor> {
        Ok(Contributor::create(&self.pool, data).await?)
    }

    async fn find_contributor(&self, id: i64) -> StoreResult<Option<Contributor>> {
        Ok(Contributor::find_by_id(&self.pool, id).await?)
    }

    async fn find_membership(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> StoreResult<Option<Contributor>> {
        Ok(Contributor::find_by_pair(&self.pool, project_id, user_id).await?)
    }

    async fn list_contributors(
        &self,
        project_id: i64,
        filter: &ContributorFilter,
    ) -> StoreResult<Vec<Contributor>> {
        Ok(Contributor::list_by_project(&self.pool, project_id, filter).await?)
    }

    async fn delete_contributor(&self, id: i64) -> StoreResult<bool> {
        Ok(Contributor::delete(&self.pool, id).await?)
    }

    async fn create_issue(&self, data: CreateIssue) -> StoreResult<Issue> {
        Ok(Issue::create(&self.pool, data).await?)
    }

    async fn find_issue(&self, id: i64) -> StoreResult<Option<Issue>> {
        Ok(Issue::find_by_id(&self.pool, id).await?)
    }

    async fn list_issues(&self, project_id: i64, filter: &IssueFilter) -> StoreResult<Vec<Issue>> {
        Ok(Issue::list_by_project(&self.pool, project_id, filter).await?)
    }

    async fn count_issues(&self, project_id: i64) -> StoreResult<i64> {
        Ok(Issue::count_by_project(&self.pool, project_id).await?)
    }

    async fn update_issue(&self, id: i64, data: UpdateIssue) -> StoreResult<Option<Issue>> {
        Ok(Issue::update(&self.pool, id, data).await?)
    }

    async fn delete_issue(&self, id: i64) -> StoreResult<bool> {
        Ok(Issue::delete(&self.pool, id).await?)
    }

    async fn create_comment(&self, data: CreateComment) -> StoreResult<Comment> {
        Ok(Comment::create(&self.pool, data).await?)
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(Comment::find_by_id(&self.pool, id).await?)
    }

    async fn list_comments(&self, issue_id: i64) -> StoreResult<Vec<Comment>> {
        Ok(Comment::list_by_issue(&self.pool, issue_id).await?)
    }

    async fn count_comments(&self, issue_id: i64) -> StoreResult<i64> {
        Ok(Comment::count_by_issue(&self.pool, issue_id).await?)
    }

    async fn update_comment(&self, id: Uuid, data: UpdateComment) -> StoreResult<Option<Comment>> {
        Ok(Comment::update(&self.pool, id, data).await?)
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Comment::delete(&self.pool, id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_field_names() {
        assert_eq!(field_for_constraint(Some("users_username_key")), "username");
        assert_eq!(field_for_constraint(Some("users_email_key")), "email");
        assert_eq!(field_for_constraint(Some("projects_name_key")), "name");
        assert_eq!(
            field_for_constraint(Some("contributors_project_user_key")),
            "user"
        );
        assert_eq!(field_for_constraint(None), "record");
    }

    #[test]
    fn test_non_database_errors_pass_through() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Database(_)));
    }
}
