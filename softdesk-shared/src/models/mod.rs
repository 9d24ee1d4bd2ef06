//! Database models for SoftDesk
//!
//! Each model owns its table and exposes CRUD operations as associated
//! functions taking a `&PgPool`. Request-independent validation lives in the
//! API crate; these types only carry data.
//!
//! # Models
//!
//! - `user`: accounts, credentials and consent flags
//! - `project`: root of the resource hierarchy
//! - `contributor`: user membership in a project
//! - `issue`: work items inside a project
//! - `comment`: discussion on an issue
//!
//! # Example
//!
//! ```no_run
//! use softdesk_shared::models::project::{CreateProject, Project, ProjectType};
//! use softdesk_shared::db::pool::{create_pool, DatabaseConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//!
//! let (project, author) = Project::create(&pool, CreateProject {
//!     name: "Mobile app".to_string(),
//!     project_type: ProjectType::Android,
//!     description: None,
//!     author_id: 1,
//! }).await?;
//! assert_eq!(author.user_id, project.author_id);
//! # Ok(())
//! # }
//! ```

pub mod comment;
pub mod contributor;
pub mod issue;
pub mod project;
pub mod user;

pub use comment::{Comment, CreateComment, UpdateComment};
pub use contributor::{Contributor, ContributorFilter, CreateContributor};
pub use issue::{CreateIssue, Issue, IssueFilter, IssueLabel, IssuePriority, IssueStatus, UpdateIssue};
pub use project::{CreateProject, Project, ProjectFilter, ProjectType, UpdateProject};
pub use user::{CreateUser, UpdateUser, User, UserFilter};
