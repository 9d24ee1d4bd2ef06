//! Response shapes
//!
//! Every resource can be rendered in three shapes:
//!
//! - **List**: compact, with counts, no nested collections
//! - **Detail**: every field, plus Minimal views of the children
//! - **Minimal**: identifiers, author and counts; never embeds anything
//!
//! [`select_view`] picks the shape from the operation, so handlers never
//! choose serializers themselves:
//!
//! | Context | Shape |
//! |---|---|
//! | `List` | List |
//! | `Retrieve`, `Create`, `Update`, `PartialUpdate` | Detail |
//! | `Destroy` | none (204) |
//! | embedded in another view | Minimal |

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::authorization::{Action, ResourceKind};
use crate::models::{
    Comment, Contributor, ContributorFilter, Issue, IssueFilter, IssueLabel, IssuePriority,
    IssueStatus, Project, ProjectType, User,
};
use crate::store::{Store, StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewShape {
    List,
    Detail,
    Minimal,
}

/// Where a view is being produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewContext {
    /// Top-level response to an operation
    Operation(Action),

    /// Nested inside another resource's view
    Embedded,
}

/// Chooses the response shape, or `None` when the response has no body
pub fn select_view(kind: ResourceKind, context: ViewContext) -> Option<ViewShape> {
    match (kind, context) {
        (_, ViewContext::Embedded) => Some(ViewShape::Minimal),
        (_, ViewContext::Operation(Action::Destroy)) => None,
        (_, ViewContext::Operation(Action::List)) => Some(ViewShape::List),
        (
            _,
            ViewContext::Operation(
                Action::Retrieve | Action::Create | Action::Update | Action::PartialUpdate,
            ),
        ) => Some(ViewShape::Detail),
    }
}

fn embedded(kind: ResourceKind) -> ViewShape {
    select_view(kind, ViewContext::Embedded).unwrap_or(ViewShape::Minimal)
}

// Users

#[derive(Debug, Clone, Serialize)]
pub struct UserListView {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDetailView {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: i32,
    pub is_admin: bool,
    pub can_be_contacted: bool,
    pub can_data_be_shared: bool,
    pub created_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserMinimalView {
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum UserView {
    List(UserListView),
    Detail(UserDetailView),
    Minimal(UserMinimalView),
}

pub fn render_user(shape: ViewShape, user: &User) -> UserView {
    match shape {
        ViewShape::List => UserView::List(UserListView {
            id: user.id,
            username: user.username.clone(),
        }),
        ViewShape::Detail => UserView::Detail(UserDetailView {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            age: user.age,
            is_admin: user.is_admin,
            can_be_contacted: user.can_be_contacted,
            can_data_be_shared: user.can_data_be_shared,
            created_time: user.created_time,
        }),
        ViewShape::Minimal => UserView::Minimal(UserMinimalView {
            user_id: user.id,
            username: user.username.clone(),
        }),
    }
}

// Projects

#[derive(Debug, Clone, Serialize)]
pub struct ProjectListView {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub description: Option<String>,
    pub author: i64,
    pub issues_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetailView {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub description: Option<String>,
    pub author: i64,
    pub created_time: DateTime<Utc>,
    pub issues_count: i64,
    pub contributors: Vec<ContributorView>,
    pub issues: Vec<IssueView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectMinimalView {
    pub project_id: i64,
    pub author_id: i64,
    pub issues_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProjectView {
    List(ProjectListView),
    Detail(ProjectDetailView),
    Minimal(ProjectMinimalView),
}

pub async fn render_project(
    store: &dyn Store,
    shape: ViewShape,
    project: &Project,
) -> StoreResult<ProjectView> {
    let issues_count = store.count_issues(project.id).await?;

    Ok(match shape {
        ViewShape::List => ProjectView::List(ProjectListView {
            id: project.id,
            name: project.name.clone(),
            project_type: project.project_type,
            description: project.description.clone(),
            author: project.author_id,
            issues_count,
        }),
        ViewShape::Detail => {
            let mut contributors = Vec::new();
            for contributor in store
                .list_contributors(project.id, &ContributorFilter::default())
                .await?
            {
                contributors.push(
                    render_contributor(
                        store,
                        embedded(ResourceKind::Contributor),
                        &contributor,
                        project,
                    )
                    .await?,
                );
            }

            let mut issues = Vec::new();
            for issue in store.list_issues(project.id, &IssueFilter::default()).await? {
                issues.push(render_issue(store, embedded(ResourceKind::Issue), &issue).await?);
            }

            ProjectView::Detail(ProjectDetailView {
                id: project.id,
                name: project.name.clone(),
                project_type: project.project_type,
                description: project.description.clone(),
                author: project.author_id,
                created_time: project.created_time,
                issues_count,
                contributors,
                issues,
            })
        }
        ViewShape::Minimal => ProjectView::Minimal(ProjectMinimalView {
            project_id: project.id,
            author_id: project.author_id,
            issues_count,
        }),
    })
}

// Contributors

#[derive(Debug, Clone, Serialize)]
pub struct ContributorListView {
    pub id: i64,
    pub user: i64,
    pub username: String,
    pub project: i64,
    pub is_author: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContributorDetailView {
    pub id: i64,
    pub project: i64,
    pub is_author: bool,
    pub created_time: DateTime<Utc>,
    pub user: UserView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContributorMinimalView {
    pub contributor_id: i64,
    pub user_id: i64,
    pub is_author: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ContributorView {
    List(ContributorListView),
    Detail(ContributorDetailView),
    Minimal(ContributorMinimalView),
}

/// Renders a contributor of `project`
pub async fn render_contributor(
    store: &dyn Store,
    shape: ViewShape,
    contributor: &Contributor,
    project: &Project,
) -> StoreResult<ContributorView> {
    let is_author = contributor.is_author(project);

    if shape == ViewShape::Minimal {
        return Ok(ContributorView::Minimal(ContributorMinimalView {
            contributor_id: contributor.id,
            user_id: contributor.user_id,
            is_author,
        }));
    }

    let user = store
        .find_user(contributor.user_id)
        .await?
        .ok_or_else(|| StoreError::MissingReference("user".to_string()))?;

    Ok(match shape {
        ViewShape::List => ContributorView::List(ContributorListView {
            id: contributor.id,
            user: user.id,
            username: user.username,
            project: contributor.project_id,
            is_author,
        }),
        _ => ContributorView::Detail(ContributorDetailView {
            id: contributor.id,
            project: contributor.project_id,
            is_author,
            created_time: contributor.created_time,
            user: render_user(embedded(ResourceKind::User), &user),
        }),
    })
}

// Issues

#[derive(Debug, Clone, Serialize)]
pub struct IssueListView {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub label: IssueLabel,
    pub priority: IssuePriority,
    pub status: IssueStatus,
    pub assignee: Option<i64>,
    pub author: i64,
    pub comments_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueDetailView {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub project: i64,
    pub author: i64,
    pub assignee: Option<i64>,
    pub label: IssueLabel,
    pub priority: IssuePriority,
    pub status: IssueStatus,
    pub created_time: DateTime<Utc>,
    pub comments_count: i64,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueMinimalView {
    pub issue_id: i64,
    pub author_id: i64,
    pub comments_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum IssueView {
    List(IssueListView),
    Detail(IssueDetailView),
    Minimal(IssueMinimalView),
}

pub async fn render_issue(
    store: &dyn Store,
    shape: ViewShape,
    issue: &Issue,
) -> StoreResult<IssueView> {
    let comments_count = store.count_comments(issue.id).await?;

    Ok(match shape {
        ViewShape::List => IssueView::List(IssueListView {
            id: issue.id,
            title: issue.title.clone(),
            description: issue.description.clone(),
            label: issue.label,
            priority: issue.priority,
            status: issue.status,
            assignee: issue.assignee_id,
            author: issue.author_id,
            comments_count,
        }),
        ViewShape::Detail => {
            let comments = store
                .list_comments(issue.id)
                .await?
                .iter()
                .map(|c| render_comment(embedded(ResourceKind::Comment), c))
                .collect();

            IssueView::Detail(IssueDetailView {
                id: issue.id,
                title: issue.title.clone(),
                description: issue.description.clone(),
                project: issue.project_id,
                author: issue.author_id,
                assignee: issue.assignee_id,
                label: issue.label,
                priority: issue.priority,
                status: issue.status,
                created_time: issue.created_time,
                comments_count,
                comments,
            })
        }
        ViewShape::Minimal => IssueView::Minimal(IssueMinimalView {
            issue_id: issue.id,
            author_id: issue.author_id,
            comments_count,
        }),
    })
}

// Comments

#[derive(Debug, Clone, Serialize)]
pub struct CommentListView {
    pub id: Uuid,
    pub author: i64,
    pub content: String,
    pub created_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentDetailView {
    pub id: Uuid,
    pub content: String,
    pub issue: i64,
    pub author: i64,
    pub created_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentMinimalView {
    pub comment_id: Uuid,
    pub author_id: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommentView {
    List(CommentListView),
    Detail(CommentDetailView),
    Minimal(CommentMinimalView),
}

pub fn render_comment(shape: ViewShape, comment: &Comment) -> CommentView {
    match shape {
        ViewShape::List => CommentView::List(CommentListView {
            id: comment.id,
            author: comment.author_id,
            content: comment.content.clone(),
            created_time: comment.created_time,
        }),
        ViewShape::Detail => CommentView::Detail(CommentDetailView {
            id: comment.id,
            content: comment.content.clone(),
            issue: comment.issue_id,
            author: comment.author_id,
            created_time: comment.created_time,
        }),
        ViewShape::Minimal => CommentView::Minimal(CommentMinimalView {
            comment_id: comment.id,
            author_id: comment.author_id,
        }),
    }
}
