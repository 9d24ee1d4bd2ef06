//! Nested resource resolution
//!
//! Turns path identifiers such as `/projects/7/issues/3/comments/<uuid>`
//! into loaded resources, checking at every level that the child really
//! belongs to the parent named in the path. A child under the wrong parent
//! is reported exactly like a missing one.
//!
//! The resulting [`ResolvedChain`] also carries the actor's membership of
//! the project, so the authorization engine can decide without further
//! queries.

use uuid::Uuid;

use crate::auth::authorization::{Actor, ResourceKind};
use crate::models::{Comment, Contributor, Issue, Project};
use crate::store::{Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("{} not found", .0.as_str())]
    NotFound(ResourceKind),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Identifiers taken from a request path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourcePath {
    pub project_id: Option<i64>,
    pub contributor_id: Option<i64>,
    pub issue_id: Option<i64>,
    pub comment_id: Option<Uuid>,
}

impl ResourcePath {
    pub fn project(project_id: i64) -> Self {
        Self {
            project_id: Some(project_id),
            ..Default::default()
        }
    }

    pub fn contributor(project_id: i64, contributor_id: i64) -> Self {
        Self {
            contributor_id: Some(contributor_id),
            ..Self::project(project_id)
        }
    }

    pub fn issue(project_id: i64, issue_id: i64) -> Self {
        Self {
            issue_id: Some(issue_id),
            ..Self::project(project_id)
        }
    }

    pub fn comment(project_id: i64, issue_id: i64, comment_id: Uuid) -> Self {
        Self {
            comment_id: Some(comment_id),
            ..Self::issue(project_id, issue_id)
        }
    }
}

/// Every resource named by a path, plus the actor's membership
#[derive(Debug, Clone, Default)]
pub struct ResolvedChain {
    pub project: Option<Project>,
    pub contributor: Option<Contributor>,
    pub issue: Option<Issue>,
    pub comment: Option<Comment>,

    /// The actor's contributor row on `project`, if any
    pub membership: Option<Contributor>,
}

/// Loads the resources named by `path`
///
/// # Errors
///
/// - `NotFound(kind)` if any level is missing, or does not belong to the
///   level above it, or a comment is named without its issue
/// - `Store` on storage failure
pub async fn resolve(
    store: &dyn Store,
    actor: Option<&Actor>,
    path: &ResourcePath,
) -> Result<ResolvedChain, ResolveError> {
    if path.comment_id.is_some() && path.issue_id.is_none() {
        return Err(ResolveError::NotFound(ResourceKind::Comment));
    }

    let mut chain = ResolvedChain::default();

    let Some(project_id) = path.project_id else {
        if path.issue_id.is_some() {
            return Err(ResolveError::NotFound(ResourceKind::Issue));
        }
        if path.contributor_id.is_some() {
            return Err(ResolveError::NotFound(ResourceKind::Contributor));
        }
        return Ok(chain);
    };

    let project = store
        .find_project(project_id)
        .await?
        .ok_or(ResolveError::NotFound(ResourceKind::Project))?;

    if let Some(actor) = actor {
        chain.membership = store.find_membership(project.id, actor.user_id).await?;
    }

    if let Some(contributor_id) = path.contributor_id {
        let contributor = store
            .find_contributor(contributor_id)
            .await?
            .filter(|c| c.project_id == project.id)
            .ok_or(ResolveError::NotFound(ResourceKind::Contributor))?;
        chain.contributor = Some(contributor);
    }

    if let Some(issue_id) = path.issue_id {
        let issue = store
            .find_issue(issue_id)
            .await?
            .filter(|i| i.project_id == project.id)
            .ok_or(ResolveError::NotFound(ResourceKind::Issue))?;

        if let Some(comment_id) = path.comment_id {
            let comment = store
                .find_comment(comment_id)
                .await?
                .filter(|c| c.issue_id == issue.id)
                .ok_or(ResolveError::NotFound(ResourceKind::Comment))?;
            chain.comment = Some(comment);
        }

        chain.issue = Some(issue);
    }

    chain.project = Some(project);
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CreateComment, CreateContributor, CreateIssue, CreateProject, CreateUser, IssueLabel,
        IssuePriority, IssueStatus, ProjectType,
    };
    use crate::store::MemoryStore;

    struct Fixture {
        store: MemoryStore,
        ada: Actor,
        bob: Actor,
        p1: Project,
        p2: Project,
        issue: Issue,
        comment: Comment,
        bob_membership: Contributor,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for name in ["ada", "bob"] {
            let user = store
                .create_user(CreateUser {
                    username: name.to_string(),
                    email: None,
                    password_hash: "hash".to_string(),
                    first_name: None,
                    last_name: None,
                    age: 30,
                    is_admin: false,
                    can_be_contacted: false,
                    can_data_be_shared: false,
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        let (ada_id, bob_id) = (ids[0], ids[1]);

        let mut projects = Vec::new();
        for name in ["p1", "p2"] {
            let (project, _) = store
                .create_project(CreateProject {
                    name: name.to_string(),
                    project_type: ProjectType::Ios,
                    description: None,
                    author_id: ada_id,
                })
                .await
                .unwrap();
            projects.push(project);
        }
        let (p1, p2) = (projects[0].clone(), projects[1].clone());

        let bob_membership = store
            .create_contributor(CreateContributor {
                project_id: p1.id,
                user_id: bob_id,
            })
            .await
            .unwrap();
        let issue = store
            .create_issue(CreateIssue {
                title: "Bug A".to_string(),
                description: None,
                project_id: p1.id,
                author_id: ada_id,
                assignee_id: None,
                priority: IssuePriority::Low,
                label: IssueLabel::Bug,
                status: IssueStatus::Todo,
            })
            .await
            .unwrap();
        let comment = store
            .create_comment(CreateComment {
                content: "repro attached".to_string(),
                issue_id: issue.id,
                author_id: bob_id,
            })
            .await
            .unwrap();

        Fixture {
            store,
            ada: Actor { user_id: ada_id, is_admin: false },
            bob: Actor { user_id: bob_id, is_admin: false },
            p1,
            p2,
            issue,
            comment,
            bob_membership,
        }
    }

    #[tokio::test]
    async fn test_resolves_full_comment_chain() {
        let f = fixture().await;
        let path = ResourcePath::comment(f.p1.id, f.issue.id, f.comment.id);

        let chain = resolve(&f.store, Some(&f.bob), &path).await.unwrap();
        assert_eq!(chain.project.map(|p| p.id), Some(f.p1.id));
        assert_eq!(chain.issue.map(|i| i.id), Some(f.issue.id));
        assert_eq!(chain.comment.map(|c| c.id), Some(f.comment.id));
        assert_eq!(chain.membership, Some(f.bob_membership));
    }

    #[tokio::test]
    async fn test_comment_under_wrong_project_is_not_found() {
        let f = fixture().await;
        let path = ResourcePath::comment(f.p2.id, f.issue.id, f.comment.id);

        let err = resolve(&f.store, Some(&f.ada), &path).await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(ResourceKind::Issue)));
    }

    #[tokio::test]
    async fn test_comment_without_issue_is_not_found() {
        let f = fixture().await;
        let path = ResourcePath {
            project_id: Some(f.p1.id),
            comment_id: Some(f.comment.id),
            ..Default::default()
        };

        let err = resolve(&f.store, Some(&f.ada), &path).await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(ResourceKind::Comment)));
    }

    #[tokio::test]
    async fn test_contributor_under_wrong_project_is_not_found() {
        let f = fixture().await;
        let path = ResourcePath::contributor(f.p2.id, f.bob_membership.id);

        let err = resolve(&f.store, Some(&f.ada), &path).await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(ResourceKind::Contributor)));
    }

    #[tokio::test]
    async fn test_missing_project() {
        let f = fixture().await;
        let err = resolve(&f.store, Some(&f.ada), &ResourcePath::project(999))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(ResourceKind::Project)));
    }

    #[tokio::test]
    async fn test_non_member_has_no_membership() {
        let f = fixture().await;
        let chain = resolve(&f.store, Some(&f.bob), &ResourcePath::project(f.p2.id))
            .await
            .unwrap();
        assert!(chain.project.is_some());
        assert!(chain.membership.is_none());

        let anonymous = resolve(&f.store, None, &ResourcePath::project(f.p1.id))
            .await
            .unwrap();
        assert!(anonymous.membership.is_none());
    }
}
