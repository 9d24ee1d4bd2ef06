//! Authorization engine
//!
//! Every access decision in the API goes through [`authorize`]. It is a pure
//! function of the actor, the action, the target and the chain of resources
//! the resolver loaded, so it never touches storage.
//!
//! # Roles
//!
//! Roles are derived on every call, never stored:
//!
//! - **Admin**: `actor.is_admin`; allows every supported action
//! - **Author**: `actor == resource.author_id` (the resource's own author)
//! - **Project author**: `actor == owning_project.author_id`
//! - **Contributor**: the chain carries the actor's membership of the owning project
//! - **Self**: `actor == user.id` for user targets
//!
//! # Policy
//!
//! | Resource | list / retrieve | create | update | destroy |
//! |---|---|---|---|---|
//! | User | authenticated | anyone | self | self |
//! | Project | list: authenticated, retrieve: contributor | authenticated | author | author |
//! | Contributor | contributor | project author | not supported | project author |
//! | Issue | contributor | contributor | author | author |
//! | Comment | contributor | contributor | author | author |
//!
//! Admins pass every row. Checks run in a fixed order:
//!
//! ```text
//! unsupported action      -> ActionNotSupported
//! no actor                -> NotAuthenticated   (except user registration)
//! admin                   -> Allow
//! owning project missing  -> ResourceNotFound
//! not a member            -> NotContributor
//! role predicate          -> NotAuthor / NotProjectAuthor / NotSelf
//! ```
//!
//! # Example
//!
//! ```
//! use softdesk_shared::auth::authorization::{authorize, Action, Actor, Decision, ResourceKind, Target};
//! use softdesk_shared::resolver::ResolvedChain;
//!
//! let actor = Actor { user_id: 1, is_admin: false };
//! let decision = authorize(
//!     Some(&actor),
//!     Action::Create,
//!     Target::Class(ResourceKind::Project),
//!     &ResolvedChain::default(),
//! );
//! assert_eq!(decision, Decision::Allow);
//! ```

use axum::http::StatusCode;
use serde::Serialize;

use crate::models::{Comment, Contributor, Issue, Project, User};
use crate::resolver::ResolvedChain;

/// The authenticated subject of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
}

impl Action {
    /// Actions addressed to a collection rather than one object
    pub fn is_collection(&self) -> bool {
        matches!(self, Action::List | Action::Create)
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }

    pub fn is_update(&self) -> bool {
        matches!(self, Action::Update | Action::PartialUpdate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    User,
    Project,
    Contributor,
    Issue,
    Comment,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::Project => "project",
            ResourceKind::Contributor => "contributor",
            ResourceKind::Issue => "issue",
            ResourceKind::Comment => "comment",
        }
    }

    fn supports(&self, action: Action) -> bool {
        !(matches!(self, ResourceKind::Contributor) && action.is_update())
    }
}

/// A concrete resource being acted on
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    User(&'a User),
    Project(&'a Project),
    Contributor(&'a Contributor),
    Issue(&'a Issue),
    Comment(&'a Comment),
}

impl<'a> Resource<'a> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::User(_) => ResourceKind::User,
            Resource::Project(_) => ResourceKind::Project,
            Resource::Contributor(_) => ResourceKind::Contributor,
            Resource::Issue(_) => ResourceKind::Issue,
            Resource::Comment(_) => ResourceKind::Comment,
        }
    }

    /// The resource's own author, if it has one
    pub fn author_id(&self) -> Option<i64> {
        match self {
            Resource::Project(p) => Some(p.author_id),
            Resource::Issue(i) => Some(i.author_id),
            Resource::Comment(c) => Some(c.author_id),
            Resource::User(_) | Resource::Contributor(_) => None,
        }
    }
}

/// What an action is aimed at: a whole class (list, create) or one object
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Class(ResourceKind),
    Object(Resource<'a>),
}

impl<'a> Target<'a> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Target::Class(kind) => *kind,
            Target::Object(resource) => resource.kind(),
        }
    }
}

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    #[error("Authentication credentials were not provided")]
    NotAuthenticated,

    /// Surfaced as 404 so non-members cannot probe for projects
    #[error("Not found")]
    NotContributor,

    #[error("Only the author may do this")]
    NotAuthor,

    #[error("Only the project author may do this")]
    NotProjectAuthor,

    #[error("Users may only modify their own account")]
    NotSelf,

    #[error("Administrator rights are required")]
    NotAdmin,

    #[error("Not found")]
    ResourceNotFound,

    #[error("Action not supported on this resource")]
    ActionNotSupported,
}

impl DenyReason {
    /// Stable reason code included in error bodies
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::NotAuthenticated => "not_authenticated",
            DenyReason::NotContributor => "not_contributor",
            DenyReason::NotAuthor => "not_author",
            DenyReason::NotProjectAuthor => "not_project_author",
            DenyReason::NotSelf => "not_self",
            DenyReason::NotAdmin => "not_admin",
            DenyReason::ResourceNotFound => "resource_not_found",
            DenyReason::ActionNotSupported => "action_not_supported",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            DenyReason::NotAuthenticated => StatusCode::UNAUTHORIZED,
            DenyReason::NotContributor | DenyReason::ResourceNotFound => StatusCode::NOT_FOUND,
            DenyReason::NotAuthor
            | DenyReason::NotProjectAuthor
            | DenyReason::NotSelf
            | DenyReason::NotAdmin => StatusCode::FORBIDDEN,
            DenyReason::ActionNotSupported => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// Finds the project a target belongs to by walking parent pointers
///
/// Each hop must match the corresponding level of the chain by ID; any
/// mismatch or missing level yields `None`.
pub fn owning_project<'c>(target: &Target<'_>, chain: &'c ResolvedChain) -> Option<&'c Project> {
    let project = chain.project.as_ref()?;

    let project_id = match target {
        Target::Object(Resource::Project(p)) => p.id,
        Target::Object(Resource::Contributor(c)) => c.project_id,
        Target::Object(Resource::Issue(i)) => i.project_id,
        Target::Object(Resource::Comment(c)) => {
            let issue = chain.issue.as_ref().filter(|i| i.id == c.issue_id)?;
            issue.project_id
        }
        Target::Class(ResourceKind::Comment) => chain.issue.as_ref()?.project_id,
        Target::Class(ResourceKind::Contributor) | Target::Class(ResourceKind::Issue) => {
            project.id
        }
        Target::Object(Resource::User(_))
        | Target::Class(ResourceKind::User)
        | Target::Class(ResourceKind::Project) => return None,
    };

    (project.id == project_id).then_some(project)
}

/// True when the chain carries the actor's membership of `project`
fn is_member(actor: &Actor, project: &Project, chain: &ResolvedChain) -> bool {
    chain
        .membership
        .as_ref()
        .is_some_and(|m| m.project_id == project.id && m.user_id == actor.user_id)
}

/// True when the actor is assigned to the issue
///
/// Assignment grants nothing beyond contributor rights.
pub fn is_assignee(actor: &Actor, issue: &Issue) -> bool {
    issue.is_assigned_to(actor.user_id)
}

fn require(condition: bool, reason: DenyReason) -> Decision {
    if condition {
        Decision::Allow
    } else {
        Decision::Deny(reason)
    }
}

/// Decides whether `actor` may perform `action` on `target`
///
/// `actor` is `None` for anonymous requests.
pub fn authorize(
    actor: Option<&Actor>,
    action: Action,
    target: Target<'_>,
    chain: &ResolvedChain,
) -> Decision {
    let kind = target.kind();

    let shape_ok = matches!(target, Target::Class(_)) == action.is_collection();
    if !shape_ok || !kind.supports(action) {
        return Decision::Deny(DenyReason::ActionNotSupported);
    }

    let Some(actor) = actor else {
        return require(
            kind == ResourceKind::User && action == Action::Create,
            DenyReason::NotAuthenticated,
        );
    };

    if actor.is_admin {
        return Decision::Allow;
    }

    match (kind, target) {
        (ResourceKind::User, Target::Object(Resource::User(user))) if !action.is_read() => {
            require(user.id == actor.user_id, DenyReason::NotSelf)
        }
        (ResourceKind::User, _) => Decision::Allow,
        (ResourceKind::Project, Target::Class(_)) => Decision::Allow,
        _ => authorize_in_project(actor, action, target, chain),
    }
}

fn authorize_in_project(
    actor: &Actor,
    action: Action,
    target: Target<'_>,
    chain: &ResolvedChain,
) -> Decision {
    let Some(project) = owning_project(&target, chain) else {
        return Decision::Deny(DenyReason::ResourceNotFound);
    };

    if !is_member(actor, project, chain) {
        return Decision::Deny(DenyReason::NotContributor);
    }

    if action.is_read() {
        return Decision::Allow;
    }

    match (target.kind(), action) {
        (ResourceKind::Contributor, _) => {
            require(project.author_id == actor.user_id, DenyReason::NotProjectAuthor)
        }
        (ResourceKind::Issue | ResourceKind::Comment, Action::Create) => Decision::Allow,
        _ => match target {
            Target::Object(resource) => require(
                resource.author_id() == Some(actor.user_id),
                DenyReason::NotAuthor,
            ),
            Target::Class(_) => Decision::Deny(DenyReason::ActionNotSupported),
        },
    }
}

/// Only admins may create an admin or grant the admin flag
pub fn authorize_admin_grant(actor: Option<&Actor>, grants_admin: bool) -> Decision {
    require(
        !grants_admin || actor.is_some_and(|a| a.is_admin),
        DenyReason::NotAdmin,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssueLabel, IssuePriority, IssueStatus, ProjectType};
    use chrono::Utc;
    use uuid::Uuid;

    const AUTHOR: i64 = 1;
    const MEMBER: i64 = 2;
    const OUTSIDER: i64 = 3;
    const ADMIN: i64 = 4;

    const ALL_ACTIONS: [Action; 6] = [
        Action::List,
        Action::Retrieve,
        Action::Create,
        Action::Update,
        Action::PartialUpdate,
        Action::Destroy,
    ];

    fn actor(user_id: i64) -> Actor {
        Actor {
            user_id,
            is_admin: user_id == ADMIN,
        }
    }

    fn user(id: i64) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: None,
            password_hash: String::new(),
            first_name: None,
            last_name: None,
            age: 30,
            is_admin: id == ADMIN,
            can_be_contacted: false,
            can_data_be_shared: false,
            created_time: Utc::now(),
        }
    }

    fn project() -> Project {
        Project {
            id: 7,
            name: "p7".to_string(),
            project_type: ProjectType::Backend,
            description: None,
            author_id: AUTHOR,
            created_time: Utc::now(),
        }
    }

    fn membership(user_id: i64) -> Contributor {
        Contributor {
            id: 100 + user_id,
            project_id: 7,
            user_id,
            created_time: Utc::now(),
        }
    }

    fn issue(author_id: i64) -> Issue {
        Issue {
            id: 3,
            title: "Bug A".to_string(),
            description: None,
            project_id: 7,
            author_id,
            assignee_id: Some(MEMBER),
            priority: IssuePriority::High,
            label: IssueLabel::Bug,
            status: IssueStatus::Todo,
            created_time: Utc::now(),
        }
    }

    fn comment(author_id: i64) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            content: "seen".to_string(),
            issue_id: 3,
            author_id,
            created_time: Utc::now(),
        }
    }

    /// Chain as the resolver would build it for `user_id`
    fn chain_for(user_id: i64, with_issue: bool) -> ResolvedChain {
        ResolvedChain {
            project: Some(project()),
            issue: with_issue.then(|| issue(AUTHOR)),
            membership: matches!(user_id, AUTHOR | MEMBER).then(|| membership(user_id)),
            ..Default::default()
        }
    }

    fn decide(user_id: i64, action: Action, target: Target<'_>, chain: &ResolvedChain) -> Decision {
        authorize(Some(&actor(user_id)), action, target, chain)
    }

    #[test]
    fn test_author_is_always_allowed_on_own_project() {
        let p = project();
        let chain = chain_for(AUTHOR, false);
        for action in [Action::Retrieve, Action::Update, Action::PartialUpdate, Action::Destroy] {
            assert_eq!(
                decide(AUTHOR, action, Target::Object(Resource::Project(&p)), &chain),
                Decision::Allow
            );
        }
    }

    #[test]
    fn test_non_contributor_cannot_read_project() {
        let p = project();
        let chain = chain_for(OUTSIDER, false);
        assert_eq!(
            decide(OUTSIDER, Action::Retrieve, Target::Object(Resource::Project(&p)), &chain),
            Decision::Deny(DenyReason::NotContributor)
        );
        assert_eq!(
            decide(OUTSIDER, Action::List, Target::Class(ResourceKind::Issue), &chain),
            Decision::Deny(DenyReason::NotContributor)
        );
        assert_eq!(DenyReason::NotContributor.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_member_can_read_but_not_modify_project() {
        let p = project();
        let chain = chain_for(MEMBER, false);
        let target = Target::Object(Resource::Project(&p));

        assert!(decide(MEMBER, Action::Retrieve, target, &chain).is_allowed());
        assert_eq!(
            decide(MEMBER, Action::PartialUpdate, target, &chain),
            Decision::Deny(DenyReason::NotAuthor)
        );
        assert_eq!(
            decide(MEMBER, Action::Destroy, target, &chain),
            Decision::Deny(DenyReason::NotAuthor)
        );
    }

    #[test]
    fn test_admin_allows_every_supported_action() {
        let p = project();
        let i = issue(AUTHOR);
        let c = comment(MEMBER);
        let m = membership(MEMBER);
        let u = user(MEMBER);
        // Admin is not a member of the project
        let chain = ResolvedChain {
            project: Some(p.clone()),
            issue: Some(i.clone()),
            ..Default::default()
        };

        for action in ALL_ACTIONS {
            let targets: Vec<Target> = if action.is_collection() {
                vec![
                    Target::Class(ResourceKind::User),
                    Target::Class(ResourceKind::Project),
                    Target::Class(ResourceKind::Contributor),
                    Target::Class(ResourceKind::Issue),
                    Target::Class(ResourceKind::Comment),
                ]
            } else {
                vec![
                    Target::Object(Resource::User(&u)),
                    Target::Object(Resource::Project(&p)),
                    Target::Object(Resource::Contributor(&m)),
                    Target::Object(Resource::Issue(&i)),
                    Target::Object(Resource::Comment(&c)),
                ]
            };

            for target in targets {
                let decision = decide(ADMIN, action, target, &chain);
                if target.kind() == ResourceKind::Contributor && action.is_update() {
                    assert_eq!(decision, Decision::Deny(DenyReason::ActionNotSupported));
                } else {
                    assert_eq!(decision, Decision::Allow, "{action:?} on {target:?}");
                }
            }
        }
    }

    #[test]
    fn test_contributor_update_not_supported() {
        let m = membership(MEMBER);
        let chain = chain_for(AUTHOR, false);
        for action in [Action::Update, Action::PartialUpdate] {
            assert_eq!(
                decide(AUTHOR, action, Target::Object(Resource::Contributor(&m)), &chain),
                Decision::Deny(DenyReason::ActionNotSupported)
            );
        }
        assert_eq!(
            DenyReason::ActionNotSupported.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn test_contributor_management_requires_project_author() {
        let m = membership(MEMBER);
        let author_chain = chain_for(AUTHOR, false);
        let member_chain = chain_for(MEMBER, false);

        assert!(decide(
            AUTHOR,
            Action::Create,
            Target::Class(ResourceKind::Contributor),
            &author_chain
        )
        .is_allowed());
        assert!(decide(
            AUTHOR,
            Action::Destroy,
            Target::Object(Resource::Contributor(&m)),
            &author_chain
        )
        .is_allowed());

        assert_eq!(
            decide(
                MEMBER,
                Action::Create,
                Target::Class(ResourceKind::Contributor),
                &member_chain
            ),
            Decision::Deny(DenyReason::NotProjectAuthor)
        );
        // Even removing oneself needs the project author
        assert_eq!(
            decide(
                MEMBER,
                Action::Destroy,
                Target::Object(Resource::Contributor(&m)),
                &member_chain
            ),
            Decision::Deny(DenyReason::NotProjectAuthor)
        );
        assert!(decide(
            MEMBER,
            Action::List,
            Target::Class(ResourceKind::Contributor),
            &member_chain
        )
        .is_allowed());
    }

    #[test]
    fn test_issue_author_rules() {
        let own = issue(MEMBER);
        let other = issue(AUTHOR);
        let chain = chain_for(MEMBER, false);

        assert!(decide(MEMBER, Action::Create, Target::Class(ResourceKind::Issue), &chain).is_allowed());
        assert!(decide(MEMBER, Action::PartialUpdate, Target::Object(Resource::Issue(&own)), &chain).is_allowed());
        assert!(decide(MEMBER, Action::Retrieve, Target::Object(Resource::Issue(&other)), &chain).is_allowed());
        assert_eq!(
            decide(MEMBER, Action::PartialUpdate, Target::Object(Resource::Issue(&other)), &chain),
            Decision::Deny(DenyReason::NotAuthor)
        );
        assert_eq!(DenyReason::NotAuthor.code(), "not_author");
        assert_eq!(DenyReason::NotAuthor.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_project_author_is_not_author_of_others_issues() {
        let theirs = issue(MEMBER);
        let chain = chain_for(AUTHOR, false);
        assert_eq!(
            decide(AUTHOR, Action::Destroy, Target::Object(Resource::Issue(&theirs)), &chain),
            Decision::Deny(DenyReason::NotAuthor)
        );
    }

    #[test]
    fn test_assignee_gains_nothing() {
        let i = issue(AUTHOR);
        let chain = chain_for(MEMBER, false);

        assert!(is_assignee(&actor(MEMBER), &i));
        assert_eq!(
            decide(MEMBER, Action::Update, Target::Object(Resource::Issue(&i)), &chain),
            Decision::Deny(DenyReason::NotAuthor)
        );
    }

    #[test]
    fn test_comment_rules() {
        let own = comment(MEMBER);
        let other = comment(AUTHOR);
        let chain = chain_for(MEMBER, true);

        assert!(decide(MEMBER, Action::Create, Target::Class(ResourceKind::Comment), &chain).is_allowed());
        assert!(decide(MEMBER, Action::List, Target::Class(ResourceKind::Comment), &chain).is_allowed());
        assert!(decide(MEMBER, Action::Destroy, Target::Object(Resource::Comment(&own)), &chain).is_allowed());
        assert_eq!(
            decide(MEMBER, Action::Update, Target::Object(Resource::Comment(&other)), &chain),
            Decision::Deny(DenyReason::NotAuthor)
        );
    }

    #[test]
    fn test_owning_project_fails_closed() {
        let chain = chain_for(MEMBER, true);

        let mut stray_issue = issue(MEMBER);
        stray_issue.project_id = 8;
        assert!(owning_project(&Target::Object(Resource::Issue(&stray_issue)), &chain).is_none());
        assert_eq!(
            decide(MEMBER, Action::Retrieve, Target::Object(Resource::Issue(&stray_issue)), &chain),
            Decision::Deny(DenyReason::ResourceNotFound)
        );

        let mut stray_comment = comment(MEMBER);
        stray_comment.issue_id = 4;
        assert!(owning_project(&Target::Object(Resource::Comment(&stray_comment)), &chain).is_none());

        let no_issue = chain_for(MEMBER, false);
        assert!(owning_project(&Target::Class(ResourceKind::Comment), &no_issue).is_none());

        let own_comment = comment(MEMBER);
        assert_eq!(
            owning_project(&Target::Object(Resource::Comment(&own_comment)), &chain).map(|p| p.id),
            Some(7)
        );
    }

    #[test]
    fn test_membership_of_another_project_does_not_count() {
        let p = project();
        let mut chain = chain_for(MEMBER, false);
        if let Some(m) = chain.membership.as_mut() {
            m.project_id = 8;
        }
        assert_eq!(
            decide(MEMBER, Action::Retrieve, Target::Object(Resource::Project(&p)), &chain),
            Decision::Deny(DenyReason::NotContributor)
        );
    }

    #[test]
    fn test_anonymous_access() {
        let chain = ResolvedChain::default();

        assert!(authorize(None, Action::Create, Target::Class(ResourceKind::User), &chain).is_allowed());
        assert_eq!(
            authorize(None, Action::List, Target::Class(ResourceKind::User), &chain),
            Decision::Deny(DenyReason::NotAuthenticated)
        );
        assert_eq!(
            authorize(None, Action::List, Target::Class(ResourceKind::Project), &chain),
            Decision::Deny(DenyReason::NotAuthenticated)
        );
        assert_eq!(
            DenyReason::NotAuthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_user_self_rules() {
        let me = user(MEMBER);
        let someone = user(OUTSIDER);
        let chain = ResolvedChain::default();

        assert!(decide(MEMBER, Action::List, Target::Class(ResourceKind::User), &chain).is_allowed());
        assert!(decide(MEMBER, Action::Retrieve, Target::Object(Resource::User(&someone)), &chain).is_allowed());
        assert!(decide(MEMBER, Action::PartialUpdate, Target::Object(Resource::User(&me)), &chain).is_allowed());
        assert!(decide(MEMBER, Action::Destroy, Target::Object(Resource::User(&me)), &chain).is_allowed());
        assert_eq!(
            decide(MEMBER, Action::Destroy, Target::Object(Resource::User(&someone)), &chain),
            Decision::Deny(DenyReason::NotSelf)
        );
    }

    #[test]
    fn test_target_shape_must_match_action() {
        let p = project();
        let chain = chain_for(AUTHOR, false);
        assert_eq!(
            decide(AUTHOR, Action::List, Target::Object(Resource::Project(&p)), &chain),
            Decision::Deny(DenyReason::ActionNotSupported)
        );
        assert_eq!(
            decide(AUTHOR, Action::Destroy, Target::Class(ResourceKind::Project), &chain),
            Decision::Deny(DenyReason::ActionNotSupported)
        );
    }

    #[test]
    fn test_admin_grant() {
        assert!(authorize_admin_grant(None, false).is_allowed());
        assert_eq!(
            authorize_admin_grant(None, true),
            Decision::Deny(DenyReason::NotAdmin)
        );
        assert_eq!(
            authorize_admin_grant(Some(&actor(MEMBER)), true),
            Decision::Deny(DenyReason::NotAdmin)
        );
        assert!(authorize_admin_grant(Some(&actor(ADMIN)), true).is_allowed());
    }

    #[test]
    fn test_deny_reason_serializes_as_code() {
        for reason in [
            DenyReason::NotAuthenticated,
            DenyReason::NotContributor,
            DenyReason::NotAuthor,
            DenyReason::NotProjectAuthor,
            DenyReason::NotSelf,
            DenyReason::NotAdmin,
            DenyReason::ResourceNotFound,
            DenyReason::ActionNotSupported,
        ] {
            assert_eq!(serde_json::to_value(reason).unwrap(), reason.code());
        }
    }
}
