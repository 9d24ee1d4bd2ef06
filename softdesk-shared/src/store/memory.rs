//! In-memory store
//!
//! Mirrors the PostgreSQL schema closely enough for the API to behave the
//! same on both backends. All state sits behind one `RwLock`, so every
//! operation (including cascades and the project + author membership pair)
//! is atomic.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Comment, Contributor, ContributorFilter, CreateComment, CreateContributor, CreateIssue,
    CreateProject, CreateUser, Issue, IssueFilter, Project, ProjectFilter, UpdateComment,
    UpdateIssue, UpdateProject, UpdateUser, User, UserFilter,
};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    projects: BTreeMap<i64, Project>,
    contributors: BTreeMap<i64, Contributor>,
    issues: BTreeMap<i64, Issue>,

    /// Comments keyed by ID with their insertion sequence for stable ordering
    comments: BTreeMap<Uuid, (u64, Comment)>,

    next_user_id: i64,
    next_project_id: i64,
    next_contributor_id: i64,
    next_issue_id: i64,
    next_comment_seq: u64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email.as_deref() == Some(email) && Some(u.id) != except)
    }

    fn project_name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.projects
            .values()
            .any(|p| p.name == name && Some(p.id) != except)
    }

    fn require_user(&self, id: i64, field: &str) -> StoreResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference(field.to_string()))
        }
    }

    fn remove_issue(&mut self, id: i64) -> bool {
        let removed = self.issues.remove(&id).is_some();
        if removed {
            self.comments.retain(|_, (_, c)| c.issue_id != id);
        }
        removed
    }

    fn remove_project(&mut self, id: i64) -> bool {
        let removed = self.projects.remove(&id).is_some();
        if removed {
            self.contributors.retain(|_, c| c.project_id != id);
            let issue_ids: Vec<i64> = self
                .issues
                .values()
                .filter(|i| i.project_id == id)
                .map(|i| i.id)
                .collect();
            for issue_id in issue_ids {
                self.remove_issue(issue_id);
            }
        }
        removed
    }
}

/// Store backed by in-process maps
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first, ties broken by ID
fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, i64)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;

        if t.username_taken(&data.username, None) {
            return Err(StoreError::UniqueViolation("username".to_string()));
        }
        if let Some(email) = &data.email {
            if t.email_taken(email, None) {
                return Err(StoreError::UniqueViolation("email".to_string()));
            }
        }

        let user = User {
            id: next(&mut t.next_user_id),
            username: data.username,
            email: data.email,
            password_hash: data.password_hash,
            first_name: data.first_name,
            last_name: data.last_name,
            age: data.age,
            is_admin: data.is_admin,
            can_be_contacted: data.can_be_contacted,
            can_data_be_shared: data.can_data_be_shared,
            created_time: Utc::now(),
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t
            .users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn list_users(&self, filter: &UserFilter) -> StoreResult<Vec<User>> {
        let t = self.tables.read().await;
        let mut users: Vec<User> = t.users.values().filter(|u| filter.matches(u)).cloned().collect();
        newest_first(&mut users, |u| (u.created_time, u.id));
        Ok(users)
    }

    async fn update_user(&self, id: i64, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut t = self.tables.write().await;

        let Some(mut user) = t.users.get(&id).cloned() else {
            return Ok(None);
        };
        data.apply(&mut user);

        if t.username_taken(&user.username, Some(id)) {
            return Err(StoreError::UniqueViolation("username".to_string()));
        }
        if let Some(email) = &user.email {
            if t.email_taken(email, Some(id)) {
                return Err(StoreError::UniqueViolation("email".to_string()));
            }
        }

        t.users.insert(id, user.clone());
        Ok(Some(user))
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;

        if t.users.remove(&id).is_none() {
            return Ok(false);
        }

        let authored_projects: Vec<i64> = t
            .projects
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for project_id in authored_projects {
            t.remove_project(project_id);
        }

        let authored_issues: Vec<i64> = t
            .issues
            .values()
            .filter(|i| i.author_id == id)
            .map(|i| i.id)
            .collect();
        for issue_id in authored_issues {
            t.remove_issue(issue_id);
        }

        t.contributors.retain(|_, c| c.user_id != id);
        t.comments.retain(|_, (_, c)| c.author_id != id);
        for issue in t.issues.values_mut() {
            if issue.assignee_id == Some(id) {
                issue.assignee_id = None;
            }
        }

        Ok(true)
    }

    async fn create_project(&self, data: CreateProject) -> StoreResult<(Project, Contributor)> {
        let mut t = self.tables.write().await;

        t.require_user(data.author_id, "author")?;
        if t.project_name_taken(&data.name, None) {
            return Err(StoreError::UniqueViolation("name".to_string()));
        }

        let now = Utc::now();
        let project = Project {
            id: next(&mut t.next_project_id),
            name: data.name,
            project_type: data.project_type,
            description: data.description,
            author_id: data.author_id,
            created_time: now,
        };
        let contributor = Contributor {
            id: next(&mut t.next_contributor_id),
            project_id: project.id,
            user_id: project.author_id,
            created_time: now,
        };

        t.projects.insert(project.id, project.clone());
        t.contributors.insert(contributor.id, contributor.clone());
        Ok((project, contributor))
    }

    async fn find_project(&self, id: i64) -> StoreResult<Option<Project>> {
        Ok(self.tables.read().await.projects.get(&id).cloned())
    }

    async fn find_project_by_name(&self, name: &str) -> StoreResult<Option<Project>> {
        let t = self.tables.read().await;
        Ok(t.projects.values().find(|p| p.name == name).cloned())
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> StoreResult<Vec<Project>> {
        let t = self.tables.read().await;

        let mut projects: Vec<Project> = t
            .projects
            .values()
            .filter(|p| filter.matches_columns(p))
            .filter(|p| {
                filter.author_username.as_deref().map_or(true, |name| {
                    t.users
                        .get(&p.author_id)
                        .map_or(false, |author| author.username == name)
                })
            })
            .filter(|p| {
                filter.member_id.map_or(true, |member| {
                    t.contributors
                        .values()
                        .any(|c| c.project_id == p.id && c.user_id == member)
                })
            })
            .cloned()
            .collect();
        newest_first(&mut projects, |p| (p.created_time, p.id));
        Ok(projects)
    }

    async fn update_project(&self, id: i64, data: UpdateProject) -> StoreResult<Option<Project>> {
        let mut t = self.tables.write().await;

        let Some(mut project) = t.projects.get(&id).cloned() else {
            return Ok(None);
        };
        data.apply(&mut project);

        if t.project_name_taken(&project.name, Some(id)) {
            return Err(StoreError::UniqueViolation("name".to_string()));
        }

        t.projects.insert(id, project.clone());
        Ok(Some(project))
    }

    async fn delete_project(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.remove_project(id))
    }

    async fn create_contributor(&self, data: CreateContributor) -> StoreResult<Contributor> {
        let mut t = self.tables.write().await;

        if !t.projects.contains_key(&data.project_id) {
            return Err(StoreError::MissingReference("project".to_string()));
        }
        t.require_user(data.user_id, "user")?;
        if t
            .contributors
            .values()
            .any(|c| c.project_id == data.project_id && c.user_id == data.user_id)
        {
            return Err(StoreError::UniqueViolation("user".to_string()));
        }

        let contributor = Contributor {
            id: next(&mut t.next_contributor_id),
            project_id: data.project_id,
            user_id: data.user_id,
            created_time: Utc::now(),
        };
        t.contributors.insert(contributor.id, contributor.clone());
        Ok(contributor)
    }

    async fn find_contributor(&self, id: i64) -> StoreResult<Option<Contributor>> {
        Ok(self.tables.read().await.contributors.get(&id).cloned())
    }

    async fn find_membership(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> StoreResult<Option<Contributor>> {
        let t = self.tables.read().await;
        Ok(t
            .contributors
            .values()
            .find(|c| c.project_id == project_id && c.user_id == user_id)
            .cloned())
    }

    async fn list_contributors(
        &self,
        project_id: i64,
        filter: &ContributorFilter,
    ) -> StoreResult<Vec<Contributor>> {
        let t = self.tables.read().await;
        let author_id = t.projects.get(&project_id).map(|p| p.author_id);

        // BTreeMap iteration is ascending by ID, which is join order
        Ok(t
            .contributors
            .values()
            .filter(|c| c.project_id == project_id)
            .filter(|c| filter.id.map_or(true, |id| c.id == id))
            .filter(|c| {
                filter.username.as_deref().map_or(true, |name| {
                    t.users
                        .get(&c.user_id)
                        .map_or(false, |u| u.username == name)
                })
            })
            .filter(|c| {
                filter
                    .is_author
                    .map_or(true, |flag| (Some(c.user_id) == author_id) == flag)
            })
            .cloned()
            .collect())
    }

    async fn delete_contributor(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let Some(removed) = t.contributors.remove(&id) else {
            return Ok(false);
        };

        for issue in t.issues.values_mut() {
            if issue.project_id == removed.project_id && issue.assignee_id == Some(removed.user_id) {
                issue.assignee_id = None;
            }
        }
        Ok(true)
    }

    async fn create_issue(&self, data: CreateIssue) -> StoreResult<Issue> {
        let mut t = self.tables.write().await;

        if !t.projects.contains_key(&data.project_id) {
            return Err(StoreError::MissingReference("project".to_string()));
        }
        t.require_user(data.author_id, "author")?;
        if let Some(assignee_id) = data.assignee_id {
            t.require_user(assignee_id, "assignee")?;
        }

        let issue = Issue {
            id: next(&mut t.next_issue_id),
            title: data.title,
            description: data.description,
            project_id: data.project_id,
            author_id: data.author_id,
            assignee_id: data.assignee_id,
            priority: data.priority,
            label: data.label,
            status: data.status,
            created_time: Utc::now(),
        };
        t.issues.insert(issue.id, issue.clone());
        Ok(issue)
    }

    async fn find_issue(&self, id: i64) -> StoreResult<Option<Issue>> {
        Ok(self.tables.read().await.issues.get(&id).cloned())
    }

    async fn list_issues(&self, project_id: i64, filter: &IssueFilter) -> StoreResult<Vec<Issue>> {
        let t = self.tables.read().await;
        let mut issues: Vec<Issue> = t
            .issues
            .values()
            .filter(|i| i.project_id == project_id && filter.matches(i))
            .cloned()
            .collect();
        newest_first(&mut issues, |i| (i.created_time, i.id));
        Ok(issues)
    }

    async fn count_issues(&self, project_id: i64) -> StoreResult<i64> {
        let t = self.tables.read().await;
        Ok(t.issues.values().filter(|i| i.project_id == project_id).count() as i64)
    }

    async fn update_issue(&self, id: i64, data: UpdateIssue) -> StoreResult<Option<Issue>> {
        let mut t = self.tables.write().await;

        let Some(mut issue) = t.issues.get(&id).cloned() else {
            return Ok(None);
        };
        data.apply(&mut issue);

        if let Some(assignee_id) = issue.assignee_id {
            t.require_user(assignee_id, "assignee")?;
        }

        t.issues.insert(id, issue.clone());
        Ok(Some(issue))
    }

    async fn delete_issue(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.remove_issue(id))
    }

    async fn create_comment(&self, data: CreateComment) -> StoreResult<Comment> {
        let mut t = self.tables.write().await;

        if !t.issues.contains_key(&data.issue_id) {
            return Err(StoreError::MissingReference("issue".to_string()));
        }
        t.require_user(data.author_id, "author")?;

        t.next_comment_seq += 1;
        let seq = t.next_comment_seq;
        let comment = Comment {
            id: Uuid::new_v4(),
            content: data.content,
            issue_id: data.issue_id,
            author_id: data.author_id,
            created_time: Utc::now(),
        };
        t.comments.insert(comment.id, (seq, comment.clone()));
        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let t = self.tables.read().await;
        Ok(t.comments.get(&id).map(|(_, c)| c.clone()))
    }

    async fn list_comments(&self, issue_id: i64) -> StoreResult<Vec<Comment>> {
        let t = self.tables.read().await;
        let mut rows: Vec<&(u64, Comment)> = t
            .comments
            .values()
            .filter(|(_, c)| c.issue_id == issue_id)
            .collect();
        rows.sort_by(|(sa, a), (sb, b)| (b.created_time, sb).cmp(&(a.created_time, sa)));
        Ok(rows.into_iter().map(|(_, c)| c.clone()).collect())
    }

    async fn count_comments(&self, issue_id: i64) -> StoreResult<i64> {
        let t = self.tables.read().await;
        Ok(t
            .comments
            .values()
            .filter(|(_, c)| c.issue_id == issue_id)
            .count() as i64)
    }

    async fn update_comment(&self, id: Uuid, data: UpdateComment) -> StoreResult<Option<Comment>> {
        let mut t = self.tables.write().await;
        Ok(t.comments.get_mut(&id).map(|(_, comment)| {
            data.apply(comment);
            comment.clone()
        }))
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.comments.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssueLabel, IssuePriority, IssueStatus, ProjectType};

    fn new_user(username: &str) -> CreateUser {
        CreateUser {
            username: username.to_string(),
            email: Some(format!("{username}@example.com")),
            password_hash: "hash".to_string(),
            first_name: None,
            last_name: None,
            age: 30,
            is_admin: false,
            can_be_contacted: false,
            can_data_be_shared: false,
        }
    }

    fn new_project(name: &str, author_id: i64) -> CreateProject {
        CreateProject {
            name: name.to_string(),
            project_type: ProjectType::Backend,
            description: None,
            author_id,
        }
    }

    fn new_issue(project_id: i64, author_id: i64, assignee_id: Option<i64>) -> CreateIssue {
        CreateIssue {
            title: "Crash on start".to_string(),
            description: None,
            project_id,
            author_id,
            assignee_id,
            priority: IssuePriority::High,
            label: IssueLabel::Bug,
            status: IssueStatus::Todo,
        }
    }

    #[tokio::test]
    async fn test_unique_username_and_email() {
        let store = MemoryStore::new();
        store.create_user(new_user("ada")).await.unwrap();

        let err = store.create_user(new_user("ada")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(f) if f == "username"));

        let mut other = new_user("grace");
        other.email = Some("ada@example.com".to_string());
        let err = store.create_user(other).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(f) if f == "email"));
    }

    #[tokio::test]
    async fn test_project_creates_author_membership() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada")).await.unwrap();

        let (project, contributor) = store.create_project(new_project("p1", ada.id)).await.unwrap();
        assert_eq!(contributor.project_id, project.id);
        assert_eq!(contributor.user_id, ada.id);
        assert!(store
            .find_membership(project.id, ada.id)
            .await
            .unwrap()
            .is_some());

        let err = store
            .create_project(new_project("p1", ada.id))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(f) if f == "name"));
    }

    #[tokio::test]
    async fn test_duplicate_contributor_rejected() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada")).await.unwrap();
        let bob = store.create_user(new_user("bob")).await.unwrap();
        let (project, _) = store.create_project(new_project("p1", ada.id)).await.unwrap();

        let data = CreateContributor {
            project_id: project.id,
            user_id: bob.id,
        };
        store.create_contributor(data).await.unwrap();
        let err = store.create_contributor(data).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_project_delete_cascades() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada")).await.unwrap();
        let (project, author) = store.create_project(new_project("p1", ada.id)).await.unwrap();
        let issue = store
            .create_issue(new_issue(project.id, ada.id, None))
            .await
            .unwrap();
        let comment = store
            .create_comment(CreateComment {
                content: "seen".to_string(),
                issue_id: issue.id,
                author_id: ada.id,
            })
            .await
            .unwrap();

        assert!(store.delete_project(project.id).await.unwrap());
        assert!(store.find_contributor(author.id).await.unwrap().is_none());
        assert!(store.find_issue(issue.id).await.unwrap().is_none());
        assert!(store.find_comment(comment.id).await.unwrap().is_none());
        assert!(!store.delete_project(project.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_delete_clears_assignee() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada")).await.unwrap();
        let bob = store.create_user(new_user("bob")).await.unwrap();
        let (project, _) = store.create_project(new_project("p1", ada.id)).await.unwrap();
        store
            .create_contributor(CreateContributor {
                project_id: project.id,
                user_id: bob.id,
            })
            .await
            .unwrap();
        let issue = store
            .create_issue(new_issue(project.id, ada.id, Some(bob.id)))
            .await
            .unwrap();

        assert!(store.delete_user(bob.id).await.unwrap());

        let issue = store.find_issue(issue.id).await.unwrap().unwrap();
        assert_eq!(issue.assignee_id, None);
        assert!(store
            .find_membership(project.id, bob.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_comments_newest_first() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada")).await.unwrap();
        let (project, _) = store.create_project(new_project("p1", ada.id)).await.unwrap();
        let issue = store
            .create_issue(new_issue(project.id, ada.id, None))
            .await
            .unwrap();

        for content in ["first", "second", "third"] {
            store
                .create_comment(CreateComment {
                    content: content.to_string(),
                    issue_id: issue.id,
                    author_id: ada.id,
                })
                .await
                .unwrap();
        }

        let contents: Vec<String> = store
            .list_comments(issue.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(contents, vec!["third", "second", "first"]);
        assert_eq!(store.count_comments(issue.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_list_projects_by_member() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada")).await.unwrap();
        let bob = store.create_user(new_user("bob")).await.unwrap();
        store.create_project(new_project("p1", ada.id)).await.unwrap();
        let (p2, _) = store.create_project(new_project("p2", bob.id)).await.unwrap();

        let visible = store
            .list_projects(&ProjectFilter {
                member_id: Some(bob.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, p2.id);

        let by_author = store
            .list_projects(&ProjectFilter {
                author_username: Some("ada".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].name, "p1");
    }

    #[tokio::test]
    async fn test_removing_contributor_unassigns_their_issues() {
        let store = MemoryStore::new();
        let ada = store.create_user(new_user("ada")).await.unwrap();
        let bob = store.create_user(new_user("bob")).await.unwrap();
        let (p1, _) = store.create_project(new_project("p1", ada.id)).await.unwrap();
        let (p2, _) = store.create_project(new_project("p2", ada.id)).await.unwrap();

        let mut memberships = Vec::new();
        for project_id in [p1.id, p2.id] {
            memberships.push(
                store
                    .create_contributor(CreateContributor {
                        project_id,
                        user_id: bob.id,
                    })
                    .await
                    .unwrap(),
            );
        }
        let in_p1 = store
            .create_issue(new_issue(p1.id, ada.id, Some(bob.id)))
            .await
            .unwrap();
        let in_p2 = store
            .create_issue(new_issue(p2.id, ada.id, Some(bob.id)))
            .await
            .unwrap();

        assert!(store.delete_contributor(memberships[0].id).await.unwrap());
        assert!(!store.delete_contributor(memberships[0].id).await.unwrap());

        let in_p1 = store.find_issue(in_p1.id).await.unwrap().unwrap();
        assert_eq!(in_p1.assignee_id, None);

        // Membership elsewhere keeps its assignments
        let in_p2 = store.find_issue(in_p2.id).await.unwrap().unwrap();
        assert_eq!(in_p2.assignee_id, Some(bob.id));
    }
}
