/// Issue endpoints
///
/// - `GET    /v1/projects/:project_id/issues`: newest first, filterable by
///   `priority`, `label`, `status` and `assignee_id`
/// - `POST   /v1/projects/:project_id/issues`: any contributor
/// - `GET    /v1/projects/:project_id/issues/:issue_id`
/// - `PUT`/`PATCH /v1/projects/:project_id/issues/:issue_id`: issue author only
/// - `DELETE /v1/projects/:project_id/issues/:issue_id`: issue author only
///
/// The assignee, when set, must be a contributor of the project.

use super::{authorize, double_option, loaded, resolve, shape_for, text_field};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, FieldErrors},
    middleware::auth::Caller,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use softdesk_shared::{
    auth::authorization::{Action, Resource, ResourceKind, Target},
    models::{CreateIssue, IssueFilter, IssueLabel, IssuePriority, IssueStatus, Project, UpdateIssue},
    resolver::ResourcePath,
    views::{render_issue, IssueView},
};
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct IssuePayload {
    #[validate(length(min = 1, max = 128, message = "Title must be 1 to 128 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub priority: Option<IssuePriority>,
    pub label: Option<IssueLabel>,
    pub status: Option<IssueStatus>,

    /// User ID of the assignee; `null` unassigns
    #[serde(default, deserialize_with = "double_option")]
    pub assignee: Option<Option<i64>>,

    /// Optional; must match the project in the path
    pub project: Option<i64>,
}

/// Checks shared by create and update
async fn check_references(
    state: &AppState,
    payload: &IssuePayload,
    project: &Project,
    errors: &mut FieldErrors,
) -> ApiResult<()> {
    if payload.project.is_some_and(|id| id != project.id) {
        errors.add("project", "Project does not match the URL");
    }

    if let Some(Some(assignee_id)) = payload.assignee {
        if state
            .store
            .find_membership(project.id, assignee_id)
            .await?
            .is_none()
        {
            errors.add("assignee", "Assignee must be a contributor of the project");
        }
    }

    Ok(())
}

pub async fn list_issues(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(project_id): Path<i64>,
    query: Result<Query<IssueFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<IssueView>>> {
    caller.require()?;
    let chain = resolve(&state, &caller, ResourcePath::project(project_id)).await?;
    authorize(&caller, Action::List, Target::Class(ResourceKind::Issue), &chain)?;
    let project = loaded(chain.project.as_ref(), ResourceKind::Project)?;
    let Query(filter) = query?;

    let shape = shape_for(ResourceKind::Issue, Action::List);
    let mut views = Vec::new();
    for issue in state.store.list_issues(project.id, &filter).await? {
        views.push(render_issue(state.store.as_ref(), shape, &issue).await?);
    }

    Ok(Json(views))
}

pub async fn create_issue(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(project_id): Path<i64>,
    payload: Result<Json<IssuePayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<IssueView>)> {
    let auth = caller.require()?;
    let chain = resolve(&state, &caller, ResourcePath::project(project_id)).await?;
    authorize(&caller, Action::Create, Target::Class(ResourceKind::Issue), &chain)?;
    let project = loaded(chain.project.as_ref(), ResourceKind::Project)?;
    let Json(payload) = payload?;

    let mut errors = FieldErrors::new();
    if let Err(e) = payload.validate() {
        errors.merge(e);
    }
    let title = text_field(&mut errors, "title", payload.title.as_deref(), true);
    let priority = errors.require("priority", payload.priority);
    let label = errors.require("label", payload.label);
    check_references(&state, &payload, project, &mut errors).await?;
    errors.into_result()?;
    let (Some(title), Some(priority), Some(label)) = (title, priority, label) else {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    };

    let issue = state
        .store
        .create_issue(CreateIssue {
            title,
            description: payload.description.flatten(),
            project_id: project.id,
            author_id: auth.user_id,
            assignee_id: payload.assignee.flatten(),
            priority,
            label,
            status: payload.status.unwrap_or_default(),
        })
        .await?;

    tracing::info!(
        project_id = project.id,
        issue_id = issue.id,
        author_id = auth.user_id,
        "Issue created"
    );

    let shape = shape_for(ResourceKind::Issue, Action::Create);
    let view = render_issue(state.store.as_ref(), shape, &issue).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_issue(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((project_id, issue_id)): Path<(i64, i64)>,
) -> ApiResult<Json<IssueView>> {
    caller.require()?;
    let chain = resolve(&state, &caller, ResourcePath::issue(project_id, issue_id)).await?;
    let issue = loaded(chain.issue.as_ref(), ResourceKind::Issue)?;
    authorize(
        &caller,
        Action::Retrieve,
        Target::Object(Resource::Issue(issue)),
        &chain,
    )?;

    let shape = shape_for(ResourceKind::Issue, Action::Retrieve);
    Ok(Json(render_issue(state.store.as_ref(), shape, issue).await?))
}

pub async fn update_issue(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((project_id, issue_id)): Path<(i64, i64)>,
    payload: Result<Json<IssuePayload>, JsonRejection>,
) -> ApiResult<Json<IssueView>> {
    save_issue(&state, &caller, (project_id, issue_id), payload, Action::Update).await
}

pub async fn partial_update_issue(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((project_id, issue_id)): Path<(i64, i64)>,
    payload: Result<Json<IssuePayload>, JsonRejection>,
) -> ApiResult<Json<IssueView>> {
    save_issue(
        &state,
        &caller,
        (project_id, issue_id),
        payload,
        Action::PartialUpdate,
    )
    .await
}

async fn save_issue(
    state: &AppState,
    caller: &Caller,
    (project_id, issue_id): (i64, i64),
    payload: Result<Json<IssuePayload>, JsonRejection>,
    action: Action,
) -> ApiResult<Json<IssueView>> {
    caller.require()?;
    let chain = resolve(state, caller, ResourcePath::issue(project_id, issue_id)).await?;
    let issue = loaded(chain.issue.as_ref(), ResourceKind::Issue)?;
    authorize(caller, action, Target::Object(Resource::Issue(issue)), &chain)?;
    let project = loaded(chain.project.as_ref(), ResourceKind::Project)?;
    let Json(payload) = payload?;

    let full = action == Action::Update;

    let mut errors = FieldErrors::new();
    if let Err(e) = payload.validate() {
        errors.merge(e);
    }
    let title = text_field(&mut errors, "title", payload.title.as_deref(), full);
    if full {
        errors.require("priority", payload.priority);
        errors.require("label", payload.label);
    }
    check_references(state, &payload, project, &mut errors).await?;
    errors.into_result()?;

    // Status is unconstrained: any authorized update may set any value
    let data = if full {
        UpdateIssue {
            title,
            description: Some(payload.description.flatten()),
            assignee_id: Some(payload.assignee.flatten()),
            priority: payload.priority,
            label: payload.label,
            status: payload.status,
        }
    } else {
        UpdateIssue {
            title,
            description: payload.description,
            assignee_id: payload.assignee,
            priority: payload.priority,
            label: payload.label,
            status: payload.status,
        }
    };

    let updated = state
        .store
        .update_issue(issue.id, data)
        .await?
        .ok_or_else(|| ApiError::NotFound("issue not found".to_string()))?;

    tracing::info!(
        project_id = project.id,
        issue_id = updated.id,
        status = updated.status.as_str(),
        "Issue updated"
    );

    let shape = shape_for(ResourceKind::Issue, action);
    Ok(Json(render_issue(state.store.as_ref(), shape, &updated).await?))
}

pub async fn delete_issue(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((project_id, issue_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    caller.require()?;
    let chain = resolve(&state, &caller, ResourcePath::issue(project_id, issue_id)).await?;
    let issue = loaded(chain.issue.as_ref(), ResourceKind::Issue)?;
    authorize(
        &caller,
        Action::Destroy,
        Target::Object(Resource::Issue(issue)),
        &chain,
    )?;

    state.store.delete_issue(issue.id).await?;
    tracing::info!(project_id, issue_id = issue.id, "Issue deleted");

    Ok(StatusCode::NO_CONTENT)
}
