/// Project endpoints
///
/// - `GET    /v1/projects`: projects the caller contributes to (admins see all)
/// - `POST   /v1/projects`: create; the caller becomes author and first contributor
/// - `GET    /v1/projects/:project_id`: contributors only
/// - `PUT`/`PATCH /v1/projects/:project_id`: author only
/// - `DELETE /v1/projects/:project_id`: author only; cascades to contributors,
///   issues and comments

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
    models::{CreateProject, Project, ProjectFilter, ProjectType, UpdateProject},
    resolver::{ResolvedChain, ResourcePath},
    views::{render_project, ProjectView},
};
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProjectPayload {
    #[validate(length(min = 1, max = 128, message = "Name must be 1 to 128 characters"))]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub project_type: Option<ProjectType>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

async fn check_name(
    state: &AppState,
    name: Option<&str>,
    current: Option<i64>,
    errors: &mut FieldErrors,
) -> ApiResult<()> {
    if let Some(name) = name {
        if let Some(existing) = state.store.find_project_by_name(name).await? {
            if Some(existing.id) != current {
                errors.add("name", "A project with that name already exists");
            }
        }
    }
    Ok(())
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<ProjectFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<ProjectView>>> {
    let auth = caller.require()?;
    authorize(
        &caller,
        Action::List,
        Target::Class(ResourceKind::Project),
        &ResolvedChain::default(),
    )?;
    let Query(mut filter) = query?;
    filter.member_id = (!auth.is_admin).then_some(auth.user_id);

    let shape = shape_for(ResourceKind::Project, Action::List);
    let mut views = Vec::new();
    for project in state.store.list_projects(&filter).await? {
        views.push(render_project(state.store.as_ref(), shape, &project).await?);
    }

    Ok(Json(views))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<ProjectPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProjectView>)> {
    authorize(
        &caller,
        Action::Create,
        Target::Class(ResourceKind::Project),
        &ResolvedChain::default(),
    )?;
    let auth = caller.require()?;
    let Json(payload) = payload?;

    let mut errors = FieldErrors::new();
    if let Err(e) = payload.validate() {
        errors.merge(e);
    }
    let name = text_field(&mut errors, "name", payload.name.as_deref(), true);
    let project_type = errors.require("type", payload.project_type);
    check_name(&state, name.as_deref(), None, &mut errors).await?;
    errors.into_result()?;
    let (Some(name), Some(project_type)) = (name, project_type) else {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    };

    let (project, contributor) = state
        .store
        .create_project(CreateProject {
            name,
            project_type,
            description: payload.description.flatten(),
            author_id: auth.user_id,
        })
        .await?;

    tracing::info!(
        project_id = project.id,
        contributor_id = contributor.id,
        author_id = auth.user_id,
        "Project created"
    );

    let shape = shape_for(ResourceKind::Project, Action::Create);
    let view = render_project(state.store.as_ref(), shape, &project).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(project_id): Path<i64>,
) -> ApiResult<Json<ProjectView>> {
    caller.require()?;
    let chain = resolve(&state, &caller, ResourcePath::project(project_id)).await?;
    let project = loaded(chain.project.as_ref(), ResourceKind::Project)?;
    authorize(
        &caller,
        Action::Retrieve,
        Target::Object(Resource::Project(project)),
        &chain,
    )?;

    let shape = shape_for(ResourceKind::Project, Action::Retrieve);
    Ok(Json(render_project(state.store.as_ref(), shape, project).await?))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(project_id): Path<i64>,
    payload: Result<Json<ProjectPayload>, JsonRejection>,
) -> ApiResult<Json<ProjectView>> {
    save_project(&state, &caller, project_id, payload, Action::Update).await
}

pub async fn partial_update_project(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(project_id): Path<i64>,
    payload: Result<Json<ProjectPayload>, JsonRejection>,
) -> ApiResult<Json<ProjectView>> {
    save_project(&state, &caller, project_id, payload, Action::PartialUpdate).await
}

async fn save_project(
    state: &AppState,
    caller: &Caller,
    project_id: i64,
    payload: Result<Json<ProjectPayload>, JsonRejection>,
    action: Action,
) -> ApiResult<Json<ProjectView>> {
    caller.require()?;
    let chain = resolve(state, caller, ResourcePath::project(project_id)).await?;
    let project: &Project = loaded(chain.project.as_ref(), ResourceKind::Project)?;
    authorize(caller, action, Target::Object(Resource::Project(project)), &chain)?;
    let Json(payload) = payload?;

    let full = action == Action::Update;

    let mut errors = FieldErrors::new();
    if let Err(e) = payload.validate() {
        errors.merge(e);
    }
    let name = text_field(&mut errors, "name", payload.name.as_deref(), full);
    if full {
        errors.require("type", payload.project_type);
    }
    check_name(state, name.as_deref(), Some(project.id), &mut errors).await?;
    errors.into_result()?;

    let description = if full {
        Some(payload.description.flatten())
    } else {
        payload.description
    };

    let updated = state
        .store
        .update_project(
            project.id,
            UpdateProject {
                name,
                project_type: payload.project_type,
                description,
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("project not found".to_string()))?;

    tracing::info!(project_id = updated.id, "Project updated");

    let shape = shape_for(ResourceKind::Project, action);
    Ok(Json(render_project(state.store.as_ref(), shape, &updated).await?))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(project_id): Path<i64>,
) -> ApiResult<StatusCode> {
    caller.require()?;
    let chain = resolve(&state, &caller, ResourcePath::project(project_id)).await?;
    let project = loaded(chain.project.as_ref(), ResourceKind::Project)?;
    authorize(
        &caller,
        Action::Destroy,
        Target::Object(Resource::Project(project)),
        &chain,
    )?;

    state.store.delete_project(project.id).await?;
    tracing::info!(project_id = project.id, "Project deleted");

    Ok(StatusCode::NO_CONTENT)
}
