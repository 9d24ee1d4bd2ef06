/// Contributor endpoints
///
/// - `GET    /v1/projects/:project_id/contributors`: contributors of the project
/// - `POST   /v1/projects/:project_id/contributors`: project author adds a user
/// - `GET    /v1/projects/:project_id/contributors/:contributor_id`
/// - `DELETE /v1/projects/:project_id/contributors/:contributor_id`: project
///   author removes a contributor (never the author)
///
/// Memberships are never edited in place; `PUT`/`PATCH` answer 405.

use super::{authorize, loaded, resolve, shape_for};
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
    auth::authorization::{Action, DenyReason, Resource, ResourceKind, Target},
    models::{ContributorFilter, CreateContributor},
    resolver::ResourcePath,
    views::{render_contributor, ContributorView},
};

#[derive(Debug, Default, Deserialize)]
pub struct ContributorPayload {
    /// ID of the user to add
    pub user: Option<i64>,

    /// Optional; must match the project in the path
    pub project: Option<i64>,
}

pub async fn list_contributors(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(project_id): Path<i64>,
    query: Result<Query<ContributorFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<ContributorView>>> {
    caller.require()?;
    let chain = resolve(&state, &caller, ResourcePath::project(project_id)).await?;
    authorize(
        &caller,
        Action::List,
        Target::Class(ResourceKind::Contributor),
        &chain,
    )?;
    let project = loaded(chain.project.as_ref(), ResourceKind::Project)?;
    let Query(filter) = query?;

    let shape = shape_for(ResourceKind::Contributor, Action::List);
    let mut views = Vec::new();
    for contributor in state.store.list_contributors(project.id, &filter).await? {
        views.push(render_contributor(state.store.as_ref(), shape, &contributor, project).await?);
    }

    Ok(Json(views))
}

pub async fn add_contributor(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(project_id): Path<i64>,
    payload: Result<Json<ContributorPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ContributorView>)> {
    caller.require()?;
    let chain = resolve(&state, &caller, ResourcePath::project(project_id)).await?;
    authorize(
        &caller,
        Action::Create,
        Target::Class(ResourceKind::Contributor),
        &chain,
    )?;
    let project = loaded(chain.project.as_ref(), ResourceKind::Project)?;
    let Json(payload) = payload?;

    let mut errors = FieldErrors::new();
    if payload.project.is_some_and(|id| id != project.id) {
        errors.add("project", "Project does not match the URL");
    }
    if let Some(user_id) = errors.require("user", payload.user) {
        if state.store.find_user(user_id).await?.is_none() {
            errors.add("user", "User does not exist");
        } else if state
            .store
            .find_membership(project.id, user_id)
            .await?
            .is_some()
        {
            errors.add("user", "This user is already a contributor of the project");
        }
    }
    errors.into_result()?;
    let Some(user_id) = payload.user else {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    };

    let contributor = state
        .store
        .create_contributor(CreateContributor {
            project_id: project.id,
            user_id,
        })
        .await?;

    tracing::info!(
        project_id = project.id,
        contributor_id = contributor.id,
        user_id,
        "Contributor added"
    );

    let shape = shape_for(ResourceKind::Contributor, Action::Create);
    let view = render_contributor(state.store.as_ref(), shape, &contributor, project).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_contributor(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((project_id, contributor_id)): Path<(i64, i64)>,
) -> ApiResult<Json<ContributorView>> {
    caller.require()?;
    let chain = resolve(
        &state,
        &caller,
        ResourcePath::contributor(project_id, contributor_id),
    )
    .await?;
    let contributor = loaded(chain.contributor.as_ref(), ResourceKind::Contributor)?;
    authorize(
        &caller,
        Action::Retrieve,
        Target::Object(Resource::Contributor(contributor)),
        &chain,
    )?;
    let project = loaded(chain.project.as_ref(), ResourceKind::Project)?;

    let shape = shape_for(ResourceKind::Contributor, Action::Retrieve);
    let view = render_contributor(state.store.as_ref(), shape, contributor, project).await?;
    Ok(Json(view))
}

/// Always refused by the authorization engine
pub async fn update_contributor(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((project_id, contributor_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    caller.require()?;
    let chain = resolve(
        &state,
        &caller,
        ResourcePath::contributor(project_id, contributor_id),
    )
    .await?;
    let contributor = loaded(chain.contributor.as_ref(), ResourceKind::Contributor)?;
    authorize(
        &caller,
        Action::Update,
        Target::Object(Resource::Contributor(contributor)),
        &chain,
    )?;

    Err(ApiError::Denied(DenyReason::ActionNotSupported))
}

pub async fn remove_contributor(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((project_id, contributor_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    caller.require()?;
    let chain = resolve(
        &state,
        &caller,
        ResourcePath::contributor(project_id, contributor_id),
    )
    .await?;
    let contributor = loaded(chain.contributor.as_ref(), ResourceKind::Contributor)?;
    authorize(
        &caller,
        Action::Destroy,
        Target::Object(Resource::Contributor(contributor)),
        &chain,
    )?;
    let project = loaded(chain.project.as_ref(), ResourceKind::Project)?;

    if contributor.is_author(project) {
        return Err(ApiError::field(
            "user",
            "The project author cannot be removed from the project",
        ));
    }

    state.store.delete_contributor(contributor.id).await?;
    tracing::info!(
        project_id = project.id,
        contributor_id = contributor.id,
        "Contributor removed"
    );

    Ok(StatusCode::NO_CONTENT)
}
