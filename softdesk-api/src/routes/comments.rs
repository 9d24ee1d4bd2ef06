/// Comment endpoints
///
/// Nested under `/v1/projects/:project_id/issues/:issue_id/comments`.
/// Contributors read and create; only a comment's author edits or deletes it.
/// Comment IDs are UUIDs; a malformed ID is reported as not found.

use super::{authorize, loaded, resolve, shape_for, text_field};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, FieldErrors},
    middleware::auth::Caller,
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use softdesk_shared::{
    auth::authorization::{Action, Resource, ResourceKind, Target},
    models::{CreateComment, UpdateComment},
    resolver::{ResolvedChain, ResourcePath},
    views::{render_comment, CommentView},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CommentPayload {
    #[validate(length(min = 1, max = 2048, message = "Content must be 1 to 2048 characters"))]
    pub content: Option<String>,

    /// Optional; must match the issue in the path
    pub issue: Option<i64>,
}

type CommentPath = Result<Path<(i64, i64, Uuid)>, PathRejection>;

async fn resolve_comment(
    state: &AppState,
    caller: &Caller,
    path: CommentPath,
) -> ApiResult<ResolvedChain> {
    caller.require()?;
    let Path((project_id, issue_id, comment_id)) = path?;
    resolve(
        state,
        caller,
        ResourcePath::comment(project_id, issue_id, comment_id),
    )
    .await
}

fn check_issue(payload: &CommentPayload, issue_id: i64, errors: &mut FieldErrors) {
    if payload.issue.is_some_and(|id| id != issue_id) {
        errors.add("issue", "Issue does not match the URL");
    }
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((project_id, issue_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Vec<CommentView>>> {
    caller.require()?;
    let chain = resolve(&state, &caller, ResourcePath::issue(project_id, issue_id)).await?;
    authorize(&caller, Action::List, Target::Class(ResourceKind::Comment), &chain)?;
    let issue = loaded(chain.issue.as_ref(), ResourceKind::Issue)?;

    let shape = shape_for(ResourceKind::Comment, Action::List);
    let comments = state.store.list_comments(issue.id).await?;

    Ok(Json(comments.iter().map(|c| render_comment(shape, c)).collect()))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((project_id, issue_id)): Path<(i64, i64)>,
    payload: Result<Json<CommentPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CommentView>)> {
    let auth = caller.require()?;
    let chain = resolve(&state, &caller, ResourcePath::issue(project_id, issue_id)).await?;
    authorize(&caller, Action::Create, Target::Class(ResourceKind::Comment), &chain)?;
    let issue = loaded(chain.issue.as_ref(), ResourceKind::Issue)?;
    let Json(payload) = payload?;

    let mut errors = FieldErrors::new();
    if let Err(e) = payload.validate() {
        errors.merge(e);
    }
    let content = text_field(&mut errors, "content", payload.content.as_deref(), true);
    check_issue(&payload, issue.id, &mut errors);
    errors.into_result()?;
    let Some(content) = content else {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    };

    let comment = state
        .store
        .create_comment(CreateComment {
            content,
            issue_id: issue.id,
            author_id: auth.user_id,
        })
        .await?;

    tracing::info!(
        issue_id = issue.id,
        comment_id = %comment.id,
        author_id = auth.user_id,
        "Comment created"
    );

    let shape = shape_for(ResourceKind::Comment, Action::Create);
    Ok((StatusCode::CREATED, Json(render_comment(shape, &comment))))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    path: CommentPath,
) -> ApiResult<Json<CommentView>> {
    let chain = resolve_comment(&state, &caller, path).await?;
    let comment = loaded(chain.comment.as_ref(), ResourceKind::Comment)?;
    authorize(
        &caller,
        Action::Retrieve,
        Target::Object(Resource::Comment(comment)),
        &chain,
    )?;

    let shape = shape_for(ResourceKind::Comment, Action::Retrieve);
    Ok(Json(render_comment(shape, comment)))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    path: CommentPath,
    payload: Result<Json<CommentPayload>, JsonRejection>,
) -> ApiResult<Json<CommentView>> {
    save_comment(&state, &caller, path, payload, Action::Update).await
}

pub async fn partial_update_comment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    path: CommentPath,
    payload: Result<Json<CommentPayload>, JsonRejection>,
) -> ApiResult<Json<CommentView>> {
    save_comment(&state, &caller, path, payload, Action::PartialUpdate).await
}

async fn save_comment(
    state: &AppState,
    caller: &Caller,
    path: CommentPath,
    payload: Result<Json<CommentPayload>, JsonRejection>,
    action: Action,
) -> ApiResult<Json<CommentView>> {
    let chain = resolve_comment(state, caller, path).await?;
    let comment = loaded(chain.comment.as_ref(), ResourceKind::Comment)?;
    authorize(caller, action, Target::Object(Resource::Comment(comment)), &chain)?;
    let Json(payload) = payload?;

    let mut errors = FieldErrors::new();
    if let Err(e) = payload.validate() {
        errors.merge(e);
    }
    let content = text_field(
        &mut errors,
        "content",
        payload.content.as_deref(),
        action == Action::Update,
    );
    check_issue(&payload, comment.issue_id, &mut errors);
    errors.into_result()?;

    let updated = state
        .store
        .update_comment(comment.id, UpdateComment { content })
        .await?
        .ok_or_else(|| ApiError::NotFound("comment not found".to_string()))?;

    tracing::info!(comment_id = %updated.id, "Comment updated");

    let shape = shape_for(ResourceKind::Comment, action);
    Ok(Json(render_comment(shape, &updated)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    path: CommentPath,
) -> ApiResult<StatusCode> {
    let chain = resolve_comment(&state, &caller, path).await?;
    let comment = loaded(chain.comment.as_ref(), ResourceKind::Comment)?;
    authorize(
        &caller,
        Action::Destroy,
        Target::Object(Resource::Comment(comment)),
        &chain,
    )?;

    state.store.delete_comment(comment.id).await?;
    tracing::info!(comment_id = %comment.id, "Comment deleted");

    Ok(StatusCode::NO_CONTENT)
}
