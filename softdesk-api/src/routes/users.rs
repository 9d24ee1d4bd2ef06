/// User endpoints
///
/// - `GET    /v1/users`: list users (authenticated)
/// - `POST   /v1/users`: create a user (open; only admins may create admins)
/// - `GET    /v1/users/:user_id`: retrieve
/// - `PUT    /v1/users/:user_id`: update (self or admin)
/// - `PATCH  /v1/users/:user_id`: partial update (self or admin)
/// - `DELETE /v1/users/:user_id`: delete with everything the user authored
///
/// `PUT` requires `username` and `age`; omitted nullable fields are cleared.
/// `PATCH` only touches the fields present in the body. On both, an explicit
/// `null` clears `email`, `first_name` or `last_name`.

use super::{authorize, double_option, shape_for, text_field};
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
    auth::{
        authorization::{authorize_admin_grant, Action, Resource, ResourceKind, Target},
        password,
    },
    models::{CreateUser, UpdateUser, User, UserFilter},
    resolver::ResolvedChain,
    views::{render_user, UserView},
};
use validator::Validate;

/// Body of user create, update and registration requests
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserPayload {
    #[validate(length(min = 1, max = 100, message = "Username must be 1 to 100 characters"))]
    pub username: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(email(message = "Enter a valid email address"))]
    pub email: Option<Option<String>>,

    pub password: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 30, message = "First name must be at most 30 characters"))]
    pub first_name: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 30, message = "Last name must be at most 30 characters"))]
    pub last_name: Option<Option<String>>,

    #[validate(range(min = 15, max = 99, message = "Age must be between 15 and 99"))]
    pub age: Option<i32>,

    pub is_admin: Option<bool>,
    pub can_be_contacted: Option<bool>,
    pub can_data_be_shared: Option<bool>,
}

/// Field checks that need the store: duplicate username and email
async fn check_unique(
    state: &AppState,
    username: Option<&str>,
    payload: &UserPayload,
    current: Option<i64>,
    errors: &mut FieldErrors,
) -> ApiResult<()> {
    if let Some(username) = username {
        if let Some(existing) = state.store.find_user_by_username(username).await? {
            if Some(existing.id) != current {
                errors.add("username", "A user with that username already exists");
            }
        }
    }

    if let Some(Some(email)) = &payload.email {
        if let Some(existing) = state.store.find_user_by_email(email).await? {
            if Some(existing.id) != current {
                errors.add("email", "A user with that email already exists");
            }
        }
    }

    Ok(())
}

fn check_password(password: &str, errors: &mut FieldErrors) {
    for problem in password::password_weaknesses(password) {
        errors.add("password", problem);
    }
}

/// Creates a user from a validated payload
///
/// Shared by `POST /v1/users` and `POST /v1/auth/register`.
pub(crate) async fn register_user(
    state: &AppState,
    caller: &Caller,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<User> {
    authorize(
        caller,
        Action::Create,
        Target::Class(ResourceKind::User),
        &ResolvedChain::default(),
    )?;
    let Json(payload) = payload?;
    authorize_admin_grant(caller.actor().as_ref(), payload.is_admin == Some(true))
        .into_result()?;

    let mut errors = FieldErrors::new();
    if let Err(e) = payload.validate() {
        errors.merge(e);
    }
    let username = text_field(&mut errors, "username", payload.username.as_deref(), true);
    let password = errors.require("password", payload.password.clone());
    let age = errors.require("age", payload.age);
    if let Some(password) = &password {
        check_password(password, &mut errors);
    }
    check_unique(state, username.as_deref(), &payload, None, &mut errors).await?;
    errors.into_result()?;

    let (Some(username), Some(password), Some(age)) = (username, password, age) else {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    };

    let password_hash = password::hash_password(&password)?;

    let user = state
        .store
        .create_user(CreateUser {
            username,
            email: payload.email.flatten(),
            password_hash,
            first_name: payload.first_name.flatten(),
            last_name: payload.last_name.flatten(),
            age,
            is_admin: payload.is_admin.unwrap_or(false),
            can_be_contacted: payload.can_be_contacted.unwrap_or(false),
            can_data_be_shared: payload.can_data_be_shared.unwrap_or(false),
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User created");
    Ok(user)
}

async fn load_user(state: &AppState, user_id: i64) -> ApiResult<User> {
    state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<UserFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<UserView>>> {
    authorize(
        &caller,
        Action::List,
        Target::Class(ResourceKind::User),
        &ResolvedChain::default(),
    )?;
    let Query(filter) = query?;

    let shape = shape_for(ResourceKind::User, Action::List);
    let users = state.store.list_users(&filter).await?;

    Ok(Json(users.iter().map(|u| render_user(shape, u)).collect()))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    let user = register_user(&state, &caller, payload).await?;

    let shape = shape_for(ResourceKind::User, Action::Create);
    Ok((StatusCode::CREATED, Json(render_user(shape, &user))))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<UserView>> {
    caller.require()?;
    let user = load_user(&state, user_id).await?;
    authorize(
        &caller,
        Action::Retrieve,
        Target::Object(Resource::User(&user)),
        &ResolvedChain::default(),
    )?;

    let shape = shape_for(ResourceKind::User, Action::Retrieve);
    Ok(Json(render_user(shape, &user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(user_id): Path<i64>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<Json<UserView>> {
    save_user(&state, &caller, user_id, payload, Action::Update).await
}

pub async fn partial_update_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(user_id): Path<i64>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<Json<UserView>> {
    save_user(&state, &caller, user_id, payload, Action::PartialUpdate).await
}

async fn save_user(
    state: &AppState,
    caller: &Caller,
    user_id: i64,
    payload: Result<Json<UserPayload>, JsonRejection>,
    action: Action,
) -> ApiResult<Json<UserView>> {
    caller.require()?;
    let user = load_user(state, user_id).await?;
    authorize(
        caller,
        action,
        Target::Object(Resource::User(&user)),
        &ResolvedChain::default(),
    )?;
    let Json(payload) = payload?;
    let grants_admin = payload.is_admin == Some(true) && !user.is_admin;
    authorize_admin_grant(caller.actor().as_ref(), grants_admin).into_result()?;

    let full = action == Action::Update;

    let mut errors = FieldErrors::new();
    if let Err(e) = payload.validate() {
        errors.merge(e);
    }
    let username = text_field(&mut errors, "username", payload.username.as_deref(), full);
    if full {
        errors.require("age", payload.age);
    }
    if let Some(password) = &payload.password {
        check_password(password, &mut errors);
    }
    check_unique(state, username.as_deref(), &payload, Some(user.id), &mut errors).await?;
    errors.into_result()?;

    let password_hash = match &payload.password {
        Some(password) => Some(password::hash_password(password)?),
        None => None,
    };

    // A full update clears omitted nullable fields
    let nullable = |value: Option<Option<String>>| {
        if full {
            Some(value.flatten())
        } else {
            value
        }
    };

    let data = UpdateUser {
        username,
        email: nullable(payload.email.clone()),
        password_hash,
        first_name: nullable(payload.first_name.clone()),
        last_name: nullable(payload.last_name.clone()),
        age: payload.age,
        is_admin: payload.is_admin,
        can_be_contacted: payload.can_be_contacted,
        can_data_be_shared: payload.can_data_be_shared,
    };

    let user = state
        .store
        .update_user(user.id, data)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    tracing::info!(user_id = user.id, "User updated");

    let shape = shape_for(ResourceKind::User, action);
    Ok(Json(render_user(shape, &user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(user_id): Path<i64>,
) -> ApiResult<StatusCode> {
    caller.require()?;
    let user = load_user(&state, user_id).await?;
    authorize(
        &caller,
        Action::Destroy,
        Target::Object(Resource::User(&user)),
        &ResolvedChain::default(),
    )?;

    state.store.delete_user(user.id).await?;
    tracing::info!(user_id = user.id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}
