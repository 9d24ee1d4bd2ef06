/// Authentication endpoints
///
/// - `POST /v1/auth/register`: self-registration, returns the new user
/// - `POST /v1/auth/login`: exchange username and password for tokens
/// - `POST /v1/auth/refresh`: exchange a refresh token for an access token

use super::{shape_for, users};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, FieldErrors},
    middleware::auth::Caller,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use softdesk_shared::{
    auth::{
        authorization::{Action, ResourceKind},
        jwt, password,
    },
    views::{render_user, UserView},
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Register a new account
///
/// ```text
/// POST /v1/auth/register
///
/// {
///   "username": "ada",
///   "password": "Str0ng!Pass",
///   "age": 36,
///   "can_be_contacted": true
/// }
/// ```
///
/// Returns `201` with the user's detail view. Anonymous callers cannot set
/// `is_admin`.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<users::UserPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    let user = users::register_user(&state, &Caller::default(), payload).await?;

    let shape = shape_for(ResourceKind::User, Action::Create);
    Ok((StatusCode::CREATED, Json(render_user(shape, &user))))
}

/// Log in
///
/// Unknown usernames and wrong passwords get the same 401.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<TokenPair>> {
    let Json(req) = payload?;

    let mut errors = FieldErrors::new();
    let username = errors.require("username", req.username);
    let password = errors.require("password", req.password);
    errors.into_result()?;
    let (Some(username), Some(password)) = (username, password) else {
        return Err(ApiError::BadRequest("Missing credentials".to_string()));
    };

    let invalid = || ApiError::Unauthorized("Invalid username or password".to_string());

    let user = state
        .store
        .find_user_by_username(username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&password, &user.password_hash)? {
        tracing::debug!(user_id = user.id, "Login rejected");
        return Err(invalid());
    }

    let access = jwt::create_token(
        &jwt::Claims::new(user.id, jwt::TokenType::Access),
        state.jwt_secret(),
    )?;
    let refresh = jwt::create_token(
        &jwt::Claims::new(user.id, jwt::TokenType::Refresh),
        state.jwt_secret(),
    )?;

    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(TokenPair { access, refresh }))
}

/// Refresh an access token
///
/// The refresh token's user must still exist.
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<RefreshResponse>> {
    let Json(req) = payload?;
    let token = req
        .refresh
        .ok_or_else(|| ApiError::field("refresh", "This field is required"))?;

    let claims = jwt::validate_refresh_token(&token, state.jwt_secret())?;
    if state.store.find_user(claims.sub).await?.is_none() {
        return Err(ApiError::Unauthorized("User no longer exists".to_string()));
    }

    let access = jwt::refresh_access_token(&token, state.jwt_secret())?;
    Ok(Json(RefreshResponse { access }))
}
