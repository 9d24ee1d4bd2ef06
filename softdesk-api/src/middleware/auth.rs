/// Bearer token authentication
///
/// Runs in front of every `/v1` resource route. A request without an
/// `Authorization` header passes through as anonymous, so the authorization
/// engine decides what anonymous callers may do (only user registration).
/// A header that is present but invalid is rejected with 401.
///
/// Handlers receive the result as `Extension<Caller>`.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use softdesk_shared::auth::{
    authorization::{Actor, DenyReason},
    middleware::{authenticate, AuthContext},
};

/// The caller of a request, if authenticated
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Option<AuthContext>);

impl Caller {
    pub fn actor(&self) -> Option<Actor> {
        self.0.as_ref().map(AuthContext::actor)
    }

    /// The authenticated caller, or `NotAuthenticated`
    pub fn require(&self) -> Result<&AuthContext, ApiError> {
        self.0
            .as_ref()
            .ok_or(ApiError::Denied(DenyReason::NotAuthenticated))
    }

    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(|auth| auth.user_id)
    }
}

pub async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = if req.headers().contains_key(header::AUTHORIZATION) {
        let context =
            authenticate(state.store.as_ref(), state.jwt_secret(), req.headers()).await?;
        tracing::trace!(user_id = context.user_id, "Authenticated request");
        Caller(Some(context))
    } else {
        Caller(None)
    };

    req.extensions_mut().insert(caller);

    Ok(next.run(req).await)
}
