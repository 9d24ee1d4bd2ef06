/// API route handlers
///
/// Every resource handler follows the same sequence: resolve the path into
/// a [`ResolvedChain`], ask the authorization engine, validate the body, and
/// only then touch the store. Responses are shaped by
/// [`select_view`](softdesk_shared::views::select_view).
///
/// - `health`: store connectivity check
/// - `auth`: registration, login and token refresh
/// - `users`, `projects`, `contributors`, `issues`, `comments`: resources

pub mod auth;
pub mod comments;
pub mod contributors;
pub mod health;
pub mod issues;
pub mod projects;
pub mod users;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, FieldErrors},
    middleware::auth::Caller,
};
use softdesk_shared::{
    auth::authorization::{self, Action, Decision, ResourceKind, Target},
    resolver::{self, ResolvedChain, ResourcePath},
    views::{select_view, ViewContext, ViewShape},
};

/// Resolves a path for the caller
async fn resolve(state: &AppState, caller: &Caller, path: ResourcePath) -> ApiResult<ResolvedChain> {
    let actor = caller.actor();
    Ok(resolver::resolve(state.store.as_ref(), actor.as_ref(), &path).await?)
}

/// A level the resolver was asked for
fn loaded<T>(value: Option<&T>, kind: ResourceKind) -> ApiResult<&T> {
    value.ok_or_else(|| ApiError::NotFound(format!("{} not found", kind.as_str())))
}

/// Runs the authorization engine for the caller
fn authorize(
    caller: &Caller,
    action: Action,
    target: Target<'_>,
    chain: &ResolvedChain,
) -> ApiResult<()> {
    let actor = caller.actor();
    match authorization::authorize(actor.as_ref(), action, target, chain) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            tracing::debug!(
                user_id = ?caller.user_id(),
                action = ?action,
                resource = target.kind().as_str(),
                reason = reason.code(),
                "Access denied"
            );
            Err(reason.into())
        }
    }
}

/// Response shape for a top-level operation
fn shape_for(kind: ResourceKind, action: Action) -> ViewShape {
    select_view(kind, ViewContext::Operation(action)).unwrap_or(ViewShape::Detail)
}

/// Deserializes a field that may be absent, `null`, or a value
///
/// Used with `#[serde(default)]` so PATCH bodies can tell "leave unchanged"
/// (`None`) apart from "clear" (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Trims a text field, treating blank input as absent
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trims a text field of a write, recording blank input as a field error
///
/// Absent input is an error only when `required` is set.
fn text_field(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    required: bool,
) -> Option<String> {
    let text = non_blank(value.map(str::to_string));
    match (value, &text) {
        (Some(_), None) => errors.add(field, "This field may not be blank"),
        (None, _) if required => errors.add(field, "This field is required"),
        _ => {}
    }
    text
}
