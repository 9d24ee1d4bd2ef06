/// Error handling and HTTP response mapping
///
/// Every handler returns [`ApiResult`]. Library errors convert into
/// [`ApiError`] through `From`, so handlers propagate them with `?`.
///
/// # Error Response Format
///
/// ```json
/// {
///   "error": "forbidden",
///   "message": "Only the author may do this",
///   "reason": "not_author"
/// }
/// ```
///
/// Validation failures list every offending field:
///
/// ```json
/// {
///   "error": "validation_error",
///   "message": "Request validation failed",
///   "details": [
///     { "field": "name", "message": "name already exists" },
///     { "field": "type", "message": "This field is required" }
///   ]
/// }
/// ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use softdesk_shared::{
    auth::{authorization::DenyReason, jwt::JwtError, middleware::AuthError, password::PasswordError},
    resolver::ResolveError,
    store::StoreError,
};
use std::fmt;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// Malformed request that could not be parsed (400)
    BadRequest(String),

    /// Missing or invalid credentials (401)
    Unauthorized(String),

    /// Refused by the authorization engine
    Denied(DenyReason),

    NotFound(String),

    /// One or more fields failed validation (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Store failure; logged, never exposed (500)
    InternalError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    pub message: String,

    /// Authorization deny reason code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// A validation error on a single field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        }])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Denied(reason) => reason.status_code(),
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Denied(reason) => write!(f, "Denied ({}): {}", reason.code(), reason),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (error_code, message, reason, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None, None),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None, None),
            ApiError::Denied(reason) => match status {
                // Hidden resources look exactly like missing ones
                StatusCode::NOT_FOUND => ("not_found", "Not found".to_string(), None, None),
                StatusCode::UNAUTHORIZED => (
                    "unauthorized",
                    reason.to_string(),
                    Some(reason.code().to_string()),
                    None,
                ),
                StatusCode::METHOD_NOT_ALLOWED => (
                    "method_not_allowed",
                    reason.to_string(),
                    Some(reason.code().to_string()),
                    None,
                ),
                _ => (
                    "forbidden",
                    reason.to_string(),
                    Some(reason.code().to_string()),
                    None,
                ),
            },
            ApiError::NotFound(msg) => ("not_found", msg, None, None),
            ApiError::ValidationError(errors) => (
                "validation_error",
                "Request validation failed".to_string(),
                None,
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            reason,
            details,
        });

        (status, body).into_response()
    }
}

/// Accumulates field errors so a request reports all of them at once
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<ValidationErrorDetail>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Records a missing required field and passes the value through
    pub fn require<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.add(field, "This field is required");
        }
        value
    }

    pub fn merge(&mut self, errors: validator::ValidationErrors) {
        self.0.extend(validation_details(&errors));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> ApiResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::ValidationError(self.0))
        }
    }
}

fn validation_details(errors: &validator::ValidationErrors) -> Vec<ValidationErrorDetail> {
    let mut details: Vec<ValidationErrorDetail> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();
    // field_errors() is a HashMap
    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(validation_details(&errors))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound("Not found".to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(field) if field == "user" => {
                ApiError::field("user", "This user is already a contributor of the project")
            }
            StoreError::UniqueViolation(field) => {
                let message = format!("A record with this {} already exists", field);
                ApiError::field(&field, message)
            }
            StoreError::MissingReference(field) => {
                let message = format!("Referenced {} does not exist", field);
                ApiError::field(&field, message)
            }
            StoreError::Database(err) => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ResolveError::Store(err) => err.into(),
        }
    }
}

impl From<DenyReason> for ApiError {
    fn from(reason: DenyReason) -> Self {
        ApiError::Denied(reason)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(err) => err.into(),
            AuthError::InvalidToken(err) => err.into(),
            AuthError::MissingCredentials => ApiError::Denied(DenyReason::NotAuthenticated),
            AuthError::InvalidFormat | AuthError::UnknownUser => {
                ApiError::Unauthorized(err.to_string())
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Weak(problems) => ApiError::ValidationError(
                problems
                    .into_iter()
                    .map(|problem| ValidationErrorDetail {
                        field: "password".to_string(),
                        message: problem.to_string(),
                    })
                    .collect(),
            ),
            _ => ApiError::InternalError(format!("Password operation failed: {}", err)),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => {
                ApiError::InternalError(format!("Token creation failed: {}", msg))
            }
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::Denied(DenyReason::NotAuthor);
        assert_eq!(err.to_string(), "Denied (not_author): Only the author may do this");
    }

    #[test]
    fn test_field_errors_are_collected() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.require::<String>("title", None), None);
        errors.add("assignee", "Assignee must be a contributor of the project");
        assert!(!errors.is_empty());

        match errors.into_result() {
            Err(ApiError::ValidationError(details)) => {
                let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["title", "assignee"]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[tokio::test]
    async fn test_denied_body_carries_reason() {
        let (status, body) = body_json(ApiError::Denied(DenyReason::NotAuthor)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
        assert_eq!(body["reason"], "not_author");
    }

    #[tokio::test]
    async fn test_hidden_project_looks_missing() {
        let (status, body) = body_json(ApiError::Denied(DenyReason::NotContributor)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
        assert!(body.get("reason").is_none());
    }

    #[tokio::test]
    async fn test_unique_violation_is_a_field_error() {
        let err: ApiError = StoreError::UniqueViolation("username".to_string()).into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"][0]["field"], "username");
    }

    #[tokio::test]
    async fn test_internal_error_is_not_exposed() {
        let (status, body) =
            body_json(ApiError::InternalError("connection refused".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[test]
    fn test_weak_password_lists_each_problem() {
        let err: ApiError = PasswordError::Weak(vec!["too short", "no digit"]).into();
        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(details.len(), 2);
                assert!(details.iter().all(|d| d.field == "password"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
