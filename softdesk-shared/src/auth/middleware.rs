//! Request authentication
//!
//! Turns an `Authorization: Bearer <token>` header into an [`AuthContext`].
//! The token only proves who the caller was when it was issued, so the user
//! is re-loaded from the store on every request: a deleted account or a
//! revoked admin flag takes effect immediately.
//!
//! The API's middleware layer calls [`authenticate`] and stores the result
//! in the request extensions, where handlers pick it up with
//! `Extension<AuthContext>`.

use axum::http::{header, HeaderMap};

use super::authorization::Actor;
use super::jwt::{validate_access_token, JwtError};
use crate::models::User;
use crate::store::{Store, StoreError};

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub is_admin: bool,
}

impl AuthContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            is_admin: self.is_admin,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("Expected Bearer token")]
    InvalidFormat,

    #[error(transparent)]
    InvalidToken(#[from] JwtError),

    /// The token is valid but its user no longer exists
    #[error("User no longer exists")]
    UnknownUser,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Extracts the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

/// Validates the access token in `headers` and loads its user
pub async fn authenticate(
    store: &dyn Store,
    secret: &str,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_access_token(token, secret)?;

    let user = store
        .find_user(claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    Ok(AuthContext::from_user(&user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims, TokenType};
    use crate::models::{CreateUser, UpdateUser};
    use crate::store::MemoryStore;
    use axum::http::HeaderValue;

    const SECRET: &str = "middleware-test-secret-0123456789abcdef";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    async fn store_with_user() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store
            .create_user(CreateUser {
                username: "ada".to_string(),
                email: None,
                password_hash: "hash".to_string(),
                first_name: None,
                last_name: None,
                age: 30,
                is_admin: false,
                can_be_contacted: false,
                can_data_be_shared: false,
            })
            .await
            .unwrap();
        (store, user)
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            bearer_token(&headers_with("Basic abc")),
            Err(AuthError::InvalidFormat)
        ));
        assert!(matches!(
            bearer_token(&headers_with("Bearer ")),
            Err(AuthError::InvalidFormat)
        ));
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[tokio::test]
    async fn test_authenticate_reloads_user() {
        let (store, user) = store_with_user().await;
        let token = create_token(&Claims::new(user.id, TokenType::Access), SECRET).unwrap();
        let headers = headers_with(&format!("Bearer {token}"));

        let context = authenticate(&store, SECRET, &headers).await.unwrap();
        assert_eq!(context.user_id, user.id);
        assert!(!context.is_admin);

        store
            .update_user(
                user.id,
                UpdateUser {
                    is_admin: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let context = authenticate(&store, SECRET, &headers).await.unwrap();
        assert!(context.actor().is_admin);

        store.delete_user(user.id).await.unwrap();
        assert!(matches!(
            authenticate(&store, SECRET, &headers).await,
            Err(AuthError::UnknownUser)
        ));
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_accepted() {
        let (store, user) = store_with_user().await;
        let token = create_token(&Claims::new(user.id, TokenType::Refresh), SECRET).unwrap();

        let result = authenticate(&store, SECRET, &headers_with(&format!("Bearer {token}"))).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }
}
