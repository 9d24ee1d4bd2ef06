//! Common test utilities for integration tests
//!
//! Every test gets its own router over a fresh in-memory store, so tests run
//! in parallel without a database.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use softdesk_api::{
    app::{build_router, AppState},
    config::Config,
};
use softdesk_shared::{
    auth::jwt::{create_token, Claims, TokenType},
    models::{CreateUser, User},
    store::{MemoryStore, Store},
};
use std::sync::Arc;
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";

/// A seeded user and an access token for it
#[derive(Debug, Clone)]
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: Router,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone() as Arc<dyn Store>, Config::for_tests(SECRET));
        Self {
            store,
            app: build_router(state),
        }
    }

    /// Seeds a user directly in the store
    ///
    /// The password hash is a placeholder; log in through users created with
    /// `POST /v1/auth/register` instead.
    pub async fn user(&self, username: &str) -> TestUser {
        self.seed(username, false).await
    }

    pub async fn admin(&self, username: &str) -> TestUser {
        self.seed(username, true).await
    }

    async fn seed(&self, username: &str, is_admin: bool) -> TestUser {
        let user = self
            .store
            .create_user(CreateUser {
                username: username.to_string(),
                email: None,
                password_hash: "not-a-real-hash".to_string(),
                first_name: None,
                last_name: None,
                age: 30,
                is_admin,
                can_be_contacted: false,
                can_data_be_shared: false,
            })
            .await
            .unwrap();
        let token = create_token(&Claims::new(user.id, TokenType::Access), SECRET).unwrap();
        TestUser { user, token }
    }

    /// Sends a request and returns the status and JSON body (`Null` if empty)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        as_user: Option<&TestUser>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = as_user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user.token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, as_user: &TestUser) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(as_user), None).await
    }

    pub async fn post(&self, uri: &str, as_user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(as_user), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, as_user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(as_user), Some(body)).await
    }

    pub async fn put(&self, uri: &str, as_user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(as_user), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, as_user: &TestUser) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(as_user), None).await
    }

    /// Creates a project through the API and returns its ID
    pub async fn project(&self, author: &TestUser, name: &str) -> i64 {
        let (status, body) = self
            .post(
                "/v1/projects",
                author,
                serde_json::json!({ "name": name, "type": "BACKEND" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    /// Adds `user` to a project through the API and returns the contributor ID
    pub async fn add_contributor(&self, author: &TestUser, project_id: i64, user: &TestUser) -> i64 {
        let (status, body) = self
            .post(
                &format!("/v1/projects/{project_id}/contributors"),
                author,
                serde_json::json!({ "user": user.id() }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    /// Creates an issue through the API and returns its ID
    pub async fn issue(&self, author: &TestUser, project_id: i64, title: &str) -> i64 {
        let (status, body) = self
            .post(
                &format!("/v1/projects/{project_id}/issues"),
                author,
                serde_json::json!({ "title": title, "label": "BUG", "priority": "LOW" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    /// Creates a comment through the API and returns its ID
    pub async fn comment(&self, author: &TestUser, project_id: i64, issue_id: i64) -> String {
        let (status, body) = self
            .post(
                &format!("/v1/projects/{project_id}/issues/{issue_id}/comments"),
                author,
                serde_json::json!({ "content": "Reproduced on staging" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}
