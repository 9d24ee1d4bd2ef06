/// Application state and router
///
/// # Middleware Stack (outermost first)
///
/// 1. Security headers
/// 2. CORS
/// 3. Request tracing
/// 4. Bearer authentication (`/v1` resource routes only)

use crate::{
    config::Config,
    middleware::{auth::jwt_auth_layer, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use softdesk_shared::store::Store;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for every request; both fields are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let user_routes = Router::new()
        .route(
            "/",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route(
            "/:user_id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .patch(routes::users::partial_update_user)
                .delete(routes::users::delete_user),
        );

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/:project_id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .patch(routes::projects::partial_update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/:project_id/contributors",
            get(routes::contributors::list_contributors)
                .post(routes::contributors::add_contributor),
        )
        .route(
            "/:project_id/contributors/:contributor_id",
            get(routes::contributors::get_contributor)
                .put(routes::contributors::update_contributor)
                .patch(routes::contributors::update_contributor)
                .delete(routes::contributors::remove_contributor),
        )
        .route(
            "/:project_id/issues",
            get(routes::issues::list_issues).post(routes::issues::create_issue),
        )
        .route(
            "/:project_id/issues/:issue_id",
            get(routes::issues::get_issue)
                .put(routes::issues::update_issue)
                .patch(routes::issues::partial_update_issue)
                .delete(routes::issues::delete_issue),
        )
        .route(
            "/:project_id/issues/:issue_id/comments",
            get(routes::comments::list_comments).post(routes::comments::create_comment),
        )
        .route(
            "/:project_id/issues/:issue_id/comments/:comment_id",
            get(routes::comments::get_comment)
                .put(routes::comments::update_comment)
                .patch(routes::comments::partial_update_comment)
                .delete(routes::comments::delete_comment),
        );

    let resource_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/projects", project_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(resource_routes);

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
