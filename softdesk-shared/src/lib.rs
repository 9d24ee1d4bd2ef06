//! # SoftDesk shared library
//!
//! Domain types, storage and the access-control core used by the API server.
//!
//! ## Module Organization
//!
//! - `models`: users, projects, contributors, issues, comments and their SQL
//! - `store`: the `Store` trait with PostgreSQL and in-memory backends
//! - `auth`: passwords, tokens, request authentication and the policy engine
//! - `resolver`: loads nested resources named by a request path
//! - `views`: picks and renders the response shape of each resource
//! - `db`: connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod resolver;
pub mod store;
pub mod views;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
