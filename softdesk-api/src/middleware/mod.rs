/// Middleware for the API server
///
/// - `auth`: bearer token authentication for `/v1` resource routes
/// - `security`: security response headers

pub mod auth;
pub mod security;
