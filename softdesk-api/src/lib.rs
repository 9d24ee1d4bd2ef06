//! # SoftDesk API Server Library
//!
//! HTTP surface of the SoftDesk issue tracker.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: configuration from environment variables
//! - `error`: error handling and HTTP response mapping
//! - `middleware`: authentication and security headers
//! - `routes`: resource handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
