//! PostgreSQL plumbing: connection pool and schema migrations

pub mod migrations;
pub mod pool;
