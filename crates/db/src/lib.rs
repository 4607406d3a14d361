//! Database connection and migration management for taskdeck
//!
//! Provides a unified interface for connecting to SurrealDB, supporting
//! in-memory, embedded and remote WebSocket connections.

mod config;
mod connection;
mod migrations;

pub use config::{DatabaseConfig, Engine};
pub use connection::{Database, DATABASE_NAME};
