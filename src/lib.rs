//! MySQL MCP Server Library
//!
//! This library exposes a MySQL database to MCP (Model Context Protocol)
//! clients: an `executeSqlQuery` tool with configurable write permissions
//! and a `schema://{tableName}` resource.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::MySqlService;
