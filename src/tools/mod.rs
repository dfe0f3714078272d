//! MCP tool and resource implementations.
//!
//! - `guard`: statement classification and write permissions
//! - `query`: the `executeSqlQuery` tool
//! - `schema`: the `schema://{tableName}` resource

pub mod guard;
pub mod query;
pub mod schema;

pub use guard::{StatementKind, WritePolicy};
pub use query::{ExecuteSqlQueryInput, QueryToolHandler};
pub use schema::SchemaResourceHandler;
