//! Error types for the MySQL MCP Server.
//!
//! Errors fall into two families: permission denials raised by the write
//! guard before anything reaches the database, and failures reported by the
//! driver. Driver messages are kept verbatim so the agent sees exactly what
//! MySQL said.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// A write statement was blocked by the permission policy.
    #[error("{operation} operations are disabled")]
    Permission { operation: String },

    /// Error reported by the MySQL server.
    #[error("{message}")]
    Database {
        message: String,
        /// e.g., "42S02" for unknown table
        sql_state: Option<String>,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    #[error("{message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    pub fn permission(operation: impl Into<String>) -> Self {
        Self::Permission {
            operation: operation.into(),
        }
    }

    pub fn database(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for errors raised by the write guard rather than the driver.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Permission { .. })
    }

    /// Convert into an MCP error whose message carries `context` as a prefix,
    /// e.g. `Query failed: Insert operations are disabled`.
    pub fn into_mcp_error(self, context: &str) -> rmcp::ErrorData {
        let message = format!("{}: {}", context, self);
        match &self {
            DbError::Permission { .. } | DbError::InvalidInput { .. } => {
                rmcp::ErrorData::invalid_params(message, None)
            }
            DbError::Database { sql_state, .. } => rmcp::ErrorData::invalid_params(
                message,
                sql_state
                    .as_ref()
                    .map(|code| serde_json::json!({ "sql_state": code })),
            ),
            DbError::Connection { .. } | DbError::Timeout { .. } | DbError::Internal { .. } => {
                rmcp::ErrorData::internal_error(message, None)
            }
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(db_err.message(), code)
            }
            sqlx::Error::Configuration(msg) => DbError::connection(msg.to_string()),
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Timed out waiting for a connection from the pool",
            ),
            sqlx::Error::PoolClosed => DbError::connection("Connection pool is closed"),
            sqlx::Error::Io(io_err) => DbError::connection(format!("I/O error: {}", io_err)),
            sqlx::Error::Tls(tls_err) => DbError::connection(format!("TLS error: {}", tls_err)),
            sqlx::Error::Protocol(msg) => DbError::connection(format!("Protocol error: {}", msg)),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
