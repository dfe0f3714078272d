//! Configuration handling for the MySQL MCP Server.
//!
//! Everything is read from CLI arguments or the environment (optionally
//! seeded from a `.env` file). The MySQL and write-permission variables keep
//! the names existing deployments already export.

use crate::tools::guard::WritePolicy;
use clap::{Parser, ValueEnum};
use sqlx::mysql::MySqlConnectOptions;
use std::time::Duration;

pub const DEFAULT_MYSQL_HOST: &str = "localhost";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_CONNECTION_LIMIT: u32 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Connection pool sizing and timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_CONNECTION_LIMIT,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

/// Configuration for the MySQL MCP Server.
#[derive(Clone, Parser)]
#[command(
    name = "mysql-mcp-server",
    about = "MCP server exposing a MySQL database to AI assistants",
    version,
    author
)]
pub struct Config {
    /// MySQL server host
    #[arg(long, default_value = DEFAULT_MYSQL_HOST, env = "MYSQL_HOST")]
    pub mysql_host: String,

    /// MySQL server port
    #[arg(long, default_value_t = DEFAULT_MYSQL_PORT, env = "MYSQL_PORT")]
    pub mysql_port: u16,

    /// MySQL user name
    #[arg(long, env = "MYSQL_USER")]
    pub mysql_user: String,

    /// MySQL password
    #[arg(long, env = "MYSQL_PASS", hide_env_values = true)]
    pub mysql_password: String,

    /// Default database. Also qualifies table names for schema://{table} reads.
    #[arg(long, env = "MYSQL_DB")]
    pub mysql_database: Option<String>,

    /// Allow INSERT statements (only the exact value "true" enables them)
    #[arg(long, default_value = "false", env = "ALLOW_INSERT_OPERATION")]
    pub allow_insert: String,

    /// Allow UPDATE statements (only the exact value "true" enables them)
    #[arg(long, default_value = "false", env = "ALLOW_UPDATE_OPERATION")]
    pub allow_update: String,

    /// Allow DELETE statements (only the exact value "true" enables them)
    #[arg(long, default_value = "false", env = "ALLOW_DELETE_OPERATION")]
    pub allow_delete: String,

    /// Maximum connections in the pool
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECTION_LIMIT,
        env = "MYSQL_CONNECTION_LIMIT"
    )]
    pub connection_limit: u32,

    /// Seconds to wait for a pooled connection
    #[arg(
        long,
        default_value_t = DEFAULT_ACQUIRE_TIMEOUT_SECS,
        env = "MCP_ACQUIRE_TIMEOUT"
    )]
    pub acquire_timeout: u64,

    /// Query timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "MCP_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(long, default_value = DEFAULT_HTTP_HOST, env = "MCP_HTTP_HOST")]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT, env = "MCP_HTTP_PORT")]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(long, default_value = DEFAULT_MCP_ENDPOINT, env = "MCP_ENDPOINT")]
    pub mcp_endpoint: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

// Hand-written so the password never ends up in logs or panic messages.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("mysql_host", &self.mysql_host)
            .field("mysql_port", &self.mysql_port)
            .field("mysql_user", &self.mysql_user)
            .field("mysql_password", &"***")
            .field("mysql_database", &self.mysql_database)
            .field("write_policy", &self.write_policy())
            .field("connection_limit", &self.connection_limit)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load `.env` (if present) and parse configuration from the command line
    /// and environment.
    pub fn load() -> Self {
        // A missing .env file is the normal case
        let _ = dotenvy::dotenv();
        Self::parse()
    }

    /// Create a configuration with defaults and the given credentials
    /// (useful for testing).
    pub fn with_credentials(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            mysql_host: DEFAULT_MYSQL_HOST.to_string(),
            mysql_port: DEFAULT_MYSQL_PORT,
            mysql_user: user.into(),
            mysql_password: password.into(),
            mysql_database: None,
            allow_insert: "false".to_string(),
            allow_update: "false".to_string(),
            allow_delete: "false".to_string(),
            connection_limit: DEFAULT_CONNECTION_LIMIT,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Validate values clap cannot check on its own.
    pub fn validate(&self) -> Result<(), String> {
        if self.connection_limit == 0 {
            return Err("connection limit must be greater than 0".to_string());
        }
        if self.mysql_user.trim().is_empty() {
            return Err("MYSQL_USER must not be empty".to_string());
        }
        Ok(())
    }

    /// Write permissions derived from the three ALLOW_*_OPERATION flags.
    pub fn write_policy(&self) -> WritePolicy {
        WritePolicy {
            allow_insert: flag_enabled(&self.allow_insert),
            allow_update: flag_enabled(&self.allow_update),
            allow_delete: flag_enabled(&self.allow_delete),
        }
    }

    /// Driver connect options for the configured server.
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.mysql_host)
            .port(self.mysql_port)
            .username(&self.mysql_user)
            .password(&self.mysql_password);
        match &self.mysql_database {
            Some(db) => options.database(db),
            None => options,
        }
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.connection_limit,
            acquire_timeout: Duration::from_secs(self.acquire_timeout),
        }
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

/// A permission flag is on only for the exact string "true".
fn flag_enabled(value: &str) -> bool {
    value == "true"
}
