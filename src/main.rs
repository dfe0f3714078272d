//! MySQL MCP Server - Main entry point.
//!
//! This server exposes a MySQL database to MCP (Model Context Protocol)
//! clients over stdio or Streamable HTTP.

use mysql_mcp_server::config::{Config, TransportMode};
use mysql_mcp_server::db::pool::server_version;
use mysql_mcp_server::db::{QueryExecutor, connect_lazy};
use mysql_mcp_server::mcp::MySqlService;
use mysql_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr: stdout carries the protocol in stdio mode.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from .env, command line and environment
    let config = Config::load();

    init_tracing(&config);

    if let Err(message) = config.validate() {
        eprintln!("Error: {}", message);
        eprintln!();
        eprintln!("Required environment variables:");
        eprintln!("  MYSQL_USER, MYSQL_PASS");
        eprintln!();
        eprintln!("Optional:");
        eprintln!("  MYSQL_HOST (default localhost), MYSQL_PORT (default 3306), MYSQL_DB");
        eprintln!("  ALLOW_INSERT_OPERATION, ALLOW_UPDATE_OPERATION, ALLOW_DELETE_OPERATION");
        std::process::exit(1);
    }

    let policy = config.write_policy();
    info!(
        transport = %config.transport,
        host = %config.mysql_host,
        port = config.mysql_port,
        database = config.mysql_database.as_deref().unwrap_or("<none>"),
        allow_insert = policy.allow_insert,
        allow_update = policy.allow_update,
        allow_delete = policy.allow_delete,
        "Starting MySQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let pool = connect_lazy(config.connect_options(), config.pool_settings());

    if let Some(version) = server_version(&pool).await {
        info!(version = %version, "Connected to MySQL");
    }

    let service = MySqlService::new(
        pool.clone(),
        policy,
        config.mysql_database.clone(),
        QueryExecutor::new(config.query_timeout_duration()),
    );

    // Run the appropriate transport
    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            let transport = StdioTransport::new(service, pool);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                bind = %config.http_bind_addr(),
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                service,
                pool,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
