//! Connection pool creation.
//!
//! The pool connects lazily: no connection is opened until the first request
//! needs one, so the server starts even while MySQL is unreachable and the
//! failure surfaces on the request that hit it.

use crate::config::PoolSettings;
use sqlx::MySqlPool;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use tracing::{debug, warn};

/// Build a lazily-connecting MySQL pool.
pub fn connect_lazy(options: MySqlConnectOptions, settings: PoolSettings) -> MySqlPool {
    debug!(
        max_connections = settings.max_connections,
        acquire_timeout_secs = settings.acquire_timeout.as_secs(),
        "Creating MySQL connection pool"
    );
    MySqlPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect_lazy_with(options.charset("utf8mb4"))
}

/// Ask the server for its version. Used as a startup probe; failure is
/// logged, never fatal.
pub async fn server_version(pool: &MySqlPool) -> Option<String> {
    match sqlx::query_scalar::<_, String>("SELECT version()")
        .fetch_one(pool)
        .await
    {
        Ok(version) => {
            debug!(version = %version, "Got server version");
            Some(version)
        }
        Err(e) => {
            warn!(error = %e, "Failed to get server version");
            None
        }
    }
}
