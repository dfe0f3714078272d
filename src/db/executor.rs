//! Statement execution.
//!
//! Each statement is sent as-is over the text protocol (no prepared
//! statement), exactly one statement per call, under a timeout.
//!
//! Statements that return a result set produce a JSON array of row objects.
//! Everything else produces a result header with the affected row count and
//! the last insert id, the same shape MySQL client libraries hand back for
//! commands.

use crate::db::types::row_to_json;
use crate::error::{DbError, DbResult};
use crate::tools::guard::{ensure_single_statement, returns_rows};
use futures_util::TryStreamExt;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlQueryResult, MySqlRow};
use sqlx::{Either, Executor, MySqlPool};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info};

/// Result header for statements that do not return rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultHeader {
    pub affected_rows: u64,
    pub insert_id: u64,
}

/// Outcome of executing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutput {
    Rows(Vec<serde_json::Map<String, JsonValue>>),
    Header(ResultHeader),
}

impl StatementOutput {
    /// Build the output from everything the server sent back.
    ///
    /// Any rows make it a row result (CALL, ANALYZE TABLE, ...). With no rows
    /// it is an empty row list when `expects_rows`, otherwise a header
    /// summing the affected rows and keeping the last non-zero insert id.
    pub fn from_results(
        results: Vec<Either<MySqlQueryResult, MySqlRow>>,
        expects_rows: bool,
    ) -> Self {
        let mut rows = Vec::new();
        let mut header = ResultHeader::default();
        for result in results {
            match result {
                Either::Left(done) => {
                    header.affected_rows += done.rows_affected();
                    if done.last_insert_id() != 0 {
                        header.insert_id = done.last_insert_id();
                    }
                }
                Either::Right(row) => rows.push(row_to_json(&row)),
            }
        }

        if rows.is_empty() && !expects_rows {
            Self::Header(header)
        } else {
            Self::Rows(rows)
        }
    }

    /// The JSON value handed back to the agent.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Rows(rows) => {
                JsonValue::Array(rows.iter().cloned().map(JsonValue::Object).collect())
            }
            Self::Header(header) => serde_json::json!(header),
        }
    }

    /// Pretty-printed JSON text.
    pub fn to_pretty_json(&self) -> DbResult<String> {
        serde_json::to_string_pretty(&self.to_json())
            .map_err(|e| DbError::internal(format!("Failed to serialize result: {}", e)))
    }

    pub fn row_count(&self) -> usize {
        match self {
            Self::Rows(rows) => rows.len(),
            Self::Header(_) => 0,
        }
    }
}

/// Executes statements against the shared pool.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    query_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(query_timeout: Duration) -> Self {
        Self { query_timeout }
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Execute a single statement and return its rows or result header.
    ///
    /// Input holding more than one statement is rejected before a connection
    /// is acquired.
    pub async fn run(&self, pool: &MySqlPool, sql: &str) -> DbResult<StatementOutput> {
        ensure_single_statement(sql)?;

        let start = Instant::now();
        debug!(sql = %sql, timeout_secs = self.query_timeout.as_secs(), "Executing statement");

        let results_future = pool.fetch_many(sql).try_collect::<Vec<_>>();
        let results = match timeout(self.query_timeout, results_future).await {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => return Err(DbError::from(e)),
            Err(_) => return Err(self.timeout_error("query execution")),
        };
        let output = StatementOutput::from_results(results, returns_rows(sql));

        info!(
            row_count = output.row_count(),
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Statement executed"
        );
        Ok(output)
    }

    fn timeout_error(&self, operation: &str) -> DbError {
        DbError::timeout(operation, self.query_timeout.as_secs() as u32)
    }
}
