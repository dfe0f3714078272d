//! SQL execution tool.
//!
//! This module implements the `executeSqlQuery` MCP tool. Every statement is
//! checked against the write policy first; allowed statements are executed
//! unmodified and their result is returned verbatim.

use crate::db::{QueryExecutor, StatementOutput};
use crate::error::DbResult;
use crate::tools::guard::WritePolicy;
use schemars::JsonSchema;
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;

/// Input for the executeSqlQuery tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteSqlQueryInput {
    /// SQL statement to execute. INSERT/UPDATE/DELETE run only when enabled on the server.
    pub query: String,
}

/// Handler for SQL execution.
#[derive(Debug, Clone)]
pub struct QueryToolHandler {
    pool: MySqlPool,
    policy: WritePolicy,
    executor: QueryExecutor,
}

impl QueryToolHandler {
    pub fn new(pool: MySqlPool, policy: WritePolicy, executor: QueryExecutor) -> Self {
        Self {
            pool,
            policy,
            executor,
        }
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    /// Handle the executeSqlQuery tool call.
    ///
    /// Rejected writes never reach the database.
    pub async fn execute_sql_query(
        &self,
        input: ExecuteSqlQueryInput,
    ) -> DbResult<StatementOutput> {
        let kind = self.policy.check(&input.query)?;
        let output = self.executor.run(&self.pool, &input.query).await?;

        info!(
            kind = %kind,
            row_count = output.row_count(),
            "SQL query executed"
        );
        Ok(output)
    }
}
