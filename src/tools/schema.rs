//! Table schema resource.
//!
//! Serves `schema://{tableName}` by running `DESCRIBE` against the configured
//! database and returning the column descriptor rows (Field, Type, Null, Key,
//! Default, Extra) exactly as MySQL reports them.

use crate::db::{QueryExecutor, StatementOutput};
use crate::error::{DbError, DbResult};
use percent_encoding::percent_decode_str;
use sqlx::MySqlPool;
use tracing::info;
use url::Url;

/// URI template advertised to clients.
pub const SCHEMA_URI_TEMPLATE: &str = "schema://{tableName}";

/// Resource name advertised with the template.
pub const SCHEMA_RESOURCE_NAME: &str = "schemaInfo";

const SCHEMA_URI_SCHEME: &str = "schema";

/// Extract the table name from a `schema://{tableName}` URI.
pub fn parse_schema_uri(uri: &str) -> DbResult<String> {
    let url = Url::parse(uri).map_err(|e| DbError::invalid_input(format!("Invalid URI: {e}")))?;

    if url.scheme() != SCHEMA_URI_SCHEME {
        return Err(DbError::invalid_input(format!(
            "Unsupported URI scheme '{}', expected '{}'",
            url.scheme(),
            SCHEMA_URI_TEMPLATE
        )));
    }
    if !matches!(url.path(), "" | "/") {
        return Err(DbError::invalid_input(format!(
            "Unexpected path in '{uri}', expected '{SCHEMA_URI_TEMPLATE}'"
        )));
    }

    let host = url.host_str().unwrap_or_default();
    let table = percent_decode_str(host)
        .decode_utf8()
        .map_err(|e| DbError::invalid_input(format!("Invalid table name encoding: {e}")))?;
    if table.is_empty() {
        return Err(DbError::invalid_input("Table name is required"));
    }
    Ok(table.into_owned())
}

/// Quote a MySQL identifier with backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Build the DESCRIBE statement, qualified with the database when one is configured.
pub fn describe_statement(database: Option<&str>, table: &str) -> String {
    match database {
        Some(db) => format!(
            "DESCRIBE {}.{}",
            quote_identifier(db),
            quote_identifier(table)
        ),
        None => format!("DESCRIBE {}", quote_identifier(table)),
    }
}

/// Handler for schema resource reads.
#[derive(Debug, Clone)]
pub struct SchemaResourceHandler {
    pool: MySqlPool,
    database: Option<String>,
    executor: QueryExecutor,
}

impl SchemaResourceHandler {
    pub fn new(pool: MySqlPool, database: Option<String>, executor: QueryExecutor) -> Self {
        Self {
            pool,
            database,
            executor,
        }
    }

    /// Describe the columns of `table`.
    pub async fn describe_table(&self, table: &str) -> DbResult<StatementOutput> {
        let sql = describe_statement(self.database.as_deref(), table);
        let output = self.executor.run(&self.pool, &sql).await?;

        info!(
            table = %table,
            column_count = output.row_count(),
            "Table schema fetched"
        );
        Ok(output)
    }
}
