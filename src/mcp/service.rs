//! MCP service implementation using rmcp.
//!
//! `MySqlService` exposes one tool (`executeSqlQuery`) through the rmcp tool
//! router and one resource template (`schema://{tableName}`) through the
//! resource handlers of `ServerHandler`.

use crate::db::{QueryExecutor, StatementOutput};
use crate::error::DbError;
use crate::tools::guard::WritePolicy;
use crate::tools::query::{ExecuteSqlQueryInput, QueryToolHandler};
use crate::tools::schema::{
    SCHEMA_RESOURCE_NAME, SCHEMA_URI_TEMPLATE, SchemaResourceHandler, parse_schema_uri,
};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        CallToolResult, Content, Implementation, ListResourceTemplatesResult,
        PaginatedRequestParam, ProtocolVersion, ReadResourceRequestParam, ReadResourceResult,
        ResourceContents, ResourceTemplate, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use sqlx::MySqlPool;
use tracing::debug;

/// Error prefix for failed tool calls.
pub const QUERY_FAILED: &str = "Query failed";

/// Error prefix for failed schema reads.
pub const SCHEMA_FAILED: &str = "Failed to fetch schema";

/// Server name advertised in the MCP handshake.
pub const SERVER_NAME: &str = "mysqlMcpServer";

#[derive(Clone)]
pub struct MySqlService {
    query_handler: QueryToolHandler,
    schema_handler: SchemaResourceHandler,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl MySqlService {
    /// Create a new service sharing `pool`.
    ///
    /// # Arguments
    ///
    /// * `pool` - Shared MySQL connection pool
    /// * `policy` - Write permissions for `executeSqlQuery`
    /// * `database` - Configured default database, used to qualify schema reads
    /// * `executor` - Statement executor (carries the query timeout)
    pub fn new(
        pool: MySqlPool,
        policy: WritePolicy,
        database: Option<String>,
        executor: QueryExecutor,
    ) -> Self {
        Self {
            query_handler: QueryToolHandler::new(pool.clone(), policy, executor.clone()),
            schema_handler: SchemaResourceHandler::new(pool, database, executor),
            tool_router: Self::tool_router(),
        }
    }

    /// Reject empty SQL before it reaches the handler.
    fn validate_query(&self, query: &str) -> Result<(), McpError> {
        if query.trim().is_empty() {
            Err(McpError::invalid_params("SQL query cannot be empty", None))
        } else {
            Ok(())
        }
    }

    /// The advertised schema resource template.
    fn schema_template() -> Result<ResourceTemplate, McpError> {
        serde_json::from_value(serde_json::json!({
            "uriTemplate": SCHEMA_URI_TEMPLATE,
            "name": SCHEMA_RESOURCE_NAME,
            "description": "Column descriptors (DESCRIBE output) for a table in the configured database",
            "mimeType": "application/json",
        }))
        .map_err(|e| McpError::internal_error(format!("Invalid resource template: {}", e), None))
    }

    /// All resource templates this server serves.
    fn resource_templates(&self) -> Result<ListResourceTemplatesResult, McpError> {
        Ok(ListResourceTemplatesResult::with_all_items(vec![
            Self::schema_template()?,
        ]))
    }

    /// Read a `schema://{tableName}` resource.
    async fn read_schema(&self, uri: String) -> Result<ReadResourceResult, McpError> {
        debug!(uri = %uri, "Reading resource");

        let table = parse_schema_uri(&uri).map_err(|e| {
            McpError::resource_not_found(
                format!("Resource {} not found: {}", uri, e),
                Some(serde_json::json!({ "uri": uri })),
            )
        })?;

        let output = self
            .schema_handler
            .describe_table(&table)
            .await
            .map_err(|e: DbError| e.into_mcp_error(SCHEMA_FAILED))?;
        let text = pretty_json(&output, SCHEMA_FAILED)?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }
}

fn pretty_json(output: &StatementOutput, context: &str) -> Result<String, McpError> {
    output
        .to_pretty_json()
        .map_err(|e: DbError| e.into_mcp_error(context))
}

#[tool_router]
impl MySqlService {
    #[tool(
        name = "executeSqlQuery",
        description = "Execute a SQL query against the MySQL database.\nReturns rows as JSON for reads, or affectedRows/insertId for other statements.\nINSERT, UPDATE and DELETE are rejected unless enabled on the server."
    )]
    async fn execute_sql_query(
        &self,
        Parameters(input): Parameters<ExecuteSqlQueryInput>,
    ) -> Result<CallToolResult, McpError> {
        self.validate_query(&input.query)?;
        let output = self
            .query_handler
            .execute_sql_query(input)
            .await
            .map_err(|e: DbError| e.into_mcp_error(QUERY_FAILED))?;
        let text = pretty_json(&output, QUERY_FAILED)?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for MySqlService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: SERVER_NAME.to_owned(),
                title: Some("MySQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "MySQL database access.\n\
                \n\
                - `executeSqlQuery` runs one SQL statement and returns the result as JSON.\n\
                  INSERT, UPDATE and DELETE only run when the server enables them.\n\
                - Read `schema://{tableName}` to get a table's column descriptors."
                    .to_string(),
            ),
        }
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        self.resource_templates()
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.read_schema(request.uri).await
    }
}
