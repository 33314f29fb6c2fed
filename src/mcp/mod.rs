//! MCP (tool-call protocol) binding.
//!
//! Every registry command is advertised as a tool whose `inputSchema` is the
//! command's own JSON Schema. Result mapping:
//!   - success                -> tool result with the summary + captured output
//!   - unknown tool / invalid -> protocol error `invalid_params` (tool input error)
//!   - bridge failure/timeout -> tool result with `isError: true`
//!
//! Served over stdio; logs must therefore go to stderr.

use anyhow::{Context, Result};
use rmcp::ServerHandler;
use rmcp::ServiceExt;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorData, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use crate::error::{ErrorKind, RelayError};
use crate::registry::Registry;
use crate::relay::Relay;

#[derive(Debug, Clone)]
pub struct RelayServer {
    relay: Arc<Relay>,
}

impl RelayServer {
    pub fn new(relay: Arc<Relay>) -> Self {
        Self { relay }
    }
}

/// Render the registry as MCP tool descriptors.
pub fn tools(registry: &Registry) -> Vec<Tool> {
    registry
        .iter()
        .map(|c| Tool::new(c.name, c.description, Arc::new(c.input_schema())))
        .collect()
}

/// Map a dispatch error onto the MCP surface.
fn to_tool_response(err: RelayError) -> Result<CallToolResult, ErrorData> {
    let kind = err.kind();
    match kind {
        ErrorKind::UnknownCommand | ErrorKind::Validation => Err(ErrorData::invalid_params(
            err.to_string(),
            Some(json!({
                "command": err.command(),
                "error": kind.as_str(),
                "field": err.field(),
            })),
        )),
        _ => Ok(CallToolResult::error(vec![Content::text(format!(
            "[{}] {err}",
            kind.as_str()
        ))])),
    }
}

impl ServerHandler for RelayServer {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::from_build_env();
        server_info.name = env!("CARGO_PKG_NAME").to_string();
        server_info.version = env!("CARGO_PKG_VERSION").to_string();
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info,
            instructions: Some(
                "Controls an Android device through adb. Call list_devices first when \
                 several devices are attached and pass `device` to target one."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(tools(self.relay.registry())))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let params = request.arguments.map(Value::Object).unwrap_or(Value::Null);
        match self.relay.dispatch(&request.name, &params).await {
            Ok(reply) => {
                let mut content = vec![Content::text(reply.message)];
                if !reply.output.is_empty() {
                    content.push(Content::text(reply.output));
                }
                Ok(CallToolResult::success(content))
            }
            Err(err) => to_tool_response(err),
        }
    }
}

/// Serve on stdin/stdout until the client disconnects.
pub async fn serve_stdio(relay: Arc<Relay>) -> Result<()> {
    info!(commands = relay.registry().len(), "mcp relay started on stdio");
    let service = RelayServer::new(relay)
        .serve(rmcp::transport::stdio())
        .await
        .context("failed to start MCP stdio service")?;
    service.waiting().await.context("MCP service terminated abnormally")?;
    Ok(())
}
