//! MCP service implementation
//!
//! [`WindowCapServer`] exposes the seven catalog operations as MCP tools.
//! `tools/list` is built from [`catalog()`] and `tools/call` goes through
//! [`Invocation::parse`], so names, descriptions, schemas and argument
//! validation all come from the registry. The server never touches the
//! engine directly: every call becomes an [`Invocation`] handed to the
//! shared [`Dispatcher`], so captures from all sessions funnel through the
//! one capture context.
//!
//! One `WindowCapServer` value is created per session (it is cheap to clone);
//! all of them share the same dispatcher.

use std::sync::Arc;

use rmcp::{
    RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, ErrorData as McpError, Implementation, JsonObject,
        ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};
use serde_json::Value;
use windowcap_core::{
    CaptureEngine, CaptureResult, Dispatcher, Invocation,
    capture::create_mock_backend,
    registry::{ToolDescriptor, catalog},
};

use crate::mcp_content::{build_error_result, outcome_to_result};

pub const SERVER_NAME: &str = "window-cap-mcp";

const INSTRUCTIONS: &str = "Enumerate and capture monitors and windows. Call list_monitors or \
                            list_windows first: monitor indices are only valid for the current \
                            display topology and window ids go stale when windows close. \
                            Captures are returned as PNG images.";

/// Monitor and window capture MCP server
///
/// # Tools
///
/// - `list_monitors`, `count_monitors`, `capture_monitor`
/// - `list_windows`, `count_windows`, `capture_window`
/// - `close_window`
#[derive(Clone)]
pub struct WindowCapServer {
    dispatcher: Arc<Dispatcher>,
}

impl WindowCapServer {
    /// Creates a server session over a running dispatcher.
    ///
    /// ```
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// use std::sync::Arc;
    ///
    /// use windowcap_core::{CaptureEngine, Dispatcher, capture::create_mock_backend};
    /// use windowcap_mcp_server::mcp::WindowCapServer;
    ///
    /// let engine = Arc::new(CaptureEngine::new(create_mock_backend()));
    /// let server = WindowCapServer::new(Dispatcher::start(engine).unwrap());
    /// let result = server.call("count_monitors", None).await.unwrap();
    /// assert_eq!(result.content[0].as_text().unwrap().text, "2");
    /// # }
    /// ```
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Server over a fresh mock backend, for tests and demos.
    ///
    /// # Errors
    ///
    /// Fails only if the capture context thread cannot be spawned.
    pub fn new_with_mock() -> CaptureResult<Self> {
        let engine = Arc::new(CaptureEngine::new(create_mock_backend()));
        Ok(Self::new(Dispatcher::start(engine)?))
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// The advertised tools, in catalog order.
    pub fn tools() -> Vec<Tool> {
        catalog().into_iter().map(tool_from_descriptor).collect()
    }

    /// Validates and runs one tool call.
    ///
    /// Unknown tools and malformed arguments become `InvalidArgument` tool
    /// errors; they never reach the dispatcher.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<&JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let invocation = match Invocation::parse(name, arguments) {
            Ok(invocation) => invocation,
            Err(error) => {
                tracing::debug!(tool = name, error = %error, "rejected invocation");
                return Ok(build_error_result(&error));
            }
        };

        let operation = invocation.operation();
        let reply = self.dispatcher.submit(invocation);
        let correlation_id = reply.correlation_id();
        let outcome = reply.wait().await;

        match &outcome {
            Ok(_) => tracing::debug!(%correlation_id, %operation, "tool call completed"),
            Err(e) => tracing::info!(
                %correlation_id,
                %operation,
                kind = %e.kind(),
                error = %e,
                "tool call failed"
            ),
        }
        outcome_to_result(outcome)
    }
}

fn tool_from_descriptor(descriptor: ToolDescriptor) -> Tool {
    let schema = match descriptor.input_schema {
        Value::Object(schema) => schema,
        _ => JsonObject::new(),
    };
    Tool::new(descriptor.name, descriptor.description, Arc::new(schema))
}

impl ServerHandler for WindowCapServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(Self::tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.call(&request.name, request.arguments.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde_json::json;

    use super::*;

    fn server() -> WindowCapServer {
        WindowCapServer::new_with_mock().unwrap()
    }

    fn text(result: &CallToolResult) -> &str {
        &result.content[0].as_text().unwrap().text
    }

    fn args(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_tools_match_catalog() {
        let tools = WindowCapServer::tools();
        let catalog = catalog();
        assert_eq!(tools.len(), catalog.len());

        for (tool, entry) in tools.iter().zip(&catalog) {
            assert_eq!(tool.name, entry.name);
            assert_eq!(tool.description.as_deref(), Some(entry.description));
            assert_eq!(Value::Object((*tool.input_schema).clone()), entry.input_schema);
        }
    }

    #[test]
    fn test_server_info() {
        let info = server().get_info();
        assert_eq!(info.server_info.name, SERVER_NAME);
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("list_windows"));
    }

    #[tokio::test]
    async fn test_count_equals_list_len() {
        let server = server();
        let list: Vec<Value> =
            serde_json::from_str(text(&server.call("list_windows", None).await.unwrap())).unwrap();
        let count: usize = text(&server.call("count_windows", None).await.unwrap())
            .parse()
            .unwrap();
        assert_eq!(count, list.len());
    }

    #[tokio::test]
    async fn test_capture_monitor_default_is_png() {
        let result = server().call("capture_monitor", None).await.unwrap();
        assert_eq!(result.is_error, Some(false));
        let image = result.content[0].as_image().unwrap();
        let bytes = STANDARD.decode(&image.data).unwrap();
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[tokio::test]
    async fn test_bad_selector_is_invalid_argument_result() {
        let result = server()
            .call("capture_monitor", Some(&args(json!({"monitor_index": "left"}))))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).contains("InvalidArgument"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_argument_result() {
        let result = server().call("format_disk", None).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).contains("InvalidArgument"));
        assert!(text(&result).contains("format_disk"));
    }

    #[tokio::test]
    async fn test_close_nonexistent_window() {
        let result = server()
            .call("close_window", Some(&args(json!({"window_id": 999_999_999}))))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).contains("does not exist"));
    }
}
