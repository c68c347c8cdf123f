use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use super::transport::{Transport, TransportKind};
use super::types::{
    InitializeResult, JsonRpcNotification, JsonRpcRequest, McpTool, McpToolResult, ServerInfo,
    ToolListResponse, ToolResult,
};
use super::ToolChannel;
use crate::config::{CLIENT_NAME, CLIENT_VERSION, MCP_PROTOCOL_VERSION};
use crate::error::{RelayError, Result};

/// A connection to one MCP server. Owns its transport exclusively.
pub struct McpClient {
    transport: Box<dyn Transport>,
    next_id: u64,
    tools: HashMap<String, McpTool>,
    server_info: Option<ServerInfo>,
}

impl McpClient {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            next_id: 1,
            tools: HashMap::new(),
            server_info: None,
        }
    }

    /// Open the transport for `kind` and complete the MCP handshake.
    pub async fn connect(kind: &TransportKind, verbose: bool) -> Result<Self> {
        let transport = kind.open(verbose).await?;
        let mut client = Self::new(transport);
        if let Err(e) = client.initialize().await {
            if let Err(close_err) = client.transport.close().await {
                tracing::warn!("failed to close transport after handshake error: {}", close_err);
            }
            return Err(e);
        }
        Ok(client)
    }

    pub async fn initialize(&mut self) -> Result<InitializeResult> {
        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": CLIENT_NAME,
                "version": CLIENT_VERSION
            }
        });

        let response = self.send_request("initialize", Some(params)).await?;
        let init: InitializeResult = serde_json::from_value(response)?;

        tracing::info!(
            "Connected to MCP server: {} v{} (protocol {})",
            init.server_info.name,
            init.server_info.version,
            init.protocol_version
        );
        if init.capabilities.tools.is_none() {
            tracing::warn!("server does not advertise the tools capability");
        }

        self.transport.set_protocol_version(&init.protocol_version);
        self.transport
            .notify(&JsonRpcNotification::new("notifications/initialized", None))
            .await?;
        self.server_info = Some(init.server_info.clone());

        Ok(init)
    }

    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    async fn send_request(&mut self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let request = JsonRpcRequest::new(id, method, params);
        tracing::debug!(id, method, "sending request");
        let response = self.transport.request(&request).await?;

        if let Some(error) = response.error {
            return Err(RelayError::Protocol(format!("{} failed: {}", method, error)));
        }
        response
            .result
            .ok_or_else(|| RelayError::Protocol(format!("{} returned no result", method)))
    }

    fn validate_arguments(tool: &McpTool, arguments: &Map<String, Value>) -> Result<()> {
        let schema = match JSONSchema::compile(&tool.input_schema) {
            Ok(schema) => schema,
            Err(e) => {
                tracing::warn!("skipping argument validation for '{}': invalid schema: {}", tool.name, e);
                return Ok(());
            }
        };

        let instance = Value::Object(arguments.clone());
        if let Err(errors) = schema.validate(&instance) {
            let messages: Vec<String> = errors
                .map(|e| format!("{}: {}", e.instance_path, e))
                .collect();
            return Err(RelayError::tool(
                &tool.name,
                format!("argument validation failed: {}", messages.join("; ")),
            ));
        }
        Ok(())
    }

    /// Close the connection. Consumes the client so nothing can use it afterwards.
    pub async fn shutdown(mut self) -> Result<()> {
        self.transport.close().await
    }
}

#[async_trait]
impl ToolChannel for McpClient {
    async fn list_tools(&mut self) -> Result<Vec<McpTool>> {
        let mut listed = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let response = self.send_request("tools/list", params).await?;
            let page: ToolListResponse = serde_json::from_value(response)?;
            listed.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        self.tools = listed
            .iter()
            .map(|tool| (tool.name.clone(), tool.clone()))
            .collect();
        tracing::debug!(count = listed.len(), "tools listed");

        Ok(listed)
    }

    async fn call_tool(&mut self, name: &str, arguments: &Map<String, Value>) -> Result<ToolResult> {
        if !self.tools.is_empty() {
            let tool = self
                .tools
                .get(name)
                .ok_or_else(|| RelayError::tool(name, "tool not found on server"))?;
            Self::validate_arguments(tool, arguments)?;
        }

        let params = json!({
            "name": name,
            "arguments": arguments,
        });

        let response = match self.send_request("tools/call", Some(params)).await {
            Ok(response) => response,
            Err(RelayError::Protocol(message)) => return Err(RelayError::tool(name, message)),
            Err(e) => return Err(e),
        };

        let result: McpToolResult = serde_json::from_value(response)?;
        let content = result.text();
        if result.failed() {
            return Err(RelayError::tool(name, content));
        }

        Ok(ToolResult { content })
    }
}
