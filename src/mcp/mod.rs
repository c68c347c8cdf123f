pub mod client;
pub mod tools;
pub mod transport;
pub mod types;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

pub use client::McpClient;
pub use tools::{format_tools_for_llm, load_tools};
pub use transport::{Transport, TransportKind};
pub use types::{McpTool, ToolResult};

/// The RPC channel to a tool server, whatever carries it.
#[async_trait]
pub trait ToolChannel: Send {
    async fn list_tools(&mut self) -> Result<Vec<McpTool>>;

    async fn call_tool(&mut self, name: &str, arguments: &Map<String, Value>) -> Result<ToolResult>;
}
