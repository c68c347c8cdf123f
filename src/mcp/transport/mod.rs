//! Transports carrying JSON-RPC traffic to an MCP server.
//!
//! The set of transports is closed: [`TransportKind`] picks one from the
//! server address, and every variant is driven through the same
//! [`Transport`] request/response capability.

mod http;
mod stdio;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
use crate::error::{RelayError, Result};

#[async_trait]
pub trait Transport: Send {
    /// Send a request and wait for the response carrying the same id.
    async fn request(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse>;

    async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<()>;

    /// Record the protocol version agreed during `initialize`.
    fn set_protocol_version(&mut self, _version: &str) {}

    async fn close(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    /// Streamable HTTP endpoint.
    Http { url: reqwest::Url },
    /// Server script run as a child process speaking over stdin/stdout.
    Stdio { command: String, script: PathBuf },
}

fn url_scheme() -> &'static Regex {
    static SCHEME: OnceLock<Regex> = OnceLock::new();
    SCHEME.get_or_init(|| {
        Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*)://").expect("scheme pattern is valid")
    })
}

impl TransportKind {
    /// Select a transport for `address`. Fails before anything is spawned or dialed.
    pub fn from_address(address: &str) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(RelayError::TransportValidation(
                "server address is empty".to_string(),
            ));
        }

        if let Some(caps) = url_scheme().captures(address) {
            let scheme = caps[1].to_lowercase();
            if scheme != "http" && scheme != "https" {
                return Err(RelayError::TransportValidation(format!(
                    "unsupported URL scheme '{}': only http and https servers are supported",
                    scheme
                )));
            }
            let url = reqwest::Url::parse(address).map_err(|e| {
                RelayError::TransportValidation(format!("invalid server URL '{}': {}", address, e))
            })?;
            return Ok(TransportKind::Http { url });
        }

        let script = PathBuf::from(address);
        let command = interpreter_for(&script)?;
        Ok(TransportKind::Stdio {
            command: command.to_string(),
            script,
        })
    }

    pub async fn open(&self, verbose: bool) -> Result<Box<dyn Transport>> {
        match self {
            TransportKind::Http { url } => {
                tracing::debug!(%url, "using streamable HTTP transport");
                Ok(Box::new(HttpTransport::new(url.clone())?))
            }
            TransportKind::Stdio { command, script } => {
                tracing::debug!(command = %command, script = %script.display(), "spawning stdio server");
                let args = vec![script.to_string_lossy().into_owned()];
                Ok(Box::new(StdioTransport::spawn(command, &args, verbose)?))
            }
        }
    }
}

fn interpreter_for(script: &Path) -> Result<&'static str> {
    let ext = script.extension().and_then(|ext| ext.to_str()).unwrap_or("");
    if ext.eq_ignore_ascii_case("js") {
        Ok("node")
    } else if ext.eq_ignore_ascii_case("py") {
        Ok(if cfg!(windows) { "python" } else { "python3" })
    } else {
        Err(RelayError::TransportValidation(format!(
            "server script '{}' must be a .js or .py file",
            script.display()
        )))
    }
}

/// A decoded line or event from the server.
pub(crate) enum Incoming {
    Response(JsonRpcResponse),
    /// A notification (no id) or request initiated by the server.
    ServerMessage { method: String, id: Option<Value> },
}

pub(crate) fn classify(value: Value) -> Result<Incoming> {
    if let Some(method) = value.get("method").and_then(Value::as_str) {
        return Ok(Incoming::ServerMessage {
            method: method.to_string(),
            id: value.get("id").cloned(),
        });
    }
    let response: JsonRpcResponse = serde_json::from_value(value)?;
    Ok(Incoming::Response(response))
}

/// The answer owed to a server-initiated request. Notifications get none.
///
/// Only `ping` is served; anything else is refused so the server is not left waiting.
pub(crate) fn reply_to(method: &str, id: Option<Value>) -> Option<Value> {
    let id = id?;
    if method == "ping" {
        return Some(json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "result": {} }));
    }
    Some(json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": { "code": -32601, "message": format!("Method not found: {}", method) }
    }))
}
