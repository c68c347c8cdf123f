pub const DEFAULT_API_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const MODEL: &str = "claude-3-5-sonnet-20241022";

/// Token ceiling for the first completion of a query, the one that advertises tools.
pub const MAX_TOKENS: u32 = 2000;

/// Token ceiling for each follow-up completion after a tool call.
pub const FOLLOWUP_MAX_TOKENS: u32 = 1000;

pub const MCP_PROTOCOL_VERSION: &str = "2025-03-26";
pub const CLIENT_NAME: &str = "mcp-relay";
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}
