use async_trait::async_trait;
use mcp_relay::error::{RelayError, Result};
use mcp_relay::mcp::{format_tools_for_llm, load_tools, McpTool, ToolChannel, ToolResult};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

struct ListingChannel {
    listing: Option<Vec<McpTool>>,
}

#[async_trait]
impl ToolChannel for ListingChannel {
    async fn list_tools(&mut self) -> Result<Vec<McpTool>> {
        self.listing
            .clone()
            .ok_or_else(|| RelayError::Transport("server closed its output".to_string()))
    }

    async fn call_tool(&mut self, name: &str, _arguments: &Map<String, Value>) -> Result<ToolResult> {
        Err(RelayError::tool(name, "not expected"))
    }
}

fn tool(name: &str, schema: Value) -> McpTool {
    McpTool {
        name: name.to_string(),
        description: Some(format!("{} tool", name)),
        input_schema: schema,
    }
}

#[tokio::test]
async fn test_load_tools_maps_schema_and_description() {
    let mut channel = ListingChannel {
        listing: Some(vec![tool(
            "get_forecast",
            json!({
                "type": "object",
                "properties": {
                    "latitude": { "type": "number" },
                    "longitude": { "type": "number" }
                },
                "required": ["latitude", "longitude"]
            }),
        )]),
    };

    let tools = load_tools(&mut channel).await.unwrap();

    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "get_forecast");
    assert_eq!(tools[0].description.as_deref(), Some("get_forecast tool"));
    assert_eq!(tools[0].input_schema["required"], json!(["latitude", "longitude"]));

    // Serialized the way the completion API expects it.
    let wire = serde_json::to_value(&tools[0]).unwrap();
    assert!(wire.get("input_schema").is_some());
    assert!(wire.get("inputSchema").is_none());
}

#[tokio::test]
async fn test_listing_failure_is_registry_unavailable() {
    let mut channel = ListingChannel { listing: None };
    let err = load_tools(&mut channel).await.unwrap_err();
    assert!(matches!(err, RelayError::RegistryUnavailable(_)));
}

#[test]
fn test_names_are_non_empty_and_unique() {
    let tools = format_tools_for_llm(vec![
        tool("alpha", json!({"type": "object"})),
        tool("", json!({"type": "object"})),
        tool("beta", json!({"type": "object"})),
        tool("alpha", json!({"type": "object", "properties": {"x": {"type": "string"}}})),
        tool("   ", json!({"type": "object"})),
    ]);

    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    let unique: HashSet<&str> = names.iter().copied().collect();
    assert_eq!(unique.len(), names.len());
    // First occurrence wins.
    assert!(tools[0].input_schema.get("properties").is_none());
}

#[test]
fn test_missing_schema_type_becomes_object() {
    let tools = format_tools_for_llm(vec![
        tool("no_schema", Value::Null),
        tool("untyped", json!({"properties": {"q": {"type": "string"}}})),
    ]);

    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0].input_schema, json!({"type": "object"}));
    assert_eq!(tools[1].input_schema["type"], "object");
    assert_eq!(tools[1].input_schema["properties"]["q"]["type"], "string");
}

#[test]
fn test_non_object_schemas_are_dropped() {
    let tools = format_tools_for_llm(vec![
        tool("array_input", json!({"type": "array"})),
        tool("bare_string", json!("object")),
        tool("ok", json!({"type": "object"})),
    ]);

    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "ok");
}

#[test]
fn test_description_passes_through_unchanged() {
    let mut no_description = tool("plain", json!({"type": "object"}));
    no_description.description = None;

    let tools = format_tools_for_llm(vec![no_description]);
    assert_eq!(tools[0].description, None);

    let wire = serde_json::to_value(&tools[0]).unwrap();
    assert!(wire.get("description").is_none());
}

#[test]
fn test_unknown_listing_fields_are_dropped() {
    let listed: McpTool = serde_json::from_value(json!({
        "name": "search",
        "title": "Search",
        "description": "Full text search",
        "inputSchema": {"type": "object"},
        "annotations": {"readOnlyHint": true}
    }))
    .unwrap();

    let tools = format_tools_for_llm(vec![listed]);
    let wire = serde_json::to_value(&tools[0]).unwrap();
    let keys: HashSet<&str> = wire.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, HashSet::from(["name", "description", "input_schema"]));
}
