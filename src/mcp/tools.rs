use serde_json::{json, Value};
use std::collections::HashSet;

use super::types::McpTool;
use super::ToolChannel;
use crate::api::ToolDescriptor;
use crate::error::{RelayError, Result};

/// Fetch the server's tools once and convert them for the completion API.
pub async fn load_tools<C>(channel: &mut C) -> Result<Vec<ToolDescriptor>>
where
    C: ToolChannel + ?Sized,
{
    let remote = channel
        .list_tools()
        .await
        .map_err(|e| RelayError::RegistryUnavailable(e.to_string()))?;
    Ok(format_tools_for_llm(remote))
}

/// Map listed tools to descriptors. Names in the result are non-empty and unique.
pub fn format_tools_for_llm(tools: Vec<McpTool>) -> Vec<ToolDescriptor> {
    let mut seen = HashSet::new();
    let mut descriptors = Vec::with_capacity(tools.len());

    for tool in tools {
        if tool.name.trim().is_empty() {
            tracing::warn!("dropping tool with an empty name");
            continue;
        }
        if seen.contains(&tool.name) {
            tracing::warn!("dropping duplicate tool '{}'", tool.name);
            continue;
        }
        let Some(input_schema) = object_schema(tool.input_schema) else {
            tracing::warn!("dropping tool '{}': input schema is not an object schema", tool.name);
            continue;
        };

        seen.insert(tool.name.clone());
        descriptors.push(ToolDescriptor {
            name: tool.name,
            description: tool.description,
            input_schema,
        });
    }

    descriptors
}

fn object_schema(schema: Value) -> Option<Value> {
    match schema {
        Value::Null => Some(json!({ "type": "object" })),
        Value::Object(mut map) => match map.get("type") {
            None => {
                map.insert("type".to_string(), json!("object"));
                Some(Value::Object(map))
            }
            Some(Value::String(t)) if t == "object" => Some(Value::Object(map)),
            Some(_) => None,
        },
        _ => None,
    }
}
