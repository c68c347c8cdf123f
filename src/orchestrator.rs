use serde_json::{Map, Value};

use crate::api::response::{count_tool_uses, first_text};
use crate::api::{CompletionApi, ContentBlock, Message, MessagesRequest, ToolDescriptor};
use crate::config::{Config, FOLLOWUP_MAX_TOKENS, MAX_TOKENS, MODEL};
use crate::error::Result;
use crate::mcp::ToolChannel;
use crate::ui::display_tool_call;

/// Stands in for a tool result with no content.
pub const EMPTY_TOOL_OUTPUT: &str = "(no output)";

/// Fixed parameters of every completion request.
#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub model: String,
    pub max_tokens: u32,
    pub followup_max_tokens: u32,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            model: MODEL.to_string(),
            max_tokens: MAX_TOKENS,
            followup_max_tokens: FOLLOWUP_MAX_TOKENS,
        }
    }
}

impl From<&Config> for QuerySettings {
    fn from(config: &Config) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            followup_max_tokens: config.followup_max_tokens,
        }
    }
}

/// Turns a query into completion calls and tool calls.
///
/// The orchestrator owns the completion client and the tool channel for the
/// whole session; every query borrows them in turn. Only the first completion
/// of a query advertises tools, so follow-ups can never request another call.
pub struct Orchestrator<C, T> {
    completion: C,
    channel: T,
    tools: Vec<ToolDescriptor>,
    settings: QuerySettings,
}

impl<C, T> Orchestrator<C, T>
where
    C: CompletionApi,
    T: ToolChannel,
{
    pub fn new(completion: C, channel: T, tools: Vec<ToolDescriptor>, settings: QuerySettings) -> Self {
        Self {
            completion,
            channel,
            tools,
            settings,
        }
    }

    /// Give back the completion client and channel, e.g. to shut the channel down.
    pub fn into_parts(self) -> (C, T) {
        (self.completion, self.channel)
    }

    pub async fn process_query(&mut self, query: &str) -> Result<String> {
        // Each query starts a fresh conversation.
        let mut conversation = vec![Message::user(query)];

        let request = MessagesRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            messages: conversation.clone(),
            tools: Some(self.tools.clone()),
        };
        let blocks = self.completion.create(&request).await?;
        tracing::debug!(
            blocks = blocks.len(),
            tool_uses = count_tool_uses(&blocks),
            "initial completion received"
        );

        let mut final_text = Vec::new();
        for block in blocks {
            match block {
                ContentBlock::Text { text } => final_text.push(text),
                ContentBlock::ToolUse { name, input, .. } => {
                    let fragment = self.handle_tool_use(&name, &input, &mut conversation).await?;
                    final_text.push(fragment);
                }
                ContentBlock::Unsupported => {
                    tracing::debug!("skipping unsupported content block");
                }
            }
        }

        Ok(final_text.join("\n"))
    }

    async fn handle_tool_use(
        &mut self,
        name: &str,
        arguments: &Map<String, Value>,
        conversation: &mut Vec<Message>,
    ) -> Result<String> {
        let notice = format!(
            "[Calling tool {} with args {}]",
            name,
            Value::Object(arguments.clone())
        );
        display_tool_call(&notice);

        let result = self.channel.call_tool(name, arguments).await?;
        tracing::debug!(tool = name, bytes = result.content.len(), "tool returned");

        // The Messages API has no tool role for plain-string turns; results go back as user text.
        // It also rejects empty non-final turns, which a tool with no output would produce.
        let content = if result.content.trim().is_empty() {
            EMPTY_TOOL_OUTPUT.to_string()
        } else {
            result.content
        };
        conversation.push(Message::user(content));

        let followup = MessagesRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.followup_max_tokens,
            messages: conversation.clone(),
            tools: None,
        };
        let blocks = self.completion.create(&followup).await?;

        Ok(format!("{}\n{}", notice, first_text(&blocks)))
    }
}
