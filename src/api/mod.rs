pub mod client;
pub mod models;
pub mod response;

use async_trait::async_trait;

use crate::error::Result;

pub use client::AnthropicClient;
pub use models::{ContentBlock, Message, MessagesRequest, Role, ToolDescriptor};

/// The completion service: turns a conversation into content blocks.
#[async_trait]
pub trait CompletionApi: Send + Sync {
    async fn create(&self, request: &MessagesRequest) -> Result<Vec<ContentBlock>>;
}
