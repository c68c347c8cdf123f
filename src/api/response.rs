use super::models::ContentBlock;

/// Text of the first block, or an empty string when the first block is not text.
/// Later blocks are never inspected.
pub fn first_text(blocks: &[ContentBlock]) -> String {
    match blocks.first() {
        Some(ContentBlock::Text { text }) => text.clone(),
        _ => String::new(),
    }
}

/// Number of tool-use blocks in a response.
pub fn count_tool_uses(blocks: &[ContentBlock]) -> usize {
    blocks
        .iter()
        .filter(|b| matches!(b, ContentBlock::ToolUse { .. }))
        .count()
}
