pub mod output;

pub use output::{
    display_connected, display_error, display_prompt, display_response, display_tool_call,
    display_welcome,
};
