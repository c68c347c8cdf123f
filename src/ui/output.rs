use crate::api::ToolDescriptor;
use colored::*;
use std::fmt::Display;
use std::io::{self, Write};

/// Announce the tools the server offers.
pub fn display_connected(tools: &[ToolDescriptor]) {
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    println!(
        "{} {}",
        "Connected to server with tools:".green(),
        format!("[{}]", names.join(", ")).cyan()
    );
}

pub fn display_welcome() {
    println!();
    println!("{}", "MCP client started.".bold());
    println!("{}", "Type your queries or 'quit' to exit.".dimmed());
}

pub fn display_prompt() -> io::Result<()> {
    print!("\n{} ", "Query:".bold());
    io::stdout().flush()
}

/// Show a tool call as it is made.
pub fn display_tool_call(notice: &str) {
    println!("{}", notice.cyan());
}

pub fn display_response(response: &str) {
    println!();
    println!("{}", response);
}

pub fn display_error(error: &dyn Display) {
    eprintln!("{} {}", "Error:".red(), error);
}
