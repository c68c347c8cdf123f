use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "mcp-relay")]
#[command(
    about = "Chat with Claude using the tools of an MCP server",
    long_about = None
)]
pub struct Args {
    #[arg(
        value_name = "SERVER",
        help = "MCP server: an http(s) URL, or a path to a .js or .py server script"
    )]
    pub server: Option<String>,

    #[arg(short = 'v', long = "verbose", help = "Enable debug logging")]
    pub verbose: bool,
}
