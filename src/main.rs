use anyhow::Context;
use clap::Parser;
use colored::*;
use std::process;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use mcp_relay::api::{AnthropicClient, CompletionApi};
use mcp_relay::cli::Args;
use mcp_relay::config::{self, Config};
use mcp_relay::mcp::{load_tools, McpClient, ToolChannel, TransportKind};
use mcp_relay::orchestrator::{Orchestrator, QuerySettings};
use mcp_relay::ui;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let dotenv = config::load_dotenv();
    // Missing settings only matter once a server is given; until then the flag alone decides.
    let config = Config::from_env_and_args(&args);
    init_tracing(config.as_ref().map_or(args.verbose, |c| c.verbose));
    if let Err(e) = dotenv {
        tracing::warn!("Failed to load .env file: {}", e);
    }

    if let Err(e) = run(args, config).await {
        eprintln!("{} {:#}", "Error:".red(), e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "mcp_relay=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args, config: mcp_relay::error::Result<Config>) -> anyhow::Result<()> {
    let Some(server) = args.server.as_deref() else {
        print_usage();
        return Ok(());
    };

    let config = config?;
    tracing::debug!(?config, "configuration loaded");

    // Reject unusable addresses before anything is spawned or dialed.
    let kind = TransportKind::from_address(server)?;
    let completion = AnthropicClient::new(&config)?;

    let mut channel = McpClient::connect(&kind, config.verbose)
        .await
        .with_context(|| format!("Failed to connect to MCP server '{}'", server))?;

    let tools = match load_tools(&mut channel).await {
        Ok(tools) => tools,
        Err(e) => {
            close_channel(channel).await;
            return Err(e.into());
        }
    };
    ui::display_connected(&tools);

    let mut orchestrator = Orchestrator::new(completion, channel, tools, QuerySettings::from(&config));
    let outcome = chat_loop(&mut orchestrator).await;

    let (_, channel) = orchestrator.into_parts();
    close_channel(channel).await;

    outcome
}

async fn chat_loop<C, T>(orchestrator: &mut Orchestrator<C, T>) -> anyhow::Result<()>
where
    C: CompletionApi,
    T: ToolChannel,
{
    ui::display_welcome();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        ui::display_prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("quit") {
            break;
        }

        match orchestrator.process_query(query).await {
            Ok(response) => ui::display_response(&response),
            // A failed query ends only that query.
            Err(e) => ui::display_error(&e),
        }
    }

    Ok(())
}

async fn close_channel(channel: McpClient) {
    if let Err(e) = channel.shutdown().await {
        tracing::warn!("Failed to close MCP connection: {}", e);
    }
}

fn print_usage() {
    println!("{}", "Usage: mcp-relay [OPTIONS] <SERVER>".yellow());
    println!();
    println!("  SERVER is either an http(s) URL of a streamable HTTP MCP server,");
    println!("  or a path to a .js or .py server script to run over stdio.");
    println!();
    println!("Examples:");
    println!("  mcp-relay ./weather/build/index.js");
    println!("  mcp-relay ./weather.py");
    println!("  mcp-relay http://localhost:3000/mcp");
    println!();
    println!(
        "{}",
        format!("The {} environment variable must be set.", config::API_KEY_VAR).dimmed()
    );
}
