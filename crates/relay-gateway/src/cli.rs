//! Command line of the `relay` binary

use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(about = "MCP relay: math server, tool host and model gateway")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Override the configured log level
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Stdio,
    Http,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the math expression MCP server
    Serve {
        #[arg(long, value_enum, default_value_t = Transport::Stdio)]
        transport: Transport,

        /// Listen address for the HTTP transport
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: SocketAddr,

        /// Keep per-session state on the HTTP transport
        #[arg(long)]
        stateful: bool,
    },

    /// Evaluate a math expression locally
    Eval {
        expression: String,
    },

    /// Connect to the configured MCP servers and list their function tools
    Tools {
        /// Print the tools as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask a model, letting it call the configured MCP tools
    Query {
        text: String,

        #[arg(long, default_value = "openai")]
        provider: String,

        #[arg(long, default_value = "gpt-4.1-nano")]
        model: String,

        #[arg(long)]
        max_output_tokens: Option<u32>,
    },

    /// Fetch a prompt from the first configured MCP server offering it
    Prompt {
        name: String,

        /// Prompt argument as KEY=VALUE, repeatable
        #[arg(short, long = "arg", value_parser = parse_key_value)]
        args: Vec<(String, String)>,
    },

    /// One chat call against the configured provider
    Chat {
        text: String,

        /// Use the hosted chat-completion endpoint, offering it the MCP tools
        #[arg(long)]
        hosted: bool,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}
