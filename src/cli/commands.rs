use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `interview-relay` - streaming relay and terminal client for AI mock interviews.
#[derive(Parser, Debug)]
#[command(name = "interview-relay")]
#[command(version)]
#[command(about = "Streams AI mock-interview turns from a text-generation API.", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.interview-relay/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at DEBUG level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the relay gateway
    Serve {
        /// Port to listen on (use 0 for random available port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Run a mock interview in the terminal against a relay
    Interview {
        /// Job title to interview for (asked interactively when omitted)
        #[arg(short, long)]
        job: Option<String>,

        /// Relay base URL (default: [client] relay_url)
        #[arg(long)]
        relay_url: Option<String>,
    },

    /// Send one message through the streaming chat endpoint
    Chat {
        message: String,

        /// Relay base URL (default: [client] relay_url)
        #[arg(long)]
        relay_url: Option<String>,
    },
}
