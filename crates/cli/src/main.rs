//! Gridline CLI, the main entry point.
//!
//! Commands:
//! - `chat`   Interactive conversation (default)
//! - `ask`    Single question, single answer
//! - `tools`  Show the tool server's catalog
//! - `init`   Write a default config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "gridline",
    about = "Gridline: talk to a model that can call tools on an MCP server",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.gridline/config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Tool server script (.py or .js); overrides config and MCP_SERVER_PATH
    #[arg(short, long, global = true)]
    server: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively
    Chat,

    /// Ask a single question
    Ask {
        /// The question to send
        #[arg(short, long)]
        message: String,
    },

    /// List the tools the server provides
    Tools,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let options = commands::Options {
        config_path: cli.config,
        server: cli.server,
    };

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => commands::chat::run(&options).await?,
        Commands::Ask { message } => commands::ask::run(&options, &message).await?,
        Commands::Tools => commands::tools::run(&options).await?,
        Commands::Init { force } => commands::init::run(&options, force)?,
    }

    Ok(())
}
