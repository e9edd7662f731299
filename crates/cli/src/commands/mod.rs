pub mod ask;
pub mod chat;
pub mod console;
pub mod init;
pub mod tools;

use std::path::PathBuf;
use std::sync::Arc;

use gridline_agent::Session;
use gridline_config::AppConfig;
use gridline_core::event::EventBus;
use gridline_core::tool::ToolChannel;
use gridline_mcp::McpToolChannel;
use tracing::{debug, info, warn};

/// Flags shared by every subcommand.
pub struct Options {
    pub config_path: Option<PathBuf>,
    pub server: Option<String>,
}

impl Options {
    pub fn config_file(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
    }

    /// Load config from file and environment, then apply `--server`.
    pub fn load_config(&self) -> Result<AppConfig, Box<dyn std::error::Error>> {
        let mut config = AppConfig::load_with_env(&self.config_file())
            .map_err(|e| format!("Failed to load config: {e}"))?;

        if let Some(script) = &self.server {
            config.server.script_path = Some(script.clone());
            config.server.command = None;
            config.server.args.clear();
            debug!(script = %script, "Tool server overridden from the command line");
        }

        Ok(config)
    }
}

/// Build the provider, start the tool server, and fetch its catalog.
pub async fn open_session(
    options: &Options,
) -> Result<(Session, AppConfig), Box<dyn std::error::Error>> {
    let config = options.load_config()?;

    // Check for API key early, give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export ANTHROPIC_API_KEY='sk-ant-...'");
        eprintln!("    export GRIDLINE_API_KEY='sk-ant-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", options.config_file().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = gridline_providers::from_config(&config)?;

    let channel: Arc<dyn ToolChannel> = Arc::new(McpToolChannel::connect(&config.server).await?);
    let event_bus = Arc::new(EventBus::default());

    match Session::connect(provider, channel.clone(), &config, event_bus).await {
        Ok(session) => {
            info!(model = %config.model, tools = session.tools().len(), "Session ready");
            Ok((session, config))
        }
        Err(e) => {
            warn!(error = %e, "Failed to load tool catalog, stopping tool server");
            channel.shutdown().await;
            Err(e.into())
        }
    }
}
