//! `gridline init`: write a default config file.

use gridline_config::AppConfig;

use super::Options;

pub fn run(options: &Options, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = options.config_file();
    if path.exists() && !force {
        println!("  Config already exists at {}", path.display());
        println!("  Use --force to overwrite it.");
        return Ok(());
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;

    println!("  Wrote {}", path.display());
    println!("  Set ANTHROPIC_API_KEY and server.script_path (or MCP_SERVER_PATH) to get started.");
    Ok(())
}
