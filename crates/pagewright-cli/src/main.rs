//! The `pagewright` binary.

use std::path::PathBuf;

use anyhow::Context as _;
use pagewright_cli::command::CommandRegistry;
use pagewright_cli::commands::register_builtin_commands;
use pagewright_cli::config::load_settings;
use pagewright_core::logging::setup_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);

    let matches = registry.build_cli().get_matches();
    let config = matches.get_one::<String>("config").map(PathBuf::from);
    let settings = load_settings(config.as_deref()).context("failed to load settings")?;
    setup_logging(&settings);

    registry
        .execute(&matches, &settings)
        .await
        .context("command failed")?;
    Ok(())
}
