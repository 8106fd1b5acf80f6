use anyhow::{Context, Result};
use std::sync::Arc;

use crate::app::status::{render_check, render_status};
use crate::cli::{Cli, Commands};
use glider::Config;
use glider::presence::EnabledFlag;
use glider::status::{SpaceApiSource, StatusSource};

async fn run_check(config: &Config) -> Result<()> {
    let source = SpaceApiSource::new(config.status.endpoint.clone(), config.request_timeout())?;
    let observation = source
        .poll()
        .await
        .with_context(|| format!("Failed to poll {}", source.endpoint()))?;
    println!("{}", render_check(source.endpoint(), &observation));
    Ok(())
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => glider::platform::daemon::run(Arc::new(config)).await,
        Commands::Check => run_check(&config).await,
        Commands::Status => {
            let enabled = EnabledFlag::load(config.enabled_marker_path());
            println!("{}", render_status(&config, enabled.is_enabled()));
            Ok(())
        }
    }
}
