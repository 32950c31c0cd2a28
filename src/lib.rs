pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod ics;
pub mod window;

use anyhow::Result;
use batch::{BatchPaths, trim_directory};
use chrono::Local;
use cli::{Cli, Commands, ConfigActions};
use log::*;

/// Run the command described by `cli`. Returns `Ok(false)` when some files
/// could not be trimmed.
pub async fn run(cli: Cli) -> Result<bool> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    cli.overrides.apply(&mut config);

    match cli.command {
        Some(Commands::Config {
            action: ConfigActions::Show,
        }) => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(true)
        }
        Some(Commands::Config {
            action: ConfigActions::Path,
        }) => {
            println!("{}", crate::config::get_config_path()?.display());
            Ok(true)
        }
        None => trim_from_config(&config).await,
    }
}

async fn trim_from_config(config: &Config) -> Result<bool> {
    let window = config.window(Local::now().date_naive())?;
    let options = config.trim_options();
    info!("Trimming events to {}", window);
    debug!("Trim options: {:?}", options);

    let paths = BatchPaths {
        input_dir: config.files.input_dir.clone(),
        output_dir: config.files.output_dir.clone(),
        extension: config.files.extension.clone(),
    };
    let report = trim_directory(&paths, window, options).await?;

    info!(
        "Wrote {} file(s) to {}: kept {} event(s), removed {}",
        report.written.len(),
        paths.output_dir.display(),
        report.stats.kept,
        report.stats.removed
    );
    if !report.is_success() {
        warn!("{} file(s) could not be trimmed", report.failed.len());
    }
    Ok(report.is_success())
}

// Re-export commonly used types
pub use config::Config;
pub use error::TrimError;
pub use ics::{TrimOptions, trim, trim_calendars};
pub use window::TrimWindow;
