use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use core_logging::LoggingConfig;
use pictor_core::config::ConfigFormat;
use pictor_core::kernel::constants::DEFAULT_LISTEN_ADDR;
use pictor_core::{Application, ConfigData, Result};

/// Pictor: an image server with an event driven request pipeline
#[derive(Parser, Debug)]
#[command(name = "pictor", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Print "pong" and exit
    #[arg(long)]
    pub ping: bool,

    /// Configuration file (.json, .yaml or .toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, default_value = DEFAULT_LISTEN_ADDR)]
        listen: SocketAddr,
    },
    /// Print the loaded configuration as JSON
    Config,
}

/// Configuration from `path`, or an empty one
pub fn load_config(path: Option<&Path>) -> Result<ConfigData> {
    match path {
        Some(path) => ConfigData::load(path),
        None => Ok(ConfigData::new()),
    }
}

/// The `logging` section, defaults when absent or malformed
pub fn logging_config(config: &ConfigData) -> LoggingConfig {
    config.get("logging").unwrap_or_default()
}

/// Application with the adapters from `config` and the logging listeners
pub fn build_application(config: ConfigData) -> Result<Application> {
    let logging = logging_config(&config);
    let mut application = Application::from_config(config)?;
    core_logging::install(&mut application, &logging)?;
    Ok(application)
}

pub fn render_config(config: &ConfigData) -> Result<String> {
    config.serialize(ConfigFormat::Json)
}
