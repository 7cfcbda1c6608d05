//! nodeprobe -- builds one Docker image per Node.js version, runs a check
//! battery inside it and tears everything down again.

mod checks;
mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use nodeprobe_core::config::NodeprobeConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

const DEFAULT_CONFIG_PATH: &str = "nodeprobe.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 설정 로드 실패는 명령 실행 단계에서 보고하고, 로깅은 기본값으로 초기화
    let loaded = load_config(cli.config.as_deref()).await;
    let mut general = loaded
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_default();
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    logging::init_tracing(&general)?;

    tracing::debug!(config = ?cli.config, "nodeprobe starting");

    if let Err(e) = dispatch(cli, loaded).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }

    Ok(())
}

/// An explicit `--config` must exist; the implicit default may be absent.
async fn load_config(path: Option<&Path>) -> Result<NodeprobeConfig, CliError> {
    let config = match path {
        Some(path) => NodeprobeConfig::load(path).await?,
        None => NodeprobeConfig::load_or_default(DEFAULT_CONFIG_PATH).await?,
    };
    Ok(config)
}

async fn dispatch(cli: Cli, loaded: Result<NodeprobeConfig, CliError>) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, &loaded?, &writer).await,
        Commands::Cleanup(args) => commands::cleanup::execute(args, &loaded?, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &config_path, &writer).await,
    }
}
