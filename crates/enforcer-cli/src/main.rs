//! Enforcer CLI
//!
//! Keeps a VPN client installed, its service configured and running, its
//! window open and its tunnel connected.

mod cli;
mod commands;
mod error;
mod host;
mod logging;

use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use enforcer_core::EnforcerConfig;

use cli::{Cli, Commands};
use commands::{Exit, Relaunch};
use error::Result;
use host::SystemHost;

fn main() {
    match run() {
        Ok(exit) => std::process::exit(exit.code()),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(Exit::Failure.code());
        }
    }
}

fn run() -> Result<Exit> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match cli.command.clone().unwrap_or_default() {
        Commands::Init { path, force } => {
            commands::run_init(&path, force)?;
            Ok(Exit::Success)
        }
        Commands::Run { json } => {
            let config = load_config(&cli)?;
            let host = SystemHost::new();
            let relaunch = Relaunch::from_env(cli.elevated);
            commands::run_reconcile(host.collaborators(), &config, json, &relaunch)
        }
        Commands::Check { json } => {
            let config = load_config(&cli)?;
            let host = SystemHost::new();
            commands::run_check(host.collaborators(), &config, json)
        }
    }
}

/// Load the config named on the command line, or the one next to the executable
fn load_config(cli: &Cli) -> Result<EnforcerConfig> {
    let exe_dir = executable_dir();
    let (config, source) = EnforcerConfig::resolve(cli.config.as_deref(), exe_dir.as_deref())?;
    match source {
        Some(path) => tracing::debug!(path = %path.display(), "Loaded configuration"),
        None => tracing::debug!("Using built-in configuration"),
    }
    Ok(config)
}

fn executable_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent().map(Path::to_path_buf)
}
