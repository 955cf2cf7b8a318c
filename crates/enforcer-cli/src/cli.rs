//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Flag passed to the elevated copy so it never relaunches itself again
pub const ELEVATED_FLAG: &str = "--elevated";

/// Enforcer - keep the VPN client installed, running and connected
#[derive(Parser, Debug)]
#[command(name = "enforcer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to load (.toml or .json)
    ///
    /// Defaults to enforcer.toml next to the executable, then to built-in
    /// defaults for a stock Cloudflare WARP install.
    #[arg(short, long, global = true, env = "ENFORCER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Set on the copy started with administrator rights
    #[arg(long, global = true, hide = true)]
    pub elevated: bool,

    /// The command to run; defaults to `run`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Verify every health stage and repair the ones that are not healthy
    ///
    /// Exits 0 when everything is healthy, 1 when a stage fails and 2 when
    /// an elevated copy was launched in place of this one.
    Run {
        /// Output the report as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Probe every health stage once without changing anything
    Check {
        /// Output the report as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Write a config file with the default settings
    Init {
        /// Where to write the file
        #[arg(default_value = enforcer_core::DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Run { json: false }
    }
}
