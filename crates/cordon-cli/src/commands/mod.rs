//! CLI command definitions and dispatch.

pub mod events;

use clap::{Parser, Subcommand};

/// Cordon — container confinement and monitoring.
#[derive(Parser, Debug)]
#[command(name = "cordon", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log output format (text or json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: String,

    /// Root directory for container runtime state.
    #[arg(long, global = true, default_value = cordon_common::constants::DEFAULT_STATE_ROOT)]
    pub root: String,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream stats and OOM events for one or more running containers.
    Events(events::EventsArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Events(args) => events::execute(&cli.root, args),
    }
}
