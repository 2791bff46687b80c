//! # cordon — container confinement and monitoring CLI
//!
//! Operational core of the Cordon container runtime: bootstrap
//! confinement for scheduled processes and live stats/OOM streaming for
//! running containers.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;

use clap::Parser;
use cordon_runtime::logs::{LogConfig, configure_logging};

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    configure_logging(&LogConfig {
        debug: cli.debug,
        format: cli.log_format.parse()?,
    })?;

    commands::execute(cli)
}
