// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! echo-agent - desktop assistant for your terminal
//!
//! Entry point for the echo-agent CLI application.

use clap::Parser;

use echo_agent::cli::{ChatArgs, Cli, Commands};
use echo_agent::config::Settings;
use echo_agent::error::Result;

#[path = "main/chat_runtime.rs"]
mod chat_runtime;
#[path = "main/chat_ui.rs"]
mod chat_ui;
#[path = "main/cli_commands.rs"]
mod cli_commands;

use chat_runtime::{open_config, run_ask, run_chat};
use cli_commands::{
    run_config_command, run_memory_command, run_plugins_command, run_providers,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    // `-v` raises the crate's own level; `RUST_LOG` still applies to everything else.
    if let Some(level) = verbosity_level(cli.verbose) {
        if let Ok(parsed) = format!("echo_agent={}", level).parse() {
            env_filter = env_filter.add_directive(parsed);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Ensure directories exist
    Settings::ensure_directories()?;

    let config = open_config(cli.config.as_deref())?;

    // Dispatch to appropriate command
    match cli.command {
        None => run_chat(ChatArgs::default(), config, cli.directory, cli.verbose).await?,
        Some(Commands::Chat(args)) => run_chat(args, config, cli.directory, cli.verbose).await?,
        Some(Commands::Ask(args)) => run_ask(args, config, cli.directory, &cli.format).await?,
        Some(Commands::Plugins(args)) => {
            run_plugins_command(args, config, cli.directory, &cli.format).await?
        }
        Some(Commands::Memory(args)) => run_memory_command(args, &config, &cli.format).await?,
        Some(Commands::Config(args)) => run_config_command(args, &config, &cli.format)?,
        Some(Commands::Providers) => run_providers(&config.snapshot(), &cli.format)?,
    }

    Ok(())
}

/// Log level for the crate at a given `-v` count
fn verbosity_level(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

#[cfg(test)]
#[path = "main/tests.rs"]
mod tests;
