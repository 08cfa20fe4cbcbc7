// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap
//!
//! Defines all command-line arguments and subcommands for echo-agent.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Echo - desktop voice assistant for your terminal
#[derive(Parser, Debug)]
#[command(name = "echo-agent")]
#[command(version, about = "Desktop assistant driven by an LLM brain and plugins")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Working directory for file and terminal actions (defaults to current)
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Settings file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive session (default when no command given)
    Chat(ChatArgs),

    /// Send a single request and print the result
    Ask(AskArgs),

    /// Manage plugins
    #[command(alias = "plugin")]
    Plugins(PluginsArgs),

    /// Inspect or clear conversation memory
    Memory(MemoryArgs),

    /// Read or change settings
    #[command(alias = "settings")]
    Config(ConfigArgs),

    /// List supported AI providers and whether they are configured
    Providers,
}

/// Arguments for the chat subcommand
#[derive(clap::Args, Debug, Default)]
pub struct ChatArgs {
    /// Initial request (optional)
    pub prompt: Option<String>,

    /// Disable streaming output
    #[arg(long)]
    pub no_stream: bool,
}

/// Arguments for the ask subcommand
#[derive(clap::Args, Debug)]
pub struct AskArgs {
    /// The request, e.g. "open notepad"
    pub prompt: Option<String>,

    /// Read the request from stdin
    #[arg(long)]
    pub stdin: bool,
}

/// Arguments for plugin management
#[derive(clap::Args, Debug)]
pub struct PluginsArgs {
    #[command(subcommand)]
    pub command: PluginsCommands,
}

/// Plugin subcommands
#[derive(Subcommand, Debug)]
pub enum PluginsCommands {
    /// List every discoverable plugin
    List,

    /// Enable a plugin and persist the choice
    Enable {
        /// Plugin name
        name: String,
    },

    /// Disable a plugin and persist the choice
    Disable {
        /// Plugin name
        name: String,
    },

    /// List commands offered by loaded plugins
    Commands,

    /// Run a plugin command directly
    Run {
        /// Command name
        command: String,

        /// Arguments as a JSON object or array, or plain words
        args: Vec<String>,
    },
}

/// Arguments for memory management
#[derive(clap::Args, Debug)]
pub struct MemoryArgs {
    #[command(subcommand)]
    pub command: MemoryCommands,
}

/// Memory subcommands
#[derive(Subcommand, Debug)]
pub enum MemoryCommands {
    /// Show recent messages
    Show {
        /// Maximum number of messages to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Search messages
    Search {
        /// Case-insensitive search text
        query: String,
    },

    /// Show remembered facts
    Facts,

    /// Forget every message
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Arguments for settings/config
#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommands>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    #[command(alias = "show")]
    List,

    /// Set a configuration value
    Set {
        /// Dotted key (e.g., "aiProvider", "apiKeys.openai")
        key: String,

        /// Value to set; parsed as JSON when possible
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Dotted key
        key: String,
    },

    /// Print the settings file path
    Path,

    /// Reset configuration to defaults
    Reset,
}

/// Output format for responses
#[derive(ValueEnum, Clone, Debug, Default, PartialEq)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Text,

    /// JSON output
    Json,
}
