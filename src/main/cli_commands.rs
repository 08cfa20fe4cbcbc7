// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    ExecutableCommand,
};
use serde_json::Value;

use echo_agent::brain::ToolArgs;
use echo_agent::cli::{
    ConfigArgs, ConfigCommands, MemoryArgs, MemoryCommands, OutputFormat, PluginsArgs,
    PluginsCommands,
};
use echo_agent::config::{ConfigStore, Settings};
use echo_agent::error::{EchoError, Result};
use echo_agent::llm::factory::{ProviderFactory, ProviderKind};
use echo_agent::plugins::PluginSummary;

use super::chat_runtime::{build_assistant, open_memory};
use super::chat_ui::format_history_line;

/// Shown instead of a stored API key
const MASKED_KEY: &str = "********";

/// Turn CLI words into plugin arguments. A single JSON object or array is
/// used as-is; anything else becomes positional strings.
pub(super) fn parse_plugin_args(args: &[String]) -> ToolArgs {
    if let [single] = args {
        if let Ok(value @ (Value::Object(_) | Value::Array(_))) =
            serde_json::from_str::<Value>(single)
        {
            return ToolArgs::from(value);
        }
    }
    ToolArgs::strings(args.iter().cloned())
}

/// Settings as JSON with API keys hidden
pub(super) fn masked_settings(settings: &Settings) -> Result<Value> {
    let mut value = serde_json::to_value(settings)?;
    if let Some(Value::Object(keys)) = value.get_mut("apiKeys") {
        for key in keys.values_mut() {
            if key.as_str().is_some_and(|k| !k.is_empty()) {
                *key = Value::String(MASKED_KEY.to_string());
            }
        }
    }
    Ok(value)
}

/// Print plugins as an aligned table
pub(super) fn print_plugin_table(plugins: &[PluginSummary]) -> Result<()> {
    let mut stdout = io::stdout();

    if plugins.is_empty() {
        println!("\nNo plugins found.\n");
        return Ok(());
    }

    println!("\nPlugins:\n");
    for plugin in plugins {
        let (marker, color) = match (plugin.enabled, plugin.loaded) {
            (true, true) => ("●", Color::Green),
            (true, false) => ("◐", Color::Yellow),
            _ => ("○", Color::DarkGrey),
        };
        stdout.execute(SetForegroundColor(color))?;
        print!("  {} ", marker);
        stdout.execute(ResetColor)?;
        println!(
            "{:<24} v{:<8} {}",
            plugin.name, plugin.version, plugin.description
        );
        stdout.execute(SetForegroundColor(Color::DarkGrey))?;
        println!("      {} | {}", plugin.source, plugin.commands.join(", "));
        stdout.execute(ResetColor)?;
    }
    println!("\n  ● loaded  ◐ enabled, not loaded  ○ disabled\n");
    Ok(())
}

/// Run plugin subcommands
pub(super) async fn run_plugins_command(
    args: PluginsArgs,
    config: Arc<ConfigStore>,
    directory: Option<PathBuf>,
    format: &OutputFormat,
) -> Result<()> {
    let mut assistant = build_assistant(config, directory).await?;

    match args.command {
        PluginsCommands::List => {
            let plugins = assistant.registry().list_all();
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plugins)?),
                OutputFormat::Text => print_plugin_table(&plugins)?,
            }
        }

        PluginsCommands::Enable { name } => {
            assistant.enable_plugin(&name).await?;
            println!("Plugin '{}' enabled.", name);
        }

        PluginsCommands::Disable { name } => {
            assistant.disable_plugin(&name).await?;
            println!("Plugin '{}' disabled.", name);
        }

        PluginsCommands::Commands => {
            let commands = assistant.registry().available_commands();
            if commands.is_empty() {
                println!("\nNo plugin commands loaded.\n");
                return Ok(());
            }
            println!("\nPlugin commands:\n");
            for info in commands {
                println!("  {:<16} {:<24} {}", info.name, info.plugin, info.description);
            }
            println!();
        }

        PluginsCommands::Run { command, args } => {
            let outcome = assistant
                .registry()
                .execute_command(&command, &parse_plugin_args(&args))
                .await;
            match (outcome.success, outcome.result, outcome.error) {
                (true, Some(reply), _) => println!("{}", reply.message),
                (_, _, error) => {
                    return Err(EchoError::Plugin(
                        error.unwrap_or_else(|| "Unknown plugin failure".to_string()),
                    ))
                }
            }
        }
    }

    Ok(())
}

/// Run memory subcommands
pub(super) async fn run_memory_command(
    args: MemoryArgs,
    config: &ConfigStore,
    format: &OutputFormat,
) -> Result<()> {
    let memory = open_memory(&config.snapshot()).await;

    let messages = match args.command {
        MemoryCommands::Show { limit } => memory.get_history(limit).await?,
        MemoryCommands::Search { query } => memory.search(&query).await?,
        MemoryCommands::Facts => {
            let facts = memory.facts().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&facts)?),
                OutputFormat::Text if facts.is_empty() => println!("\nNo facts remembered.\n"),
                OutputFormat::Text => {
                    println!();
                    for fact in facts {
                        println!("  {:<20} {}", fact.key, fact.value);
                    }
                    println!();
                }
            }
            return Ok(());
        }
        MemoryCommands::Clear { force } => {
            if !force {
                println!("This will delete ALL conversation memory.");
                println!("Run with --force to confirm.");
                return Ok(());
            }
            memory.clear().await?;
            println!("Memory cleared.");
            return Ok(());
        }
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&messages)?),
        OutputFormat::Text if messages.is_empty() => println!("\nNo messages.\n"),
        OutputFormat::Text => {
            println!();
            for message in &messages {
                println!("  {}", format_history_line(message));
            }
            println!();
        }
    }
    Ok(())
}

/// Run settings subcommands
pub(super) fn run_config_command(
    args: ConfigArgs,
    config: &ConfigStore,
    format: &OutputFormat,
) -> Result<()> {
    match args.command.unwrap_or(ConfigCommands::List) {
        ConfigCommands::List => {
            let json = serde_json::to_string_pretty(&masked_settings(&config.snapshot())?)?;
            println!("{}", json);
        }
        ConfigCommands::Get { key } => {
            let value = config
                .get_value(&key)?
                .ok_or_else(|| EchoError::InvalidInput(format!("Unknown setting: {}", key)))?;
            match (format, &value) {
                (OutputFormat::Text, Value::String(s)) => println!("{}", s),
                _ => println!("{}", serde_json::to_string_pretty(&value)?),
            }
        }
        ConfigCommands::Set { key, value } => {
            config.set_value(&key, &value)?;
            println!("Setting '{}' updated.", key);
        }
        ConfigCommands::Path => println!("{}", config.path().display()),
        ConfigCommands::Reset => {
            config.reset()?;
            println!("Settings reset to defaults.");
        }
    }
    Ok(())
}

/// List providers with their default model and key status
pub(super) fn run_providers(settings: &Settings, format: &OutputFormat) -> Result<()> {
    let active = settings.ai_provider.parse::<ProviderKind>().ok();

    if *format == OutputFormat::Json {
        let rows: Vec<Value> = ProviderKind::ALL
            .iter()
            .map(|kind| {
                serde_json::json!({
                    "name": kind.as_str(),
                    "displayName": kind.display_name(),
                    "defaultModel": kind.default_model(),
                    "models": kind.models(),
                    "configured": ProviderFactory::is_configured(*kind, settings),
                    "active": active == Some(*kind),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut stdout = io::stdout();
    println!("\nProviders:\n");
    for kind in ProviderKind::ALL {
        let configured = ProviderFactory::is_configured(kind, settings);
        let marker = if active == Some(kind) { "*" } else { " " };
        print!(
            "  {} {:<10} {:<16} {:<26} ",
            marker,
            kind.as_str(),
            kind.display_name(),
            kind.default_model()
        );
        if configured {
            stdout.execute(SetForegroundColor(Color::Green))?;
            println!("✓ configured");
        } else {
            stdout.execute(SetForegroundColor(Color::Yellow))?;
            println!("✗ no API key");
        }
        stdout.execute(ResetColor)?;
    }
    println!("\n  * active provider\n");
    Ok(())
}
