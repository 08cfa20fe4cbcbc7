// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use echo_agent::actions::DesktopActions;
use echo_agent::assistant::Assistant;
use echo_agent::cli::{AskArgs, ChatArgs, OutputFormat};
use echo_agent::config::{ConfigStore, Settings};
use echo_agent::error::{EchoError, Result};
use echo_agent::memory::{EncryptedFileStore, InMemoryStore, MemoryStore};

use super::chat_ui::{print_help, print_response_prefix, print_result, print_welcome, read_user_input};
use super::cli_commands::print_plugin_table;

/// Open the settings store at `path`, or the default location
pub(super) fn open_config(path: Option<&Path>) -> Result<Arc<ConfigStore>> {
    let store = match path {
        Some(path) => ConfigStore::open(path)?,
        None => ConfigStore::open_default()?,
    };
    tracing::debug!("Settings loaded from {}", store.path().display());
    Ok(Arc::new(store))
}

/// The encrypted store, or an in-process one when it cannot be opened
pub(super) async fn open_memory(settings: &Settings) -> Arc<dyn MemoryStore> {
    match EncryptedFileStore::open_default(settings).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!("Memory unavailable, using a temporary store: {}", e);
            Arc::new(InMemoryStore::new(settings.memory.max_messages))
        }
    }
}

/// Wire up config, memory, plugins, actions and brain
pub(super) async fn build_assistant(
    config: Arc<ConfigStore>,
    directory: Option<PathBuf>,
) -> Result<Assistant> {
    let settings = config.snapshot();
    let memory = open_memory(&settings).await;

    let mut actions = DesktopActions::new();
    if let Some(dir) = directory {
        if !dir.is_dir() {
            return Err(EchoError::InvalidInput(format!(
                "Not a directory: {}",
                dir.display()
            )));
        }
        actions = actions.with_base_dir(dir);
    }

    Ok(Assistant::new(config, memory, Arc::new(actions)).await)
}

/// Run interactive chat mode
pub(super) async fn run_chat(
    args: ChatArgs,
    config: Arc<ConfigStore>,
    directory: Option<PathBuf>,
    verbose: u8,
) -> Result<()> {
    let mut assistant = build_assistant(config, directory).await?;
    let settings = assistant.settings();
    let stream = settings.brain.stream && !args.no_stream;

    if verbose > 0 {
        eprintln!("[verbose] echo-agent starting in chat mode");
        eprintln!("[verbose] Settings: {}", assistant.config().path().display());
    }

    let provider = assistant
        .brain()
        .map(|b| (b.display_name().to_string(), b.model().to_string()));
    print_welcome(
        settings.display_user_name(),
        provider.as_ref().map(|(p, m)| (p.as_str(), m.as_str())),
        &assistant.registry().loaded_names(),
    )?;

    let mut pending = args.prompt;
    loop {
        let input = match pending.take() {
            Some(prompt) => prompt,
            None => match read_user_input()? {
                Some(line) => line,
                None => break,
            },
        };

        match input.to_lowercase().as_str() {
            "" => continue,
            "exit" | "quit" | "/exit" | "/quit" => break,
            "/help" => {
                print_help()?;
                continue;
            }
            "/plugins" => {
                print_plugin_table(&assistant.registry().list_all())?;
                continue;
            }
            "/reload" => {
                let count = assistant.reload_plugins().await;
                println!("{} plugins loaded.\n", count);
                continue;
            }
            "/clear" => {
                assistant.memory().clear().await?;
                println!("Conversation cleared.\n");
                continue;
            }
            _ => {}
        }

        let mut streamed = String::new();
        let result = if stream {
            let mut on_progress = |chunk: &str| {
                if streamed.is_empty() {
                    let _ = print_response_prefix();
                }
                streamed.push_str(chunk);
                print!("{}", chunk);
                let _ = io::stdout().flush();
            };
            assistant.process_input(&input, Some(&mut on_progress)).await
        } else {
            assistant.process_input(&input, None).await
        };
        print_result(&result, &streamed)?;
    }

    Ok(())
}

/// Run a single request and print the result
pub(super) async fn run_ask(
    args: AskArgs,
    config: Arc<ConfigStore>,
    directory: Option<PathBuf>,
    format: &OutputFormat,
) -> Result<()> {
    let prompt = if args.stdin {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        args.prompt.unwrap_or_default()
    };
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(EchoError::InvalidInput(
            "Nothing to ask. Pass a request or use --stdin".to_string(),
        ));
    }

    let assistant = build_assistant(config, directory).await?;
    let result = assistant.process_input(prompt, None).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => println!("{}", result.text),
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
