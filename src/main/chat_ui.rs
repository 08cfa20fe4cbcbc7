// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io::{self, Write};

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    ExecutableCommand,
};

use echo_agent::error::Result;
use echo_agent::llm::message::{Message, Role};
use echo_agent::router::RouteResult;

/// Print the session banner
pub(super) fn print_welcome(
    user_name: &str,
    provider: Option<(&str, &str)>,
    plugins: &[&str],
) -> Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Cyan))?;
    println!("echo-agent v{}", env!("CARGO_PKG_VERSION"));
    stdout.execute(ResetColor)?;
    println!("At your service, {}.", user_name);

    match provider {
        Some((name, model)) => {
            println!("Provider: {}", name);
            println!("Model: {}", model);
        }
        None => {
            stdout.execute(SetForegroundColor(Color::Yellow))?;
            println!("⚠ No AI provider configured; requests will not be answered");
            stdout.execute(ResetColor)?;
        }
    }

    if !plugins.is_empty() {
        println!("Plugins: {}", plugins.join(", "));
    }
    println!("Type /help for commands, exit to quit\n");
    Ok(())
}

/// Print help message
pub(super) fn print_help() -> Result<()> {
    println!("\nCommands:");
    println!("  /plugins   - List loaded plugins and their commands");
    println!("  /reload    - Reload enabled plugins");
    println!("  /clear     - Forget the conversation");
    println!("  /help      - Show this help message");
    println!("  exit       - Exit echo-agent");
    println!("\nAnything else is sent to the assistant, e.g.:");
    println!("  open notepad");
    println!("  what time is it?");
    println!("  take a screenshot");
    println!();
    Ok(())
}

/// Read user input
pub(super) fn read_user_input() -> Result<Option<String>> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Green))?;
    print!("you: ");
    stdout.execute(ResetColor)?;
    stdout.flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        // EOF
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

/// Print the assistant's name before its reply
pub(super) fn print_response_prefix() -> Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Cyan))?;
    print!("echo: ");
    stdout.execute(ResetColor)?;
    stdout.flush()?;
    Ok(())
}

/// Print the final result. `streamed` is the text already shown while
/// streaming; it is not repeated.
pub(super) fn print_result(result: &RouteResult, streamed: &str) -> Result<()> {
    let mut stdout = io::stdout();

    if streamed.is_empty() {
        print_response_prefix()?;
    }
    if !streamed.is_empty() && streamed.trim() != result.text.trim() {
        println!();
        print_response_prefix()?;
    }
    if streamed.trim() != result.text.trim() {
        if !result.success {
            stdout.execute(SetForegroundColor(Color::Red))?;
        }
        print!("{}", result.text);
        stdout.execute(ResetColor)?;
    }
    println!();

    if let Some(action) = &result.action {
        stdout.execute(SetForegroundColor(Color::DarkGrey))?;
        println!("  ╰─ {}", action);
        stdout.execute(ResetColor)?;
    }
    println!();
    Ok(())
}

/// One line per stored message
pub(super) fn format_history_line(message: &Message) -> String {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "echo",
    };
    format!(
        "[{}] {}: {}",
        message.timestamp.format("%Y-%m-%d %H:%M"),
        who,
        message.content
    )
}
