// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! `example-plugin`: a small showcase of plugin commands

use async_trait::async_trait;
use rand::seq::IndexedRandom;

use crate::brain::ToolArgs;
use crate::error::{EchoError, Result};
use crate::plugins::{CommandSpec, Plugin, PluginReply};

use super::calc;

const JOKES: &[&str] = &[
    "Why don't scientists trust atoms? Because they make up everything!",
    "Why did the scarecrow win an award? He was outstanding in his field!",
    "Why don't eggs tell jokes? They'd crack each other up!",
    "What do you call a bear with no teeth? A gummy bear!",
    "Why did the bicycle fall over? It was two tired!",
];

pub struct ExamplePlugin;

#[async_trait]
impl Plugin for ExamplePlugin {
    fn name(&self) -> &str {
        "example-plugin"
    }

    fn description(&self) -> &str {
        "An example plugin showing how to create custom commands"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("greet", "Greet someone by name").with_string_param(
                "name",
                "Who to greet",
                false,
            ),
            CommandSpec::new("calculate", "Perform a simple calculation").with_string_param(
                "expression",
                "Arithmetic expression such as (5 + 3) * 2",
                true,
            ),
            CommandSpec::new("joke", "Tell a random joke"),
            CommandSpec::new("weather", "Get weather information (mock)"),
        ]
    }

    async fn execute(&self, command: &str, args: &ToolArgs) -> Result<PluginReply> {
        match command {
            "greet" => {
                let name = args.text(&["name"]).unwrap_or_else(|| "there".to_string());
                Ok(PluginReply::ok(format!(
                    "Hello, {}! This is a custom command from the example plugin.",
                    name
                )))
            }
            "calculate" => {
                let expression = args.text(&["expression", "expr"]).unwrap_or_default();
                match calc::evaluate(&expression) {
                    Ok(value) => Ok(PluginReply::ok(format!(
                        "The result is {}",
                        calc::format_number(value)
                    ))),
                    Err(e) => {
                        tracing::debug!("Rejected expression {:?}: {}", expression, e);
                        Ok(PluginReply::failed("Invalid calculation"))
                    }
                }
            }
            "joke" => {
                let joke = JOKES.choose(&mut rand::rng()).copied().unwrap_or(JOKES[0]);
                Ok(PluginReply::ok(joke))
            }
            "weather" => Ok(PluginReply::ok(
                "The weather is sunny with a chance of code! (This is a mock response)",
            )),
            other => Err(EchoError::Plugin(format!(
                "Unknown command '{}' for example-plugin",
                other
            ))),
        }
    }
}
