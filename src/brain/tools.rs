// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tool declarations offered to the model

use std::collections::HashSet;

use serde_json::json;

use crate::llm::provider::{ParameterSchema, ToolDeclaration};
use crate::plugins::PluginRegistry;

use super::outcome::SYSTEM_TOOL_NAME;

/// The universal system tool
pub fn system_tool() -> ToolDeclaration {
    ToolDeclaration {
        name: SYSTEM_TOOL_NAME.to_string(),
        description: "Execute a system action or shell command on the user's computer"
            .to_string(),
        parameters: ParameterSchema::object(
            json!({
                "command": {
                    "type": "string",
                    "description": "The action to perform, e.g. 'start chrome', 'mkdir test', 'screenshot'"
                },
                "args": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Arguments for the action"
                }
            }),
            vec!["command".to_string()],
        ),
    }
}

/// Built-in tools followed by every loaded plugin command.
///
/// The registry rejects colliding command names at load time; a duplicate
/// reaching this point is dropped with a warning.
pub fn merged_tools(registry: &PluginRegistry) -> Vec<ToolDeclaration> {
    let mut seen = HashSet::new();
    let mut tools = Vec::new();

    for tool in std::iter::once(system_tool()).chain(registry.tool_declarations()) {
        if seen.insert(tool.name.clone()) {
            tools.push(tool);
        } else {
            tracing::warn!("Dropping duplicate tool declaration '{}'", tool.name);
        }
    }
    tools
}
