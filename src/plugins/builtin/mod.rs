// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Plugins compiled into the binary

pub mod calc;
pub mod example;
pub mod productivity;
pub mod reminder;
pub mod system_control;
pub mod workflow;

use std::path::PathBuf;
use std::sync::Arc;

use crate::actions::{DesktopActions, SystemActions};
use crate::config::Workflows;

use super::Plugin;

pub use example::ExamplePlugin;
pub use productivity::ProductivityPlugin;
pub use reminder::{Notifier, ReminderPlugin};
pub use system_control::SystemControlPlugin;
pub use workflow::WorkflowPlugin;

/// Names of the built-in plugins, in discovery order
pub const BUILTIN_PLUGINS: &[&str] = &[
    "example-plugin",
    "system-control-plugin",
    "productivity-plugin",
    "workflow-plugin",
    "reminder-plugin",
];

/// Host services the built-in plugins are constructed with
#[derive(Clone)]
pub struct BuiltinContext {
    /// Where the productivity plugin keeps notes
    pub notes_dir: PathBuf,
    /// Actions workflow steps run through
    pub actions: Arc<dyn SystemActions>,
    pub workflows: Workflows,
    /// How due reminders reach the user
    pub notifier: Notifier,
}

impl BuiltinContext {
    pub fn new(notes_dir: impl Into<PathBuf>) -> Self {
        Self {
            notes_dir: notes_dir.into(),
            actions: Arc::new(DesktopActions::new()),
            workflows: Workflows::new(),
            notifier: reminder::terminal_notifier(),
        }
    }
}

/// Fresh instances of every built-in plugin
pub fn catalog(context: &BuiltinContext) -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(ExamplePlugin),
        Arc::new(SystemControlPlugin),
        Arc::new(ProductivityPlugin::new(&context.notes_dir)),
        Arc::new(WorkflowPlugin::new(
            Arc::clone(&context.actions),
            context.workflows.clone(),
        )),
        Arc::new(ReminderPlugin::new(Arc::clone(&context.notifier))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_matches_names() {
        let plugins = catalog(&BuiltinContext::new("/tmp/notes"));
        let names: Vec<_> = plugins.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, BUILTIN_PLUGINS);
    }

    #[test]
    fn test_builtin_commands_are_unique() {
        let mut seen = HashSet::new();
        for plugin in catalog(&BuiltinContext::new("/tmp/notes")) {
            for command in plugin.commands() {
                assert!(seen.insert(command.name.clone()), "duplicate {}", command.name);
            }
        }
        assert_eq!(seen.len(), 17);
    }
}
