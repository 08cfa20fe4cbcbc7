// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! `workflow-plugin`: run a named sequence of actions from the `workflows`
//! setting

use std::sync::Arc;

use async_trait::async_trait;

use crate::actions::{ActionResult, SystemActions};
use crate::brain::ToolArgs;
use crate::config::{find_workflow, StepKind, WorkflowStep, Workflows};
use crate::error::{EchoError, Result};
use crate::plugins::{CommandSpec, Plugin, PluginReply};

pub struct WorkflowPlugin {
    actions: Arc<dyn SystemActions>,
    workflows: Workflows,
}

impl WorkflowPlugin {
    pub fn new(actions: Arc<dyn SystemActions>, workflows: Workflows) -> Self {
        Self { actions, workflows }
    }

    async fn run_step(&self, step: &WorkflowStep) -> ActionResult {
        match step.kind {
            StepKind::App => self.actions.open_app(&step.value).await,
            StepKind::Url => self.actions.open_url(&step.value).await,
            StepKind::Search => self.actions.web_search(&step.value).await,
            StepKind::Command => self.actions.run_terminal_command(&step.value).await,
            StepKind::Unknown => ActionResult::failed("Unknown action type"),
        }
    }

    /// Steps run in order; a failed step is logged and the rest still run.
    async fn run(&self, args: &ToolArgs) -> PluginReply {
        let Some(requested) = args.text(&["name", "workflow"]) else {
            return PluginReply::failed("Please specify a workflow name, sir.");
        };
        let Some((name, steps)) = find_workflow(&self.workflows, &requested) else {
            return PluginReply::failed(format!(
                "I couldn't find a workflow named \"{}\", sir.",
                requested.trim()
            ));
        };

        tracing::info!("Running workflow {} ({} steps)", name, steps.len());
        let mut succeeded = 0;
        for (index, step) in steps.iter().enumerate() {
            let result = self.run_step(step).await;
            if result.success {
                succeeded += 1;
            } else {
                tracing::warn!(
                    "Workflow {} step {} ({} {}) failed: {}",
                    name,
                    index + 1,
                    step.kind,
                    step.value,
                    result.error.unwrap_or_default()
                );
            }
        }

        PluginReply::ok(format!(
            "Workflow \"{}\" completed. Executed {} of {} actions successfully.",
            name,
            succeeded,
            steps.len()
        ))
    }

    fn list(&self) -> PluginReply {
        if self.workflows.is_empty() {
            return PluginReply::ok(
                "No workflows are configured. Add them under \"workflows\" in settings.json.",
            );
        }
        let names: Vec<&str> = self.workflows.keys().map(String::as_str).collect();
        PluginReply::ok(format!("Available workflows: {}", names.join(", ")))
    }
}

#[async_trait]
impl Plugin for WorkflowPlugin {
    fn name(&self) -> &str {
        "workflow-plugin"
    }

    fn description(&self) -> &str {
        "Execute custom multi-action workflows."
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("workflow", "Execute a predefined sequence of actions")
                .with_string_param("name", "Name of the workflow to run", true),
            CommandSpec::new("list_workflows", "List the configured workflows"),
        ]
    }

    async fn execute(&self, command: &str, args: &ToolArgs) -> Result<PluginReply> {
        match command {
            "workflow" => Ok(self.run(args).await),
            "list_workflows" => Ok(self.list()),
            other => Err(EchoError::Plugin(format!(
                "Unknown command '{}' for workflow-plugin",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::MockSystemActions;
    use serde_json::json;

    fn morning() -> Workflows {
        let mut workflows = Workflows::new();
        workflows.insert(
            "Morning".to_string(),
            vec![
                WorkflowStep::new(StepKind::App, "code"),
                WorkflowStep::new(StepKind::Url, "news.ycombinator.com"),
                WorkflowStep::new(StepKind::Search, "weather lyon"),
                WorkflowStep::new(StepKind::Command, "git pull"),
            ],
        );
        workflows
    }

    #[tokio::test]
    async fn test_runs_every_step_in_order() {
        let mut actions = MockSystemActions::new();
        let mut seq = mockall::Sequence::new();
        actions
            .expect_open_app()
            .withf(|name| name == "code")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ActionResult::done());
        actions
            .expect_open_url()
            .withf(|url| url == "news.ycombinator.com")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ActionResult::failed("no browser"));
        actions
            .expect_web_search()
            .withf(|q| q == "weather lyon")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ActionResult::done());
        actions
            .expect_run_terminal_command()
            .withf(|c| c == "git pull")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ActionResult::ok("Already up to date."));

        let plugin = WorkflowPlugin::new(Arc::new(actions), morning());
        let reply = plugin
            .execute("workflow", &ToolArgs::from(json!({"name": "morning"})))
            .await
            .unwrap();

        assert_eq!(
            reply,
            PluginReply::ok("Workflow \"Morning\" completed. Executed 3 of 4 actions successfully.")
        );
    }

    #[tokio::test]
    async fn test_unknown_step_counts_as_failed() {
        let mut workflows = Workflows::new();
        workflows.insert(
            "odd".to_string(),
            vec![WorkflowStep::new(StepKind::Unknown, "mars")],
        );
        let plugin = WorkflowPlugin::new(Arc::new(MockSystemActions::new()), workflows);

        let reply = plugin
            .execute("workflow", &ToolArgs::strings(["odd"]))
            .await
            .unwrap();
        assert!(reply.message.ends_with("Executed 0 of 1 actions successfully."));
    }

    #[tokio::test]
    async fn test_missing_and_unknown_names() {
        let plugin = WorkflowPlugin::new(Arc::new(MockSystemActions::new()), morning());

        let missing = plugin.execute("workflow", &ToolArgs::default()).await.unwrap();
        assert_eq!(
            missing,
            PluginReply::failed("Please specify a workflow name, sir.")
        );

        let unknown = plugin
            .execute("workflow", &ToolArgs::strings(["evening"]))
            .await
            .unwrap();
        assert_eq!(
            unknown,
            PluginReply::failed("I couldn't find a workflow named \"evening\", sir.")
        );
    }

    #[tokio::test]
    async fn test_list_workflows() {
        let empty = WorkflowPlugin::new(Arc::new(MockSystemActions::new()), Workflows::new());
        let reply = empty.execute("list_workflows", &ToolArgs::default()).await.unwrap();
        assert!(reply.message.starts_with("No workflows are configured"));

        let plugin = WorkflowPlugin::new(Arc::new(MockSystemActions::new()), morning());
        let reply = plugin.execute("list_workflows", &ToolArgs::default()).await.unwrap();
        assert_eq!(reply.message, "Available workflows: Morning");
        assert!(plugin.execute("nope", &ToolArgs::default()).await.is_err());
    }
}
