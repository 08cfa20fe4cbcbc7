// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Settings;

/// Named workflows as stored under `workflows` in settings.json
pub type Workflows = BTreeMap<String, Vec<WorkflowStep>>;

/// One action in a workflow, e.g. `{"type": "app", "value": "code"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    #[serde(rename = "type")]
    pub kind: StepKind,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Launch an application by name
    App,
    Url,
    /// Web search for `value`
    Search,
    /// Shell command
    Command,
    /// Any type this version does not know; fails when run
    #[serde(other)]
    Unknown,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::App => "app",
            StepKind::Url => "url",
            StepKind::Search => "search",
            StepKind::Command => "command",
            StepKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl WorkflowStep {
    pub fn new(kind: StepKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

impl Settings {
    /// Look up a workflow by name, ignoring case and surrounding spaces.
    pub fn find_workflow(&self, name: &str) -> Option<(&str, &[WorkflowStep])> {
        find_workflow(&self.workflows, name)
    }
}

/// Case-insensitive lookup in a workflow table
pub fn find_workflow<'a>(
    workflows: &'a Workflows,
    name: &str,
) -> Option<(&'a str, &'a [WorkflowStep])> {
    let wanted = name.trim().to_lowercase();
    workflows
        .iter()
        .find(|(candidate, _)| candidate.to_lowercase() == wanted)
        .map(|(candidate, steps)| (candidate.as_str(), steps.as_slice()))
}
