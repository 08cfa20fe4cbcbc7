// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! `system-control-plugin`: host monitoring via sysinfo

use async_trait::async_trait;
use sysinfo::System;

use crate::brain::ToolArgs;
use crate::error::{EchoError, Result};
use crate::plugins::{CommandSpec, Plugin, PluginReply};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

pub struct SystemControlPlugin;

#[async_trait]
impl Plugin for SystemControlPlugin {
    fn name(&self) -> &str {
        "system-control-plugin"
    }

    fn version(&self) -> &str {
        "1.2.0"
    }

    fn description(&self) -> &str {
        "Advanced system monitoring and control plugin."
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("uptime", "Show how long the system has been running"),
            CommandSpec::new("memory", "Show memory usage statistics"),
            CommandSpec::new("cpu", "Show processor information"),
            CommandSpec::new("osinfo", "Show operating system details"),
        ]
    }

    async fn init(&self) -> Result<()> {
        tracing::debug!("System control plugin ready");
        Ok(())
    }

    async fn execute(&self, command: &str, _args: &ToolArgs) -> Result<PluginReply> {
        let message = match command {
            "uptime" => format_uptime(System::uptime()),
            "memory" => {
                let mut sys = System::new();
                sys.refresh_memory();
                format!(
                    "Memory Usage: {:.2} GB used of {:.2} GB total.",
                    sys.used_memory() as f64 / BYTES_PER_GB,
                    sys.total_memory() as f64 / BYTES_PER_GB
                )
            }
            "cpu" => {
                let sys = System::new_all();
                let model = sys
                    .cpus()
                    .first()
                    .map(|c| c.brand().trim().to_string())
                    .filter(|b| !b.is_empty())
                    .unwrap_or_else(|| "Unknown CPU".to_string());
                format!("CPU Info: {} ({} cores)", model, sys.cpus().len())
            }
            "osinfo" => format!(
                "Operating System: {} {} ({})",
                System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
                System::kernel_version()
                    .or_else(System::os_version)
                    .unwrap_or_default(),
                std::env::consts::ARCH
            ),
            other => {
                return Err(EchoError::Plugin(format!(
                    "Unknown command '{}' for system-control-plugin",
                    other
                )))
            }
        };
        Ok(PluginReply::ok(message))
    }
}

/// `System uptime: 2 days, 3 hours, 4 minutes.` with zero units dropped
pub(crate) fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let minutes = (seconds % 3600) / 60;

    let mut message = String::from("System uptime: ");
    if days > 0 {
        message.push_str(&format!("{} days, ", days));
    }
    if hours > 0 {
        message.push_str(&format!("{} hours, ", hours));
    }
    message.push_str(&format!("{} minutes.", minutes));
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(59), "System uptime: 0 minutes.");
        assert_eq!(format_uptime(3 * 3600 + 120), "System uptime: 3 hours, 2 minutes.");
        assert_eq!(
            format_uptime(2 * 86_400 + 3600 + 60 * 4),
            "System uptime: 2 days, 1 hours, 4 minutes."
        );
        assert_eq!(format_uptime(86_400), "System uptime: 1 days, 0 minutes.");
    }

    #[tokio::test]
    async fn test_commands_report() {
        let plugin = SystemControlPlugin;
        let args = ToolArgs::default();

        let memory = plugin.execute("memory", &args).await.unwrap();
        assert!(memory.success);
        assert!(memory.message.starts_with("Memory Usage:"));

        let cpu = plugin.execute("cpu", &args).await.unwrap();
        assert!(cpu.message.starts_with("CPU Info:"));

        let os = plugin.execute("osinfo", &args).await.unwrap();
        assert!(os.message.contains(std::env::consts::ARCH));

        let uptime = plugin.execute("uptime", &args).await.unwrap();
        assert!(uptime.message.starts_with("System uptime:"));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        assert!(SystemControlPlugin
            .execute("reboot", &ToolArgs::default())
            .await
            .is_err());
    }
}
