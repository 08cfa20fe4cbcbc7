// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Plugins backed by an external program

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::brain::ToolArgs;
use crate::error::{EchoError, Result};

use super::manifest::PluginManifest;
use super::protocol::{Request, Response};
use super::{CommandSpec, Plugin, PluginReply};

/// Global request ID counter for JSON-RPC
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// A plugin whose commands run in a child process
pub struct ExternalPlugin {
    manifest: PluginManifest,
    manifest_path: PathBuf,
}

impl ExternalPlugin {
    pub fn new(manifest: PluginManifest, manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest,
            manifest_path: manifest_path.into(),
        }
    }

    /// Parse the manifest at `path`
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(PluginManifest::from_file(path)?, path))
    }

    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Spawn the program, send one request and read the reply line.
    async fn call(&self, request: Request) -> Result<Response> {
        let (program, args) = self.manifest.program().ok_or_else(|| {
            EchoError::Plugin(format!("Plugin '{}' has an empty command", self.manifest.name))
        })?;

        let mut command = Command::new(&program);
        command
            .args(&args)
            .envs(&self.manifest.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = self.manifest.working_dir() {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            EchoError::Plugin(format!(
                "Failed to start plugin '{}': {}",
                self.manifest.name, e
            ))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            let line = format!("{}\n", request.to_json());
            stdin.write_all(line.as_bytes()).await.map_err(|e| {
                EchoError::Plugin(format!("Failed to write to plugin stdin: {}", e))
            })?;
            // Dropping stdin closes it so line readers see EOF
        }

        let timeout = Duration::from_millis(self.manifest.timeout_ms);
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                EchoError::Plugin(format!(
                    "Plugin '{}' timed out after {:?}",
                    self.manifest.name, timeout
                ))
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("");

        if line.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EchoError::Plugin(format!(
                "Plugin '{}' produced no output (exit code {:?}){}",
                self.manifest.name,
                output.status.code(),
                if stderr.trim().is_empty() {
                    String::new()
                } else {
                    format!(": {}", stderr.trim())
                }
            )));
        }

        Response::parse(line.trim()).map_err(|e| {
            EchoError::Plugin(format!(
                "Failed to parse plugin response: {} (raw: {})",
                e, line
            ))
        })
    }

    fn next_id() -> u64 {
        REQUEST_ID.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for ExternalPlugin {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn version(&self) -> &str {
        self.manifest.version()
    }

    fn description(&self) -> &str {
        self.manifest.description()
    }

    fn commands(&self) -> Vec<CommandSpec> {
        self.manifest.command_specs()
    }

    async fn init(&self) -> Result<()> {
        if !self.manifest.lifecycle {
            return Ok(());
        }
        let response = self.call(Request::init(Self::next_id())).await?;
        if response.is_method_not_found() {
            tracing::debug!("Plugin {} has no init handler", self.manifest.name);
            return Ok(());
        }
        let reply = response.into_reply();
        if reply.success {
            Ok(())
        } else {
            Err(EchoError::Plugin(reply.message))
        }
    }

    async fn execute(&self, command: &str, args: &ToolArgs) -> Result<PluginReply> {
        tracing::debug!("Invoking external plugin {} ({})", self.manifest.name, command);
        let request = Request::execute(command, args.to_value(), Self::next_id());
        let response = self.call(request).await?;
        if response.is_error() {
            tracing::warn!(
                "Plugin {} failed {}: {:?}",
                self.manifest.name,
                command,
                response.error.as_ref().map(|e| e.code)
            );
        }
        Ok(response.into_reply())
    }

    async fn cleanup(&self) -> Result<()> {
        if !self.manifest.lifecycle {
            return Ok(());
        }
        let response = self.call(Request::cleanup(Self::next_id())).await?;
        if response.is_error() && !response.is_method_not_found() {
            let reply = response.into_reply();
            tracing::warn!("Plugin {} cleanup failed: {}", self.manifest.name, reply.message);
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn script_plugin(temp: &TempDir, body: &str, extra: &str) -> ExternalPlugin {
        let script = temp.path().join("plugin.sh");
        std::fs::write(&script, body).unwrap();
        let manifest = format!(
            r#"{{
                "name": "script-plugin",
                "command": ["sh", "{}"],
                "commands": {{"run": {{"description": "Run it"}}}}
                {}
            }}"#,
            script.display(),
            extra
        );
        ExternalPlugin::new(PluginManifest::parse(&manifest).unwrap(), temp.path().join("p.json"))
    }

    #[tokio::test]
    async fn test_execute_reads_last_line() {
        let temp = TempDir::new().unwrap();
        let plugin = script_plugin(
            &temp,
            "read -r line\necho 'starting up'\necho '{\"result\":{\"success\":true,\"message\":\"ran\"}}'\n",
            "",
        );
        let reply = plugin.execute("run", &ToolArgs::default()).await.unwrap();
        assert_eq!(reply, PluginReply::ok("ran"));
    }

    #[tokio::test]
    async fn test_execute_passes_request_on_stdin() {
        let temp = TempDir::new().unwrap();
        let plugin = script_plugin(
            &temp,
            "read -r line\ncase \"$line\" in *'\"city\":\"Oslo\"'*) echo '{\"result\":{\"success\":true,\"message\":\"cold\"}}';; *) echo '{\"error\":{\"code\":-32602,\"message\":\"bad\"}}';; esac\n",
            "",
        );
        let args = ToolArgs::from(json!({"city": "Oslo"}));
        assert_eq!(plugin.execute("run", &args).await.unwrap().message, "cold");

        let other = ToolArgs::from(json!({"city": "Rome"}));
        assert_eq!(
            plugin.execute("run", &other).await.unwrap(),
            PluginReply::failed("bad")
        );
    }

    #[tokio::test]
    async fn test_execute_times_out() {
        let temp = TempDir::new().unwrap();
        let plugin = script_plugin(&temp, "sleep 5\n", r#", "timeout_ms": 200"#);
        let err = plugin.execute("run", &ToolArgs::default()).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_no_output_is_error() {
        let temp = TempDir::new().unwrap();
        let plugin = script_plugin(&temp, "read -r line\nexit 3\n", "");
        let err = plugin.execute("run", &ToolArgs::default()).await.unwrap_err();
        assert!(err.to_string().contains("no output"));
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let manifest = PluginManifest::parse(
            r#"{"name": "ghost", "command": ["/nonexistent/echo-plugin"], "commands": {"x": {}}}"#,
        )
        .unwrap();
        let plugin = ExternalPlugin::new(manifest, "ghost.json");
        assert!(plugin.execute("x", &ToolArgs::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_lifecycle_init() {
        let temp = TempDir::new().unwrap();
        let plugin = script_plugin(
            &temp,
            "read -r line\ncase \"$line\" in *'\"method\":\"init\"'*) echo '{\"result\":{\"success\":false,\"message\":\"no config\"}}';; *) echo '{\"result\":{}}';; esac\n",
            r#", "lifecycle": true"#,
        );
        let err = plugin.init().await.unwrap_err();
        assert!(err.to_string().contains("no config"));
        plugin.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_lifecycle_method_not_found_is_accepted() {
        let temp = TempDir::new().unwrap();
        let plugin = script_plugin(
            &temp,
            "read -r line\necho '{\"error\":{\"code\":-32601,\"message\":\"Method not found\"}}'\n",
            r#", "lifecycle": true"#,
        );
        plugin.init().await.unwrap();
        plugin.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_init_without_lifecycle_does_not_spawn() {
        let manifest = PluginManifest::parse(
            r#"{"name": "ghost", "command": ["/nonexistent/echo-plugin"], "commands": {"x": {}}}"#,
        )
        .unwrap();
        let plugin = ExternalPlugin::new(manifest, "ghost.json");
        plugin.init().await.unwrap();
        plugin.cleanup().await.unwrap();
    }
}
