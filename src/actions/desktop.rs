// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! [`SystemActions`] backed by the local desktop

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use reqwest::Url;
use sysinfo::System;
use tokio::process::Command;

use super::platform::{self, Invocation};
use super::{shell, truncate_chars, ActionResult, SystemActions};

const MAX_READ_CHARS: usize = 4000;
const DEFAULT_SHELL_TIMEOUT: Duration = Duration::from_secs(60);
const SEARCH_URL: &str = "https://www.google.com/search";

/// Actions against the real machine
#[derive(Debug, Clone)]
pub struct DesktopActions {
    base_dir: PathBuf,
    screenshot_dir: PathBuf,
    shell_timeout: Duration,
}

impl Default for DesktopActions {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopActions {
    pub fn new() -> Self {
        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let screenshot_dir = dirs::home_dir().unwrap_or_else(|| base_dir.clone());
        Self {
            base_dir,
            screenshot_dir,
            shell_timeout: DEFAULT_SHELL_TIMEOUT,
        }
    }

    /// Resolve relative paths and run commands from `dir`
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = dir.into();
        self
    }

    pub fn with_shell_timeout(mut self, limit: Duration) -> Self {
        self.shell_timeout = limit;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let expanded = crate::plugins::manifest::expand_tilde(path.trim());
        if expanded.is_absolute() {
            expanded
        } else {
            self.base_dir.join(expanded)
        }
    }

    /// Fire a launcher. With `wait` the exit status and stderr decide the
    /// result; otherwise only whether it started.
    async fn launch(&self, (program, args): Invocation, wait: bool) -> ActionResult {
        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .current_dir(&self.base_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null());

        if !wait {
            // Nobody reads a detached child's stderr
            cmd.stderr(Stdio::null());
            return match cmd.spawn() {
                Ok(_) => ActionResult::done(),
                Err(e) => ActionResult::failed(format!("Failed to launch {}: {}", program, e)),
            };
        }

        let child = match cmd.stderr(Stdio::piped()).kill_on_drop(true).spawn() {
            Ok(child) => child,
            Err(e) => return ActionResult::failed(format!("Failed to launch {}: {}", program, e)),
        };
        match tokio::time::timeout(self.shell_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => ActionResult::done(),
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                ActionResult::failed(format!("{} failed: {}", program, stderr.trim()))
            }
            Ok(Err(e)) => ActionResult::failed(format!("{} failed: {}", program, e)),
            Err(_) => ActionResult::failed(format!("{} timed out", program)),
        }
    }
}

/// `example.com` -> `https://example.com`
fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn search_url(query: &str) -> std::result::Result<Url, String> {
    Url::parse_with_params(SEARCH_URL, &[("q", query.trim())]).map_err(|e| e.to_string())
}

fn system_summary() -> String {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_cpu_all();

    let gib = |bytes: u64| bytes as f64 / 1024.0 / 1024.0 / 1024.0;
    let cpu = sys
        .cpus()
        .first()
        .map(|c| c.brand().trim().to_string())
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| "Unknown CPU".to_string());

    format!(
        "OS: {} {}\nHost: {}\nCPU: {} ({} cores)\nMemory: {:.2} GB used of {:.2} GB\nUptime: {} minutes",
        System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
        System::os_version().unwrap_or_default(),
        System::host_name().unwrap_or_else(|| "unknown".to_string()),
        cpu,
        sys.cpus().len(),
        gib(sys.used_memory()),
        gib(sys.total_memory()),
        System::uptime() / 60,
    )
}

#[async_trait]
impl SystemActions for DesktopActions {
    async fn create_folder(&self, path: &str) -> ActionResult {
        let target = self.resolve(path);
        tokio::fs::create_dir_all(&target)
            .await
            .map(|_| ActionResult::ok(format!("Created folder {}", target.display())))
            .into()
    }

    async fn write_file(&self, path: &str, content: &str) -> ActionResult {
        if path.trim().is_empty() {
            return ActionResult::failed("No file path given");
        }
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return ActionResult::failed(e.to_string());
            }
        }
        tokio::fs::write(&target, content)
            .await
            .map(|_| ActionResult::ok(format!("Wrote {}", target.display())))
            .into()
    }

    async fn read_file(&self, path: &str) -> ActionResult {
        if path.trim().is_empty() {
            return ActionResult::failed("No file path given");
        }
        tokio::fs::read_to_string(self.resolve(path))
            .await
            .map(|content| ActionResult::ok(truncate_chars(&content, MAX_READ_CHARS)))
            .into()
    }

    async fn run_terminal_command(&self, command: &str) -> ActionResult {
        shell::run(command, &self.base_dir, self.shell_timeout).await
    }

    async fn type_text(&self, text: &str) -> ActionResult {
        if text.is_empty() {
            return ActionResult::failed("Nothing to type");
        }
        self.launch(platform::type_text(text), true).await
    }

    async fn press_key(&self, key: &str) -> ActionResult {
        if key.trim().is_empty() {
            return ActionResult::failed("No key given");
        }
        self.launch(platform::press_key(key), true).await
    }

    async fn web_search(&self, query: &str) -> ActionResult {
        let url = match search_url(query) {
            Ok(url) => url,
            Err(e) => return ActionResult::failed(e),
        };
        tracing::info!("Web search: {}", query);
        self.launch(platform::open_target(url.as_str()), false).await
    }

    async fn open_url(&self, url: &str) -> ActionResult {
        let url = normalize_url(url);
        if let Err(e) = Url::parse(&url) {
            return ActionResult::failed(format!("Invalid URL '{}': {}", url, e));
        }
        self.launch(platform::open_target(&url), false).await
    }

    async fn take_screenshot(&self) -> ActionResult {
        let name = format!(
            "echo-screenshot-{}.png",
            Local::now().format("%Y%m%d-%H%M%S")
        );
        let path = self.screenshot_dir.join(name);
        let result = self.launch(platform::screenshot(&path), true).await;
        if result.success {
            ActionResult::ok(path.display().to_string())
        } else {
            result
        }
    }

    async fn get_system_info(&self) -> ActionResult {
        match tokio::task::spawn_blocking(system_summary).await {
            Ok(summary) => ActionResult::ok(summary),
            Err(e) => ActionResult::failed(e.to_string()),
        }
    }

    async fn get_datetime(&self) -> ActionResult {
        ActionResult::ok(
            Local::now()
                .format("%A, %B %-d, %Y at %H:%M:%S")
                .to_string(),
        )
    }

    async fn list_files(&self, dir: &str) -> ActionResult {
        let dir = if dir.trim().is_empty() { "." } else { dir };
        let target = self.resolve(dir);
        let mut entries = match tokio::fs::read_dir(&target).await {
            Ok(entries) => entries,
            Err(e) => return ActionResult::failed(format!("{}: {}", target.display(), e)),
        };

        let mut names = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let mut name = entry.file_name().to_string_lossy().into_owned();
                    if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                        name.push('/');
                    }
                    names.push(name);
                }
                Ok(None) => break,
                Err(e) => return ActionResult::failed(e.to_string()),
            }
        }
        names.sort();

        if names.is_empty() {
            ActionResult::ok("The directory is empty.")
        } else {
            ActionResult::ok(truncate_chars(&names.join("\n"), MAX_READ_CHARS))
        }
    }

    async fn copy_file(&self, from: &str, to: &str) -> ActionResult {
        if from.trim().is_empty() || to.trim().is_empty() {
            return ActionResult::failed("Copy needs a source and a destination");
        }
        let source = self.resolve(from);
        let mut dest = self.resolve(to);
        if dest.is_dir() {
            match source.file_name() {
                Some(name) => dest.push(name),
                None => return ActionResult::failed("Source has no file name"),
            }
        }
        tokio::fs::copy(&source, &dest)
            .await
            .map(|_| {
                ActionResult::ok(format!(
                    "Copied {} to {}",
                    source.display(),
                    dest.display()
                ))
            })
            .into()
    }

    async fn delete_file(&self, path: &str) -> ActionResult {
        if path.trim().is_empty() {
            return ActionResult::failed("No path given");
        }
        let target = self.resolve(path);
        let metadata = match tokio::fs::metadata(&target).await {
            Ok(metadata) => metadata,
            Err(e) => return ActionResult::failed(format!("{}: {}", target.display(), e)),
        };
        let removed = if metadata.is_dir() {
            // remove_dir refuses non-empty directories
            tokio::fs::remove_dir(&target).await
        } else {
            tokio::fs::remove_file(&target).await
        };
        removed
            .map(|_| ActionResult::ok(format!("Deleted {}", target.display())))
            .into()
    }

    async fn open_app(&self, name: &str) -> ActionResult {
        let name = name.trim();
        if name.is_empty() {
            return ActionResult::failed("No application given");
        }
        if let Err(e) = platform::check_app_name(name) {
            tracing::warn!("Refusing to open application: {}", e);
            return ActionResult::failed(e);
        }
        tracing::info!("Opening application: {}", name);
        self.launch(platform::open_app(name), false).await
    }
}
