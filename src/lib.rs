// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Echo - desktop assistant driven by an LLM brain and plugins.
//!
//! This crate exposes the runtime used by the `echo-agent` CLI
//! (`src/main.rs`). A line of user input flows through:
//!
//! - `brain`: one vendor provider plus the merged tool list turns the text
//!   into a canonical outcome (speech, system action, or plugin command)
//! - `router`: performs the side effect and produces the reply text
//! - `actions`: the desktop operations behind system actions
//! - `plugins`: built-in and external JSON-RPC plugins
//! - `llm`: provider abstraction and the Gemini/OpenAI/Anthropic/DeepSeek adapters
//! - `memory`: bounded, encrypted conversation history
//! - `config`: settings persisted as JSON under `~/.echo`
//!
//! [`assistant::Assistant`] ties these together.

pub mod actions;
pub mod assistant;
pub mod brain;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod plugins;
pub mod router;

pub use error::{EchoError, Result};
