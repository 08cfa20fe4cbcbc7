// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM module for Echo
//!
//! Provides abstraction over the supported brain vendors.

pub mod factory;
pub mod message;
pub mod mock_provider;
pub mod provider;
pub mod providers;
pub mod stream;

pub use factory::{ProviderFactory, ProviderKind};
pub use message::*;
pub use provider::*;
