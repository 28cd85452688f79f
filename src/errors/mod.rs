// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod plugin;

pub use config::ConfigError;
pub use plugin::{PluginError, PluginResult};
