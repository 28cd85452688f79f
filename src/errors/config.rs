// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors that can occur while loading a host configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Only `.yaml`, `.yml` and `.toml` files are understood.
    #[error("Unsupported config format '{0}'")]
    UnsupportedFormat(String),
}
