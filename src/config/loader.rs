// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::callbacks::Callbacks;
use crate::config::consts::{MAX_FUEL_LEVEL, MAX_MODULE_SIZE, MIN_FUEL_LEVEL};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Host configuration: engine settings plus the plugins to register.
///
/// # Example
/// ```yaml
/// engine:
///   fuel: 100000000
///   max_module_size: 8388608
/// plugins:
///   - name: demo
///     module: wasm_modules/demo_plugin.wasm
///     environment:
///       GREETING: hello
///     volumes:
///       /data: /var/lib/demo
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

/// Engine-wide settings.
///
/// # Fields
/// * `fuel` - Per-call fuel budget. When set, the VM meters instructions and
///   every exported call starts with this much fuel (clamped to the security bounds)
/// * `max_module_size` - Largest module file accepted at registration (defaults to 16 MiB)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EngineConfig {
    pub fuel: Option<u64>,
    pub max_module_size: Option<usize>,
}

impl EngineConfig {
    /// Fuel budget for one exported call, clamped to `[MIN_FUEL_LEVEL, MAX_FUEL_LEVEL]`.
    ///
    /// # Example
    /// ```
    /// use wasp::config::EngineConfig;
    ///
    /// let config = EngineConfig { fuel: Some(1_000_000_000), max_module_size: None };
    /// assert_eq!(config.fuel_per_call(), Some(500_000_000));
    /// ```
    pub fn fuel_per_call(&self) -> Option<u64> {
        self.fuel
            .map(|requested| requested.clamp(MIN_FUEL_LEVEL, MAX_FUEL_LEVEL))
    }

    pub fn max_module_size(&self) -> usize {
        self.max_module_size.unwrap_or(MAX_MODULE_SIZE)
    }
}

/// One plugin in a host configuration file.
#[derive(Debug, Deserialize)]
pub struct PluginEntry {
    pub name: String,
    pub module: String,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    #[serde(default)]
    pub volumes: HashMap<String, String>,
}

impl PluginEntry {
    /// Plugin configuration for this entry, without callbacks.
    pub fn plugin_config(&self) -> PluginConfig {
        PluginConfig {
            environment: self.environment.clone(),
            volumes: self.volumes.clone(),
            callbacks: Callbacks::default(),
        }
    }
}

/// Per-plugin configuration handed to `register_plugin`.
///
/// # Fields
/// * `environment` - Environment variables visible to the guest
/// * `volumes` - Extra directories preopened for the guest, guest path to host path
/// * `callbacks` - Host functions the plugin's imports bind to
#[derive(Debug, Default, Clone)]
pub struct PluginConfig {
    pub environment: HashMap<String, String>,
    pub volumes: HashMap<String, String>,
    pub callbacks: Callbacks,
}

impl PluginConfig {
    pub fn with_callbacks(callbacks: Callbacks) -> Self {
        Self {
            callbacks,
            ..Self::default()
        }
    }
}

/// Load a host config from a `.yaml`, `.yml` or `.toml` file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<HostConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
        Some("toml") => Ok(toml::from_str(&content)?),
        _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
    }
}
