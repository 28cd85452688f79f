// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for plugin registration and instance lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * WASM module loading
//! * Plugin registration and import validation
//! * Instance creation, state transitions and removal

use std::fmt::{Display, Formatter};

/// WASM module bytes loaded from disk.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use wasp::observability::messages::engine::ModuleLoaded;
///
/// let msg = ModuleLoaded {
///     module_path: "wasm_modules/demo_plugin.wasm",
///     size_bytes: 4096,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ModuleLoaded<'a> {
    pub module_path: &'a str,
    pub size_bytes: usize,
}

impl Display for ModuleLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loaded WASM module: {} ({} bytes)",
            self.module_path, self.size_bytes
        )
    }
}

/// WASM module loading failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use wasp::observability::messages::engine::ModuleLoadFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
/// let msg = ModuleLoadFailed {
///     module_path: "wasm_modules/missing.wasm",
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct ModuleLoadFailed<'a> {
    pub module_path: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ModuleLoadFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to load WASM module '{}': {}",
            self.module_path, self.error
        )
    }
}

/// Plugin compiled, validated and stored.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use wasp::observability::messages::engine::PluginRegistered;
///
/// let msg = PluginRegistered {
///     plugin: "demo",
///     import_count: 3,
///     callback_count: 1,
///     replaced: false,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct PluginRegistered<'a> {
    pub plugin: &'a str,
    pub import_count: usize,
    pub callback_count: usize,
    pub replaced: bool,
}

impl Display for PluginRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Registered plugin '{}': imports={}, callbacks={}",
            self.plugin, self.import_count, self.callback_count
        )?;
        if self.replaced {
            write!(f, " (replaced previous registration)")?;
        }
        Ok(())
    }
}

/// Plugin registration rejected.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use wasp::errors::PluginError;
/// use wasp::observability::messages::engine::PluginRegistrationFailed;
///
/// let error = PluginError::ImportNotFound {
///     name: "call_me".to_string(),
///     namespace: "env".to_string(),
/// };
/// let msg = PluginRegistrationFailed {
///     plugin: "demo",
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct PluginRegistrationFailed<'a> {
    pub plugin: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for PluginRegistrationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to register plugin '{}': {}",
            self.plugin, self.error
        )
    }
}

/// Instance moved to a new lifecycle state.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
///
/// # Example
/// ```
/// use wasp::observability::messages::engine::InstanceStateChanged;
///
/// let msg = InstanceStateChanged {
///     plugin: "demo",
///     state: "Bound",
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct InstanceStateChanged<'a> {
    pub plugin: &'a str,
    pub state: &'a str,
}

impl Display for InstanceStateChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Instance of '{}' is now {}", self.plugin, self.state)
    }
}

/// Instance ready for calls.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use wasp::observability::messages::engine::InstanceCreated;
///
/// let msg = InstanceCreated {
///     plugin: "demo",
///     workspace: Some("/tmp/work"),
///     fuel_per_call: None,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct InstanceCreated<'a> {
    pub plugin: &'a str,
    pub workspace: Option<&'a str>,
    pub fuel_per_call: Option<u64>,
}

impl Display for InstanceCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Created instance of '{}'", self.plugin)?;
        if let Some(workspace) = self.workspace {
            write!(f, ", workspace={}", workspace)?;
        }
        if let Some(fuel) = self.fuel_per_call {
            write!(f, ", fuel_per_call={}", fuel)?;
        }
        Ok(())
    }
}

/// Instance released.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use wasp::observability::messages::engine::InstanceRemoved;
///
/// let msg = InstanceRemoved { plugin: "demo" };
///
/// tracing::info!("{}", msg);
/// ```
pub struct InstanceRemoved<'a> {
    pub plugin: &'a str,
}

impl Display for InstanceRemoved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Removed instance of '{}'", self.plugin)
    }
}

/// Instance poisoned by a guest trap.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use wasp::observability::messages::engine::InstanceFaulted;
///
/// let msg = InstanceFaulted {
///     plugin: "demo",
///     function: "explode",
///     reason: "wasm trap: wasm `unreachable` instruction executed",
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct InstanceFaulted<'a> {
    pub plugin: &'a str,
    pub function: &'a str,
    pub reason: &'a str,
}

impl Display for InstanceFaulted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Instance of '{}' faulted in '{}', further calls are rejected: {}",
            self.plugin, self.function, self.reason
        )
    }
}
