// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for calls across the host/guest boundary.
//!
//! This module contains message types for logging events related to:
//! * Exported function calls made by the host
//! * Callback invocations made by the guest
//! * Guest output and guest-reported errors
//! * Cleanup of guest memory

use std::fmt::{Display, Formatter};

/// Exported function call started.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
///
/// # Example
/// ```
/// use wasp::observability::messages::call::CallStarted;
///
/// let msg = CallStarted {
///     plugin: "demo",
///     function: "hello",
///     input_count: 1,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct CallStarted<'a> {
    pub plugin: &'a str,
    pub function: &'a str,
    pub input_count: usize,
}

impl Display for CallStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Calling '{}' on plugin '{}' with {} inputs",
            self.function, self.plugin, self.input_count
        )
    }
}

/// Exported function call completed.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
///
/// # Example
/// ```
/// use wasp::observability::messages::call::CallCompleted;
///
/// let msg = CallCompleted {
///     plugin: "demo",
///     function: "hello",
///     output_kind: "String",
///     fuel_consumed: Some(1234),
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct CallCompleted<'a> {
    pub plugin: &'a str,
    pub function: &'a str,
    pub output_kind: &'a str,
    pub fuel_consumed: Option<u64>,
}

impl Display for CallCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Call to '{}' on plugin '{}' returned {}",
            self.function, self.plugin, self.output_kind
        )?;
        if let Some(fuel) = self.fuel_consumed {
            write!(f, ", fuel_consumed={}", fuel)?;
        }
        Ok(())
    }
}

/// Exported function call failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use wasp::errors::PluginError;
/// use wasp::observability::messages::call::CallFailed;
///
/// let error = PluginError::FunctionNotFound("missing".to_string());
/// let msg = CallFailed {
///     plugin: "demo",
///     function: "missing",
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct CallFailed<'a> {
    pub plugin: &'a str,
    pub function: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for CallFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Call to '{}' on plugin '{}' failed: {}",
            self.function, self.plugin, self.error
        )
    }
}

/// Guest invoked a host callback.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
///
/// # Example
/// ```
/// use wasp::observability::messages::call::CallbackInvoked;
///
/// let msg = CallbackInvoked {
///     plugin: "demo",
///     namespace: "env",
///     name: "call_me",
///     depth: 1,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct CallbackInvoked<'a> {
    pub plugin: &'a str,
    pub namespace: &'a str,
    pub name: &'a str,
    pub depth: usize,
}

impl Display for CallbackInvoked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Plugin '{}' invoked callback {}.{} (call depth {})",
            self.plugin, self.namespace, self.name, self.depth
        )
    }
}

/// Text the guest wrote to stdout.
///
/// # Log Level
/// `info!` - Guest output
///
/// # Example
/// ```
/// use wasp::observability::messages::call::GuestStdout;
///
/// let msg = GuestStdout { plugin: "demo", text: "hello from the guest" };
///
/// tracing::info!("{}", msg);
/// ```
pub struct GuestStdout<'a> {
    pub plugin: &'a str,
    pub text: &'a str,
}

impl Display for GuestStdout<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] {}", self.plugin, self.text.trim_end())
    }
}

/// Text the guest wrote to stderr.
///
/// # Log Level
/// `error!` - Guest error output
///
/// # Example
/// ```
/// use wasp::observability::messages::call::GuestStderr;
///
/// let msg = GuestStderr { plugin: "demo", text: "something went wrong" };
///
/// tracing::error!("{}", msg);
/// ```
pub struct GuestStderr<'a> {
    pub plugin: &'a str,
    pub text: &'a str,
}

impl Display for GuestStderr<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[{}] {}", self.plugin, self.text.trim_end())
    }
}

/// Guest reported an application error via `raise_error`.
///
/// # Log Level
/// `warn!` - Guest-reported failure
///
/// # Example
/// ```
/// use wasp::observability::messages::call::GuestRaisedError;
///
/// let msg = GuestRaisedError { plugin: "demo", message: "invalid input" };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct GuestRaisedError<'a> {
    pub plugin: &'a str,
    pub message: &'a str,
}

impl Display for GuestRaisedError<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Plugin '{}' raised error: {}", self.plugin, self.message)
    }
}

/// Guest memory could not be released during cleanup.
///
/// # Log Level
/// `warn!` - Potential leak, the call result is unaffected
///
/// # Example
/// ```
/// use wasp::errors::PluginError;
/// use wasp::observability::messages::call::DeallocationFailed;
///
/// let error = PluginError::MissingExport("deallocate".to_string());
/// let msg = DeallocationFailed {
///     plugin: "demo",
///     addr: 1024,
///     size: 12,
///     error: &error,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct DeallocationFailed<'a> {
    pub plugin: &'a str,
    pub addr: i32,
    pub size: i32,
    pub error: &'a dyn std::error::Error,
}

impl Display for DeallocationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Potential leak in plugin '{}': unable to deallocate {} bytes at {}: {}",
            self.plugin, self.size, self.addr, self.error
        )
    }
}
