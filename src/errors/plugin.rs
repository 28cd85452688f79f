// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types for plugin registration, instantiation and cross-boundary calls.
//!
//! Every failure in the engine is reported as a [`PluginError`] carrying enough
//! context (function, import, namespace or address) to diagnose it. Nothing is
//! retried; the only failures that are swallowed are `deallocate` errors during
//! a cleanup sweep, which are logged as leak warnings instead.

use crate::abi::ValueKind;
use thiserror::Error;

/// Error type for all plugin engine operations.
#[derive(Error, Debug)]
pub enum PluginError {
    /// The module file could not be read.
    #[error("Unable to read WASM module '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The module file exceeds the configured size limit.
    #[error("WASM module '{path}' too large: {size} bytes (max: {max} bytes)")]
    ModuleTooLarge { path: String, size: usize, max: usize },

    /// Malformed or unsupported guest bytecode.
    #[error("Unable to compile WASM module '{path}': {reason}")]
    Compilation { path: String, reason: String },

    /// The module declares an import that no callback or default import satisfies.
    #[error("Import '{name}' in namespace '{namespace}' not found, register a callback for it")]
    ImportNotFound { name: String, namespace: String },

    /// A registered callback does not match the type the module declares for the import.
    #[error("Import '{namespace}.{name}' expects {expected}, callback provides {actual}")]
    ImportSignature {
        namespace: String,
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Plugin '{0}' is not registered")]
    PluginNotFound(String),

    #[error("Function '{0}' is not exported by the WASM module")]
    FunctionNotFound(String),

    /// The export exists but its signature does not fit the call.
    #[error("Function '{function}' cannot be called this way: {reason}")]
    ExportSignature { function: String, reason: String },

    #[error("Instance has been removed")]
    InstanceRemoved,

    /// An earlier guest trap left the instance in an unknown state.
    #[error("Instance is unusable after a guest trap: {0}")]
    InstanceFaulted(String),

    /// The VM refused to instantiate the module against the bound imports.
    #[error("Unable to instantiate plugin '{plugin}': {reason}")]
    Instantiation { plugin: String, reason: String },

    /// The workspace, a volume or the environment could not be mounted.
    #[error("Unable to set up WASI context: {0}")]
    Wasi(String),

    /// VM configuration or store setup failed.
    #[error("Engine error: {0}")]
    Engine(String),

    /// A required ABI export is missing.
    #[error("Export '{0}' not found, ensure the WASM module implements the default ABI")]
    MissingExport(String),

    /// A required ABI export exists with the wrong signature.
    #[error("Export '{name}' has the wrong signature, expected {expected}")]
    AbiSignature { name: String, expected: String },

    /// The guest trapped while executing `function`.
    #[error("Guest trapped in '{function}': {message}")]
    GuestTrap { function: String, message: String },

    /// A guest-supplied address and length fall outside linear memory.
    #[error("Memory access out of bounds: addr={addr} len={len} memory_size={memory_size}")]
    OutOfBounds {
        addr: u32,
        len: usize,
        memory_size: usize,
    },

    /// A guest string is not valid UTF-8; its bytes are never substituted.
    #[error("String at addr={addr} is not valid UTF-8: {source}")]
    InvalidString {
        addr: u32,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// The guest could not provide memory for a host value.
    #[error("Unable to allocate {size} bytes in guest memory")]
    Allocation {
        size: usize,
        #[source]
        source: Box<PluginError>,
    },

    /// Callback parameters and results are limited to `Int32` and `String`.
    #[error("Callback '{namespace}.{name}' uses unsupported {kind} at position {position}, only Int32 and String are allowed")]
    UnsupportedCallbackType {
        namespace: String,
        name: String,
        position: usize,
        kind: ValueKind,
    },

    /// Result count mismatch: the callback declares a different count than the
    /// import expects, or the host function returned a different count than declared.
    #[error("Callback '{namespace}.{name}' produces {actual} results, expected {expected}")]
    CallbackArity {
        namespace: String,
        name: String,
        expected: usize,
        actual: usize,
    },

    /// The host function produced a value of a different kind than declared.
    #[error("Callback '{namespace}.{name}' returned {actual} at position {position}, expected {expected}")]
    CallbackResultType {
        namespace: String,
        name: String,
        position: usize,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// The host function itself failed.
    #[error("Callback '{namespace}.{name}' failed: {source}")]
    CallbackFailed {
        namespace: String,
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unsupported output kind {0}, only Int32, String and Bytes can be returned")]
    UnsupportedOutputKind(ValueKind),

    /// The guest reported an application-level failure via `raise_error`.
    #[error("Guest raised error: {0}")]
    GuestRaised(String),
}

impl PluginError {
    /// Recovers a `PluginError` from an error that crossed the guest boundary.
    ///
    /// Host functions hand errors to wasmtime as `anyhow::Error`; when they
    /// unwind out of `Func::call` the original value is still inside, possibly
    /// wrapped in backtrace context. Anything else is a guest trap.
    pub(crate) fn from_call(function: &str, error: wasmtime::Error) -> Self {
        match error.downcast::<PluginError>() {
            Ok(host) => host,
            Err(error) => PluginError::GuestTrap {
                function: function.to_string(),
                message: format!("{error:#}"),
            },
        }
    }

    /// True when the guest trapped somewhere underneath this error, including
    /// inside an ABI export called while marshaling a value.
    pub fn is_guest_trap(&self) -> bool {
        match self {
            PluginError::GuestTrap { .. } => true,
            PluginError::Allocation { source, .. } => source.is_guest_trap(),
            _ => false,
        }
    }
}

/// Result type alias for plugin engine operations.
pub type PluginResult<T> = Result<T, PluginError>;
