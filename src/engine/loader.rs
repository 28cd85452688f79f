// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! WASM file loading and binary format checks
//!
//! Reads module bytes from disk with a size limit and makes sure they hold a
//! core module. Component-model binaries are rejected: the calling convention
//! here is defined over core linear memory only.

use crate::errors::{PluginError, PluginResult};
use crate::observability::messages::engine::{ModuleLoadFailed, ModuleLoaded};
use std::path::Path;
use wasmparser::{Encoding, Parser, Payload};

/// Loads WASM bytes from a file and validates the size
///
/// # Arguments
/// * `path` - Path to the WASM file to load
/// * `max_size` - Largest accepted file size in bytes
///
/// # Returns
/// * `Ok(Vec<u8>)` - The WASM binary bytes
/// * `Err(PluginError)` - If the file cannot be read or exceeds `max_size`
pub fn load_wasm_bytes<P: AsRef<Path>>(path: P, max_size: usize) -> PluginResult<Vec<u8>> {
    let path = path.as_ref();
    let module_path = path.display().to_string();

    let bytes = std::fs::read(path).map_err(|source| {
        let error = PluginError::Io {
            path: module_path.clone(),
            source,
        };
        tracing::error!(
            "{}",
            ModuleLoadFailed {
                module_path: &module_path,
                error: &error,
            }
        );
        error
    })?;

    if bytes.len() > max_size {
        let error = PluginError::ModuleTooLarge {
            path: module_path.clone(),
            size: bytes.len(),
            max: max_size,
        };
        tracing::error!(
            "{}",
            ModuleLoadFailed {
                module_path: &module_path,
                error: &error,
            }
        );
        return Err(error);
    }

    tracing::info!(
        "{}",
        ModuleLoaded {
            module_path: &module_path,
            size_bytes: bytes.len(),
        }
    );

    Ok(bytes)
}

/// Checks the version header and rejects anything that is not a core module.
///
/// Only the header is inspected; full validation happens when the VM compiles
/// the bytes.
pub fn ensure_core_module(module_path: &str, bytes: &[u8]) -> PluginResult<()> {
    let compilation = |reason: String| PluginError::Compilation {
        path: module_path.to_string(),
        reason,
    };

    let first = Parser::new(0)
        .parse_all(bytes)
        .next()
        .ok_or_else(|| compilation("empty WASM binary".to_string()))?;

    match first.map_err(|e| compilation(e.to_string()))? {
        Payload::Version {
            encoding: Encoding::Module,
            ..
        } => Ok(()),
        Payload::Version {
            encoding: Encoding::Component,
            ..
        } => Err(compilation(
            "component-model binaries are not supported, build a core module".to_string(),
        )),
        _ => Err(compilation("missing WASM version header".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::consts::MAX_MODULE_SIZE;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_small_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let test_data = b"test wasm data";
        temp_file.write_all(test_data).unwrap();

        let result = load_wasm_bytes(temp_file.path(), MAX_MODULE_SIZE);
        assert_eq!(result.unwrap(), test_data);
    }

    #[test]
    fn test_file_too_large() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&[0u8; 65]).unwrap();

        match load_wasm_bytes(temp_file.path(), 64) {
            Err(PluginError::ModuleTooLarge { size, max, .. }) => {
                assert_eq!(size, 65);
                assert_eq!(max, 64);
            }
            other => panic!("Expected ModuleTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_max_size_boundary() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&[0u8; 64]).unwrap();

        let result = load_wasm_bytes(temp_file.path(), 64);
        assert_eq!(result.unwrap().len(), 64);
    }

    #[test]
    fn test_nonexistent_file() {
        let result = load_wasm_bytes("/nonexistent/path/to/file.wasm", MAX_MODULE_SIZE);
        assert!(matches!(result, Err(PluginError::Io { .. })));
    }

    #[test]
    fn test_core_module_is_accepted() {
        let bytes = wat::parse_str("(module)").unwrap();
        assert!(ensure_core_module("test.wasm", &bytes).is_ok());
    }

    #[test]
    fn test_component_is_rejected() {
        let bytes = wat::parse_str("(component)").unwrap();
        match ensure_core_module("test.wasm", &bytes) {
            Err(PluginError::Compilation { reason, .. }) => assert!(reason.contains("component")),
            other => panic!("Expected Compilation error, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_is_rejected() {
        let result = ensure_core_module("test.wasm", b"\x00\x00\x00\x00\x00\x00\x00\x00");
        assert!(matches!(result, Err(PluginError::Compilation { .. })));

        let result = ensure_core_module("test.wasm", &[]);
        assert!(matches!(result, Err(PluginError::Compilation { .. })));
    }
}
