// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! WASI preview 1 context for one instance.

use crate::config::consts::WORKSPACE_GUEST_DIR;
use crate::config::PluginConfig;
use crate::errors::{PluginError, PluginResult};
use std::path::Path;
use wasmtime_wasi::p1::WasiP1Ctx;
use wasmtime_wasi::{DirPerms, FilePerms, WasiCtxBuilder};

/// Builds the guest's system view: environment, volumes and the optional
/// workspace mounted at `/workspace`.
///
/// Nothing from the host process is inherited; the guest sees exactly what the
/// plugin configuration grants.
pub fn build_wasi_ctx(config: &PluginConfig, workspace: Option<&Path>) -> PluginResult<WasiP1Ctx> {
    let mut builder = WasiCtxBuilder::new();

    let mut environment: Vec<_> = config.environment.iter().collect();
    environment.sort();
    for (key, value) in environment {
        builder.env(key, value);
    }

    for (guest_path, host_path) in &config.volumes {
        builder
            .preopened_dir(host_path, guest_path, DirPerms::all(), FilePerms::all())
            .map_err(|e| {
                PluginError::Wasi(format!(
                    "unable to mount volume '{host_path}' at '{guest_path}': {e:#}"
                ))
            })?;
    }

    if let Some(dir) = workspace {
        builder
            .preopened_dir(dir, WORKSPACE_GUEST_DIR, DirPerms::all(), FilePerms::all())
            .map_err(|e| {
                PluginError::Wasi(format!(
                    "unable to mount workspace '{}': {e:#}",
                    dir.display()
                ))
            })?;
    }

    Ok(builder.build_p1())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_builds() {
        assert!(build_wasi_ctx(&PluginConfig::default(), None).is_ok());
    }

    #[test]
    fn test_workspace_and_volume_mount() {
        let workspace = TempDir::new().unwrap();
        let volume = TempDir::new().unwrap();

        let mut config = PluginConfig::default();
        config.environment.insert("MODE".to_string(), "test".to_string());
        config
            .volumes
            .insert("/data".to_string(), volume.path().display().to_string());

        assert!(build_wasi_ctx(&config, Some(workspace.path())).is_ok());
    }

    #[test]
    fn test_missing_workspace_is_wasi_error() {
        let result = build_wasi_ctx(
            &PluginConfig::default(),
            Some(Path::new("/nonexistent/workspace/dir")),
        );
        assert!(matches!(result, Err(PluginError::Wasi(_))));
    }

    #[test]
    fn test_missing_volume_is_wasi_error() {
        let mut config = PluginConfig::default();
        config
            .volumes
            .insert("/data".to_string(), "/nonexistent/volume".to_string());

        let result = build_wasi_ctx(&config, None);
        assert!(matches!(result, Err(PluginError::Wasi(msg)) if msg.contains("/data")));
    }
}
