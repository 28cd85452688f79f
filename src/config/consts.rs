// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Minimum allowed per-call fuel budget (1 million instructions)
pub const MIN_FUEL_LEVEL: u64 = 1_000_000;
/// Maximum allowed per-call fuel budget (500 million instructions) - security limit
pub const MAX_FUEL_LEVEL: u64 = 500_000_000;

/// Largest module file accepted by default (16 MiB)
pub const MAX_MODULE_SIZE: usize = 16 * 1024 * 1024;

/// Guest path the per-instance workspace directory is mounted at
pub const WORKSPACE_GUEST_DIR: &str = "/workspace";

// ABI exports every plugin provides
pub const MEMORY_EXPORT: &str = "memory";
pub const ALLOCATE_EXPORT: &str = "allocate";
pub const DEALLOCATE_EXPORT: &str = "deallocate";
pub const GET_STRING_SIZE_EXPORT: &str = "get_string_size";

// Default imports provided by the host
pub const ENV_NAMESPACE: &str = "env";
pub const ABORT_IMPORT: &str = "abort";
pub const RAISE_ERROR_IMPORT: &str = "raise_error";
pub const FD_WRITE_IMPORT: &str = "fd_write";

/// Import namespaces reserved for the system shim
pub const WASI_NAMESPACE_PREFIX: &str = "wasi";
pub const WASI_UNSTABLE: &str = "wasi_unstable";
pub const WASI_SNAPSHOT_PREVIEW1: &str = "wasi_snapshot_preview1";
