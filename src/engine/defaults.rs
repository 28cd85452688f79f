// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Imports every instance gets without registering a callback.
//!
//! ```text
//! env.abort(i32, i32, i32, i32)
//! env.raise_error(addr: i32)
//! wasi_unstable.fd_write / wasi_snapshot_preview1.fd_write
//! ```
//!
//! These are defined before any user callback, so a callback registered under
//! the same name replaces the default.

use crate::abi::{codec, GuestMemory};
use crate::config::consts::{
    ABORT_IMPORT, ENV_NAMESPACE, FD_WRITE_IMPORT, RAISE_ERROR_IMPORT, WASI_SNAPSHOT_PREVIEW1,
    WASI_UNSTABLE,
};
use crate::errors::{PluginError, PluginResult};
use crate::instance::{capture_exports, GuestContext, InstanceState};
use crate::observability::messages::call::{GuestRaisedError, GuestStderr, GuestStdout};
use wasmtime::{AsContextMut, Caller, Linker};

const STDOUT: i32 = 1;
const STDERR: i32 = 2;
const ERRNO_SUCCESS: i32 = 0;
const ERRNO_BADF: i32 = 8;

/// Size of one `ciovec` record: `{ buf: u32, buf_len: u32 }`.
const IOVEC_SIZE: i32 = 8;

/// Returns true for imports the engine satisfies on its own.
pub fn is_default_import(namespace: &str, name: &str) -> bool {
    namespace == ENV_NAMESPACE && (name == ABORT_IMPORT || name == RAISE_ERROR_IMPORT)
}

pub fn define_defaults(linker: &mut Linker<InstanceState>) -> PluginResult<()> {
    define_env(linker).map_err(|e| PluginError::Engine(format!("{e:#}")))?;
    for namespace in [WASI_UNSTABLE, WASI_SNAPSHOT_PREVIEW1] {
        define_fd_write(linker, namespace).map_err(|e| PluginError::Engine(format!("{e:#}")))?;
    }
    Ok(())
}

fn define_env(linker: &mut Linker<InstanceState>) -> anyhow::Result<()> {
    // abort only exists so toolchains that emit it can link; the guest unwinds itself
    linker.func_wrap(ENV_NAMESPACE, ABORT_IMPORT, |_: i32, _: i32, _: i32, _: i32| {})?;

    linker.func_wrap(
        ENV_NAMESPACE,
        RAISE_ERROR_IMPORT,
        |mut caller: Caller<'_, InstanceState>, addr: i32| -> anyhow::Result<()> {
            capture_exports(&mut caller);
            let mut ctx = caller.as_context_mut();
            raise_error(&mut ctx, addr).map_err(anyhow::Error::from)
        },
    )?;
    Ok(())
}

fn define_fd_write(linker: &mut Linker<InstanceState>, namespace: &str) -> anyhow::Result<()> {
    linker.func_wrap(
        namespace,
        FD_WRITE_IMPORT,
        |mut caller: Caller<'_, InstanceState>,
         fd: i32,
         iovs: i32,
         iovs_len: i32,
         nwritten: i32|
         -> anyhow::Result<i32> {
            capture_exports(&mut caller);
            let mut ctx = caller.as_context_mut();
            fd_write(&mut ctx, fd, iovs, iovs_len, nwritten).map_err(anyhow::Error::from)
        },
    )?;
    Ok(())
}

fn raise_error(ctx: &mut GuestContext<'_>, addr: i32) -> PluginResult<()> {
    let message = codec::with_scope(ctx, |ctx| codec::decode_string(ctx, addr))?;
    tracing::warn!(
        "{}",
        GuestRaisedError {
            plugin: &ctx.data().plugin,
            message: &message,
        }
    );
    ctx.data_mut().pending_error = Some(message);
    Ok(())
}

/// Routes writes on stdout and stderr to the host log; other descriptors get `EBADF`.
fn fd_write(
    ctx: &mut GuestContext<'_>,
    fd: i32,
    iovs: i32,
    iovs_len: i32,
    nwritten: i32,
) -> PluginResult<i32> {
    if fd != STDOUT && fd != STDERR {
        return Ok(ERRNO_BADF);
    }

    let mut buffer = Vec::new();
    for i in 0..iovs_len.max(0) {
        let record = iovs.wrapping_add(i.wrapping_mul(IOVEC_SIZE));
        let base = GuestMemory::read_u32_le(ctx, record)?;
        let len = GuestMemory::read_u32_le(ctx, record.wrapping_add(4))?;
        buffer.extend(GuestMemory::read(ctx, base as i32, len as usize)?);
    }

    let text = String::from_utf8_lossy(&buffer);
    let plugin = ctx.data().plugin.clone();
    if fd == STDOUT {
        tracing::info!("{}", GuestStdout { plugin: &plugin, text: &text });
    } else {
        tracing::error!("{}", GuestStderr { plugin: &plugin, text: &text });
    }

    GuestMemory::write_u32_le(ctx, nwritten, buffer.len() as u32)?;
    Ok(ERRNO_SUCCESS)
}
