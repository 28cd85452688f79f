// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wire encodings for strings and byte arrays in guest memory.
//!
//! ```text
//! string: [utf-8 bytes...][0x00]
//! bytes:  [len: u32 little-endian][payload: len bytes]
//! ```
//!
//! These two layouts are the whole ABI; every guest-side implementation must
//! produce and consume them bit-exactly. Every region the codec touches is
//! recorded in the instance's allocation ledger and released by [`sweep`].

use crate::abi::{AbiFunctions, GuestMemory};
use crate::errors::{PluginError, PluginResult};
use crate::instance::GuestContext;
use crate::observability::messages::call::DeallocationFailed;

/// Bytes in the length prefix of an encoded byte array.
pub const BYTES_PREFIX_LEN: usize = 4;

/// Copies `s` into guest memory as a null-terminated string and returns its address.
pub fn encode_string(ctx: &mut GuestContext<'_>, s: &str) -> PluginResult<i32> {
    let size = s.len() + 1;
    let addr = allocate_checked(ctx, size)?;

    let mut buffer = Vec::with_capacity(size);
    buffer.extend_from_slice(s.as_bytes());
    buffer.push(0);

    GuestMemory::write(ctx, addr, &buffer)?;
    Ok(addr)
}

/// Copies the guest string at `addr` out of linear memory.
///
/// The guest decides where the string ends via `get_string_size`. Invalid
/// UTF-8 fails with `InvalidString`; the region is still released by the sweep.
pub fn decode_string(ctx: &mut GuestContext<'_>, addr: i32) -> PluginResult<String> {
    let len = AbiFunctions::get_string_size(ctx, addr)? as u32 as usize;
    let bytes = GuestMemory::read(ctx, addr, len)?;
    ctx.data_mut().ledger.register(addr, len as i32);

    String::from_utf8(bytes).map_err(|source| PluginError::InvalidString {
        addr: addr as u32,
        source,
    })
}

/// Copies `data` into guest memory behind a 4-byte length prefix and returns its address.
pub fn encode_bytes(ctx: &mut GuestContext<'_>, data: &[u8]) -> PluginResult<i32> {
    let size = data.len() + BYTES_PREFIX_LEN;
    let addr = allocate_checked(ctx, size)?;

    let mut buffer = Vec::with_capacity(size);
    buffer.extend_from_slice(&(data.len() as u32).to_le_bytes());
    buffer.extend_from_slice(data);

    GuestMemory::write(ctx, addr, &buffer)?;
    Ok(addr)
}

/// Copies the length-prefixed byte array at `addr` out of linear memory.
pub fn decode_bytes(ctx: &mut GuestContext<'_>, addr: i32) -> PluginResult<Vec<u8>> {
    let length = GuestMemory::read_u32_le(ctx, addr)? as usize;
    let total = length + BYTES_PREFIX_LEN;

    let mut bytes = GuestMemory::read(ctx, addr, total)?;
    ctx.data_mut().ledger.register(addr, total as i32);

    bytes.drain(..BYTES_PREFIX_LEN);
    Ok(bytes)
}

/// Runs `f` inside a fresh ledger scope and sweeps the scope afterwards,
/// whether `f` succeeded or not.
pub fn with_scope<R>(
    ctx: &mut GuestContext<'_>,
    f: impl FnOnce(&mut GuestContext<'_>) -> PluginResult<R>,
) -> PluginResult<R> {
    ctx.data_mut().ledger.open_scope();
    let outcome = f(ctx);
    sweep(ctx);
    outcome
}

/// Closes the innermost ledger scope and deallocates everything it holds.
///
/// Deallocation failures cannot change the outcome of the call that is
/// finishing, so they are logged as potential leaks and otherwise ignored.
pub fn sweep(ctx: &mut GuestContext<'_>) {
    let entries = ctx.data_mut().ledger.close_scope();

    for (addr, size) in entries {
        if let Err(error) = AbiFunctions::deallocate(ctx, addr, size) {
            tracing::warn!(
                "{}",
                DeallocationFailed {
                    plugin: &ctx.data().plugin,
                    addr,
                    size,
                    error: &error,
                }
            );
        }
    }
}

/// Allocates `size` bytes, validates the returned region and records it in
/// the ledger before anything is written to it.
fn allocate_checked(ctx: &mut GuestContext<'_>, size: usize) -> PluginResult<i32> {
    let wrap = |source: PluginError| PluginError::Allocation {
        size,
        source: Box::new(source),
    };

    let guest_size = i32::try_from(size).map_err(|_| {
        wrap(PluginError::OutOfBounds {
            addr: 0,
            len: size,
            memory_size: 0,
        })
    })?;

    let addr = AbiFunctions::allocate(ctx, guest_size).map_err(wrap)?;
    GuestMemory::check_bounds(ctx, addr, size).map_err(wrap)?;

    ctx.data_mut().ledger.register(addr, guest_size);
    Ok(addr)
}
