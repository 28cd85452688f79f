// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bounds-checked access to one instance's linear memory.
//!
//! Guest memory is untrusted: every address and length comes from the guest
//! and is validated against the memory's current size before any copy. Reads
//! and writes never truncate; they either cover the whole range or fail with
//! `OutOfBounds`.

use crate::config::consts::MEMORY_EXPORT;
use crate::errors::{PluginError, PluginResult};
use crate::instance::{lookup_export, GuestContext};
use wasmtime::{Extern, Memory};

/// Memory accessor for the guest's exported `memory`.
pub struct GuestMemory;

impl GuestMemory {
    fn memory(ctx: &mut GuestContext<'_>) -> PluginResult<Memory> {
        if let Some(memory) = ctx.data().memory {
            return Ok(memory);
        }

        let memory = lookup_export(ctx, MEMORY_EXPORT)
            .and_then(Extern::into_memory)
            .ok_or_else(|| PluginError::MissingExport(MEMORY_EXPORT.to_string()))?;

        ctx.data_mut().memory = Some(memory);
        Ok(memory)
    }

    /// Current size of linear memory in bytes.
    pub fn size(ctx: &mut GuestContext<'_>) -> PluginResult<usize> {
        let memory = Self::memory(ctx)?;
        Ok(memory.data_size(&*ctx))
    }

    /// Validates `[addr, addr + len)` and returns the start offset.
    ///
    /// Addresses are guest `i32`s reinterpreted as unsigned offsets.
    pub fn check_bounds(ctx: &mut GuestContext<'_>, addr: i32, len: usize) -> PluginResult<usize> {
        let memory_size = Self::size(ctx)?;
        let start = addr as u32 as usize;

        match start.checked_add(len) {
            Some(end) if end <= memory_size => Ok(start),
            _ => Err(PluginError::OutOfBounds {
                addr: addr as u32,
                len,
                memory_size,
            }),
        }
    }

    pub fn read(ctx: &mut GuestContext<'_>, addr: i32, len: usize) -> PluginResult<Vec<u8>> {
        let start = Self::check_bounds(ctx, addr, len)?;
        let memory = Self::memory(ctx)?;

        let mut buffer = vec![0u8; len];
        memory
            .read(&*ctx, start, &mut buffer)
            .map_err(|_| PluginError::OutOfBounds {
                addr: addr as u32,
                len,
                memory_size: memory.data_size(&*ctx),
            })?;
        Ok(buffer)
    }

    pub fn write(ctx: &mut GuestContext<'_>, addr: i32, bytes: &[u8]) -> PluginResult<()> {
        let start = Self::check_bounds(ctx, addr, bytes.len())?;
        let memory = Self::memory(ctx)?;

        memory
            .write(&mut *ctx, start, bytes)
            .map_err(|_| PluginError::OutOfBounds {
                addr: addr as u32,
                len: bytes.len(),
                memory_size: memory.data_size(&*ctx),
            })
    }

    pub fn read_u32_le(ctx: &mut GuestContext<'_>, addr: i32) -> PluginResult<u32> {
        let bytes = Self::read(ctx, addr, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn write_u32_le(ctx: &mut GuestContext<'_>, addr: i32, value: u32) -> PluginResult<()> {
        Self::write(ctx, addr, &value.to_le_bytes())
    }
}
