// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed wrappers over the allocator exports every plugin provides.
//!
//! ```text
//! allocate(size: i32) -> i32
//! deallocate(addr: i32, size: i32)
//! get_string_size(addr: i32) -> i32
//! ```
//!
//! Exports are resolved on first use and cached in the instance state, so a
//! module without the ABI still registers and instantiates; it only fails
//! when a call first needs to move a string or byte array.

use crate::config::consts::{ALLOCATE_EXPORT, DEALLOCATE_EXPORT, GET_STRING_SIZE_EXPORT};
use crate::errors::{PluginError, PluginResult};
use crate::instance::{lookup_export, GuestContext};
use wasmtime::{Extern, TypedFunc, WasmParams, WasmResults};

/// Cached handles to the guest's ABI exports.
#[derive(Default)]
pub struct AbiFunctions {
    allocate: Option<TypedFunc<i32, i32>>,
    deallocate: Option<TypedFunc<(i32, i32), ()>>,
    get_string_size: Option<TypedFunc<i32, i32>>,
}

impl AbiFunctions {
    /// Asks the guest for `size` writable bytes.
    pub fn allocate(ctx: &mut GuestContext<'_>, size: i32) -> PluginResult<i32> {
        let func = match ctx.data().abi.allocate.clone() {
            Some(func) => func,
            None => {
                let func = resolve::<i32, i32>(ctx, ALLOCATE_EXPORT, "(i32) -> i32")?;
                ctx.data_mut().abi.allocate = Some(func.clone());
                func
            }
        };

        func.call(&mut *ctx, size).map_err(|e| trap(ALLOCATE_EXPORT, e))
    }

    /// Releases a region previously handed out by `allocate`.
    pub fn deallocate(ctx: &mut GuestContext<'_>, addr: i32, size: i32) -> PluginResult<()> {
        let func = match ctx.data().abi.deallocate.clone() {
            Some(func) => func,
            None => {
                let func = resolve::<(i32, i32), ()>(ctx, DEALLOCATE_EXPORT, "(i32, i32) -> ()")?;
                ctx.data_mut().abi.deallocate = Some(func.clone());
                func
            }
        };

        func.call(&mut *ctx, (addr, size))
            .map_err(|e| trap(DEALLOCATE_EXPORT, e))
    }

    /// Length in bytes of the null-terminated string at `addr`, terminator excluded.
    pub fn get_string_size(ctx: &mut GuestContext<'_>, addr: i32) -> PluginResult<i32> {
        let func = match ctx.data().abi.get_string_size.clone() {
            Some(func) => func,
            None => {
                let func = resolve::<i32, i32>(ctx, GET_STRING_SIZE_EXPORT, "(i32) -> i32")?;
                ctx.data_mut().abi.get_string_size = Some(func.clone());
                func
            }
        };

        func.call(&mut *ctx, addr)
            .map_err(|e| trap(GET_STRING_SIZE_EXPORT, e))
    }
}

fn resolve<P, R>(
    ctx: &mut GuestContext<'_>,
    name: &str,
    expected: &str,
) -> PluginResult<TypedFunc<P, R>>
where
    P: WasmParams,
    R: WasmResults,
{
    let func = lookup_export(ctx, name)
        .and_then(Extern::into_func)
        .ok_or_else(|| PluginError::MissingExport(name.to_string()))?;

    func.typed::<P, R>(&*ctx)
        .map_err(|_| PluginError::AbiSignature {
            name: name.to_string(),
            expected: expected.to_string(),
        })
}

fn trap(function: &str, error: wasmtime::Error) -> PluginError {
    PluginError::GuestTrap {
        function: function.to_string(),
        message: format!("{error:#}"),
    }
}
