// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-instance data stored inside the wasmtime `Store`.
//!
//! Everything that host code needs while the guest is running lives here so
//! that it is reachable both from `Instance` (through the store) and from host
//! functions the guest calls back into (through `Caller`).

use crate::abi::{AbiFunctions, AllocationLedger};
use crate::config::consts::{
    ALLOCATE_EXPORT, DEALLOCATE_EXPORT, GET_STRING_SIZE_EXPORT, MEMORY_EXPORT,
};
use std::collections::HashMap;
use wasmtime::{Caller, Extern, Memory, StoreContextMut};
use wasmtime_wasi::p1::WasiP1Ctx;

/// Store context used by the memory accessor, codec and callback bridge.
pub type GuestContext<'a> = StoreContextMut<'a, InstanceState>;

const ABI_EXPORTS: [&str; 4] = [
    MEMORY_EXPORT,
    ALLOCATE_EXPORT,
    DEALLOCATE_EXPORT,
    GET_STRING_SIZE_EXPORT,
];

pub struct InstanceState {
    pub(crate) plugin: String,
    pub(crate) wasi: WasiP1Ctx,
    /// Set once the module has been instantiated; ABI lookups resolve through it.
    pub(crate) handle: Option<wasmtime::Instance>,
    /// ABI exports captured from a `Caller` while the start function runs.
    early_exports: HashMap<&'static str, Extern>,
    pub(crate) memory: Option<Memory>,
    pub(crate) abi: AbiFunctions,
    pub(crate) ledger: AllocationLedger,
    /// Written only by the `raise_error` default import.
    pub(crate) pending_error: Option<String>,
}

impl InstanceState {
    pub(crate) fn new(plugin: &str, wasi: WasiP1Ctx) -> Self {
        Self {
            plugin: plugin.to_string(),
            wasi,
            handle: None,
            early_exports: HashMap::new(),
            memory: None,
            abi: AbiFunctions::default(),
            ledger: AllocationLedger::default(),
            pending_error: None,
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn ledger(&self) -> &AllocationLedger {
        &self.ledger
    }
}

/// Captures the ABI exports through `caller` if the instance handle is not set yet.
///
/// Host functions invoked from a start function run before instantiation
/// returns, so the exports are only reachable through the caller.
pub(crate) fn capture_exports(caller: &mut Caller<'_, InstanceState>) {
    if caller.data().handle.is_some() {
        return;
    }

    for name in ABI_EXPORTS {
        if caller.data().early_exports.contains_key(name) {
            continue;
        }
        if let Some(export) = caller.get_export(name) {
            caller.data_mut().early_exports.insert(name, export);
        }
    }
}

/// Looks up export `name` through the instance handle, or the captured exports
/// while instantiation is still running.
pub(crate) fn lookup_export(ctx: &mut GuestContext<'_>, name: &str) -> Option<Extern> {
    let handle = ctx.data().handle;
    match handle {
        Some(handle) => handle.get_export(&mut *ctx, name),
        None => ctx.data().early_exports.get(name).cloned(),
    }
}
