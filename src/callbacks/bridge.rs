// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Binds host callbacks into a linker as guest-callable imports.
//!
//! Each invocation runs in its own ledger scope: string arguments the guest
//! passes in are decoded and released when the callback returns. String
//! results are allocated in the guest and handed to the enclosing scope, so
//! they stay valid until the exported call that triggered the callback ends.

use crate::abi::{codec, HostValue, ValueKind};
use crate::callbacks::Callback;
use crate::errors::{PluginError, PluginResult};
use crate::instance::{capture_exports, GuestContext, InstanceState};
use crate::observability::messages::call::CallbackInvoked;
use wasmtime::{AsContextMut, Caller, Linker, Val};

/// Defines `namespace.name` in `linker`, replacing any earlier definition.
pub fn define_callback(
    linker: &mut Linker<InstanceState>,
    namespace: &str,
    name: &str,
    callback: &Callback,
) -> PluginResult<()> {
    let ty = callback.func_type(linker.engine());
    let callback = callback.clone();
    let ns = namespace.to_string();
    let fname = name.to_string();

    linker
        .func_new(
            namespace,
            name,
            ty,
            move |mut caller: Caller<'_, InstanceState>, params: &[Val], results: &mut [Val]| {
                capture_exports(&mut caller);
                let mut ctx = caller.as_context_mut();
                invoke(&mut ctx, &ns, &fname, &callback, params, results)
                    .map_err(anyhow::Error::from)
            },
        )
        .map_err(|e| PluginError::Engine(format!("{e:#}")))?;
    Ok(())
}

fn invoke(
    ctx: &mut GuestContext<'_>,
    namespace: &str,
    name: &str,
    callback: &Callback,
    params: &[Val],
    results: &mut [Val],
) -> PluginResult<()> {
    tracing::debug!(
        "{}",
        CallbackInvoked {
            plugin: &ctx.data().plugin,
            namespace,
            name,
            depth: ctx.data().ledger.depth(),
        }
    );

    let raw = codec::with_scope(ctx, |ctx| {
        let args = decode_args(ctx, namespace, name, callback.params(), params)?;

        let values = callback
            .invoke(&args)
            .map_err(|source| PluginError::CallbackFailed {
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            })?;

        if values.len() != callback.results().len() {
            return Err(PluginError::CallbackArity {
                namespace: namespace.to_string(),
                name: name.to_string(),
                expected: callback.results().len(),
                actual: values.len(),
            });
        }

        encode_results(ctx, namespace, name, callback.results(), values)
    })?;

    for (slot, value) in results.iter_mut().zip(raw) {
        *slot = Val::I32(value);
    }
    Ok(())
}

fn decode_args(
    ctx: &mut GuestContext<'_>,
    namespace: &str,
    name: &str,
    kinds: &[ValueKind],
    params: &[Val],
) -> PluginResult<Vec<HostValue>> {
    let mut args = Vec::with_capacity(kinds.len());

    for (kind, param) in kinds.iter().zip(params) {
        let raw = param.i32().ok_or_else(|| PluginError::ImportSignature {
            namespace: namespace.to_string(),
            name: name.to_string(),
            expected: "i32 parameters".to_string(),
            actual: "a non-i32 value".to_string(),
        })?;

        let arg = match kind {
            ValueKind::String => HostValue::String(codec::decode_string(ctx, raw)?),
            _ => HostValue::I32(raw),
        };
        args.push(arg);
    }
    Ok(args)
}

fn encode_results(
    ctx: &mut GuestContext<'_>,
    namespace: &str,
    name: &str,
    kinds: &[ValueKind],
    values: Vec<HostValue>,
) -> PluginResult<Vec<i32>> {
    let mut raw = Vec::with_capacity(values.len());

    for (position, (expected, value)) in kinds.iter().zip(values).enumerate() {
        match (expected, value) {
            (ValueKind::Int32, HostValue::I32(v)) => raw.push(v),
            (ValueKind::String, HostValue::String(s)) => {
                let addr = codec::encode_string(ctx, &s)?;
                let ledger = &mut ctx.data_mut().ledger;
                // Outside any exported call (e.g. a start function) there is
                // no enclosing scope and the guest takes ownership.
                if !ledger.promote(addr) {
                    ledger.forget(addr);
                }
                raw.push(addr);
            }
            (expected, actual) => {
                return Err(PluginError::CallbackResultType {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    position,
                    expected: *expected,
                    actual: actual.kind(),
                })
            }
        }
    }
    Ok(raw)
}
