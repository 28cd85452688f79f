// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::abi::{codec, FromHostValue, HostValue, ValueKind};
use crate::errors::{PluginError, PluginResult};
use crate::instance::{GuestContext, InstanceState};
use crate::observability::messages::call::{CallCompleted, CallFailed, CallStarted};
use crate::observability::messages::engine::{InstanceFaulted, InstanceRemoved};
use std::fmt;
use wasmtime::{AsContextMut, Func, Store, Val, ValType};

/// Lifecycle of an [`Instance`].
///
/// `Created` and `Bound` are passed through inside `PluginEngine::get_instance`;
/// callers only ever hold `Instantiated`, `Faulted` or `Removed` instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    Created,
    Bound,
    Instantiated,
    /// A guest trap left the VM state unknown; calls are rejected.
    Faulted,
    Removed,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstanceStatus::Created => "Created",
            InstanceStatus::Bound => "Bound",
            InstanceStatus::Instantiated => "Instantiated",
            InstanceStatus::Faulted => "Faulted",
            InstanceStatus::Removed => "Removed",
        };
        f.write_str(name)
    }
}

/// One live, isolated execution context of a plugin.
///
/// An instance owns its store, so its linear memory, allocation ledger and
/// pending-error slot are private to it. Calls take `&mut self`: one call at
/// a time per instance. Separate instances can run on separate threads.
pub struct Instance {
    plugin: String,
    store: Option<Store<InstanceState>>,
    status: InstanceStatus,
    fault: Option<String>,
    fuel_per_call: Option<u64>,
}

impl Instance {
    pub(crate) fn new(plugin: &str, store: Store<InstanceState>, fuel_per_call: Option<u64>) -> Self {
        Self {
            plugin: plugin.to_string(),
            store: Some(store),
            status: InstanceStatus::Instantiated,
            fault: None,
            fuel_per_call,
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin
    }

    pub fn status(&self) -> InstanceStatus {
        self.status
    }

    /// Guest allocations the host still has to release; zero between calls.
    pub fn pending_allocations(&self) -> usize {
        self.store
            .as_ref()
            .map(|store| store.data().ledger.len())
            .unwrap_or(0)
    }

    /// Calls export `name` and decodes its single result as `output`.
    ///
    /// Integer inputs pass straight through; strings and byte arrays are
    /// copied into guest memory and passed by address. Everything the host
    /// allocated or decoded during the call is released before this returns,
    /// whether the call succeeded or not.
    ///
    /// If the guest called `raise_error`, the result is `GuestRaised` with
    /// its message, even when the export itself returned normally.
    pub fn call_function(
        &mut self,
        name: &str,
        output: ValueKind,
        inputs: &[HostValue],
    ) -> PluginResult<HostValue> {
        match self.status {
            InstanceStatus::Removed => return Err(PluginError::InstanceRemoved),
            InstanceStatus::Faulted => {
                return Err(PluginError::InstanceFaulted(
                    self.fault.clone().unwrap_or_default(),
                ))
            }
            _ => {}
        }
        let store = self.store.as_mut().ok_or(PluginError::InstanceRemoved)?;

        tracing::debug!(
            "{}",
            CallStarted {
                plugin: &self.plugin,
                function: name,
                input_count: inputs.len(),
            }
        );

        let mut trapped = false;
        let result = call(store, name, output, inputs, self.fuel_per_call, &mut trapped);

        match &result {
            Ok((value, fuel_consumed)) => {
                tracing::debug!(
                    "{}",
                    CallCompleted {
                        plugin: &self.plugin,
                        function: name,
                        output_kind: &value.kind().to_string(),
                        fuel_consumed: *fuel_consumed,
                    }
                );
            }
            Err(error) => {
                tracing::error!(
                    "{}",
                    CallFailed {
                        plugin: &self.plugin,
                        function: name,
                        error,
                    }
                );
                if trapped {
                    let reason = error.to_string();
                    tracing::error!(
                        "{}",
                        InstanceFaulted {
                            plugin: &self.plugin,
                            function: name,
                            reason: &reason,
                        }
                    );
                    self.status = InstanceStatus::Faulted;
                    self.fault = Some(reason);
                }
            }
        }

        result.map(|(value, _)| value)
    }

    /// Calls export `name` and writes its result into `out`.
    ///
    /// The type of `out` selects the decoding: `i32`, `String` or `Vec<u8>`.
    pub fn call_into<T: FromHostValue>(
        &mut self,
        name: &str,
        out: &mut T,
        inputs: &[HostValue],
    ) -> PluginResult<()> {
        let value = self.call_function(name, T::KIND, inputs)?;
        let actual = value.kind();
        *out = T::from_host_value(value).ok_or_else(|| PluginError::ExportSignature {
            function: name.to_string(),
            reason: format!("expected {} result, got {}", T::KIND, actual),
        })?;
        Ok(())
    }

    /// Releases the store, its linear memory and the mounted directories.
    ///
    /// Removing twice is a no-op. A workspace directory passed to
    /// `get_instance` is unmounted but not deleted.
    pub fn remove(&mut self) -> PluginResult<()> {
        if self.status == InstanceStatus::Removed {
            return Ok(());
        }

        self.store = None;
        self.status = InstanceStatus::Removed;
        tracing::info!("{}", InstanceRemoved { plugin: &self.plugin });
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn with_context<R>(&mut self, f: impl FnOnce(&mut GuestContext<'_>) -> R) -> R {
        let store = self.store.as_mut().expect("instance has been removed");
        f(&mut store.as_context_mut())
    }
}

/// Runs one exported call inside its own ledger scope.
///
/// Returns the decoded value and the fuel consumed when metering is on.
fn call(
    store: &mut Store<InstanceState>,
    name: &str,
    output: ValueKind,
    inputs: &[HostValue],
    fuel_per_call: Option<u64>,
    trapped: &mut bool,
) -> PluginResult<(HostValue, Option<u64>)> {
    let mut ctx = store.as_context_mut();

    let handle = ctx.data().handle.ok_or(PluginError::InstanceRemoved)?;
    let func = handle
        .get_func(&mut ctx, name)
        .ok_or_else(|| PluginError::FunctionNotFound(name.to_string()))?;

    if !output.is_output_kind() {
        return Err(PluginError::UnsupportedOutputKind(output));
    }
    check_signature(&mut ctx, &func, name, inputs)?;

    if let Some(fuel) = fuel_per_call {
        ctx.set_fuel(fuel)
            .map_err(|e| PluginError::Engine(format!("{e:#}")))?;
    }
    ctx.data_mut().pending_error = None;

    let outcome = codec::with_scope(&mut ctx, |ctx| {
        let args = encode_inputs(ctx, inputs)?;
        let mut results = [Val::I32(0)];

        func.call(&mut *ctx, &args, &mut results)
            .map_err(|error| PluginError::from_call(name, error))?;

        let raw = results[0].i32().unwrap_or_default();
        decode_output(ctx, output, raw)
    });

    // Traps in the ABI exports while marshaling poison the instance too
    *trapped = matches!(&outcome, Err(error) if error.is_guest_trap());

    // A raised error wins over whatever the export returned or failed with
    if let Some(message) = ctx.data_mut().pending_error.take() {
        return Err(PluginError::GuestRaised(message));
    }
    let value = outcome?;

    let fuel_consumed = match fuel_per_call {
        Some(fuel) => ctx.get_fuel().ok().map(|left| fuel.saturating_sub(left)),
        None => None,
    };
    Ok((value, fuel_consumed))
}

/// Checks that `inputs` and `output` fit the export's declared type.
fn check_signature(
    ctx: &mut GuestContext<'_>,
    func: &Func,
    name: &str,
    inputs: &[HostValue],
) -> PluginResult<()> {
    let ty = func.ty(&*ctx);
    let mismatch = |reason: String| PluginError::ExportSignature {
        function: name.to_string(),
        reason,
    };

    if ty.params().len() != inputs.len() {
        return Err(mismatch(format!(
            "takes {} parameters, {} inputs given",
            ty.params().len(),
            inputs.len()
        )));
    }

    for (position, (param, input)) in ty.params().zip(inputs).enumerate() {
        let fits = match input {
            HostValue::I32(_) | HostValue::String(_) | HostValue::Bytes(_) => {
                matches!(param, ValType::I32)
            }
            HostValue::I64(_) => matches!(param, ValType::I64),
            HostValue::F32(_) => matches!(param, ValType::F32),
            HostValue::F64(_) => matches!(param, ValType::F64),
        };
        if !fits {
            return Err(mismatch(format!(
                "parameter {} is {}, input is {}",
                position,
                param,
                input.kind()
            )));
        }
    }

    let results: Vec<ValType> = ty.results().collect();
    match results.as_slice() {
        [ValType::I32] => Ok(()),
        _ => Err(mismatch(format!(
            "must return exactly one i32, returns {} values",
            results.len()
        ))),
    }
}

fn encode_inputs(ctx: &mut GuestContext<'_>, inputs: &[HostValue]) -> PluginResult<Vec<Val>> {
    inputs
        .iter()
        .map(|input| {
            Ok(match input {
                HostValue::I32(v) => Val::I32(*v),
                HostValue::I64(v) => Val::I64(*v),
                HostValue::F32(v) => Val::F32(v.to_bits()),
                HostValue::F64(v) => Val::F64(v.to_bits()),
                HostValue::String(s) => Val::I32(codec::encode_string(ctx, s)?),
                HostValue::Bytes(b) => Val::I32(codec::encode_bytes(ctx, b)?),
            })
        })
        .collect()
}

fn decode_output(ctx: &mut GuestContext<'_>, output: ValueKind, raw: i32) -> PluginResult<HostValue> {
    match output {
        ValueKind::Int32 => Ok(HostValue::I32(raw)),
        ValueKind::String => Ok(HostValue::String(codec::decode_string(ctx, raw)?)),
        ValueKind::Bytes => Ok(HostValue::Bytes(codec::decode_bytes(ctx, raw)?)),
        other => Err(PluginError::UnsupportedOutputKind(other)),
    }
}
