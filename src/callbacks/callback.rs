// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::abi::{HostValue, ValueKind};
use crate::errors::{PluginError, PluginResult};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use wasmtime::{Engine, FuncType, ValType};

/// Host function signature behind every callback.
///
/// Arguments arrive already decoded according to the callback's declared
/// parameter kinds; results are encoded according to its declared result kinds.
pub type HostFunction = dyn Fn(&[HostValue]) -> anyhow::Result<Vec<HostValue>> + Send + Sync;

/// A host function plus the kinds of its parameters and results.
#[derive(Clone)]
pub struct Callback {
    params: Vec<ValueKind>,
    results: Vec<ValueKind>,
    func: Arc<HostFunction>,
}

impl Callback {
    pub fn new<F>(params: Vec<ValueKind>, results: Vec<ValueKind>, func: F) -> Self
    where
        F: Fn(&[HostValue]) -> anyhow::Result<Vec<HostValue>> + Send + Sync + 'static,
    {
        Self {
            params,
            results,
            func: Arc::new(func),
        }
    }

    /// Starts a callback description.
    ///
    /// # Example
    /// ```
    /// use wasp::abi::{HostValue, ValueKind};
    /// use wasp::callbacks::Callback;
    ///
    /// let greet = Callback::builder()
    ///     .param(ValueKind::String)
    ///     .result(ValueKind::String)
    ///     .build(|args| {
    ///         let name = args[0].as_str().unwrap_or_default();
    ///         Ok(vec![HostValue::from(format!("Hello {name}"))])
    ///     });
    ///
    /// assert_eq!(greet.params(), &[ValueKind::String]);
    /// ```
    pub fn builder() -> CallbackBuilder {
        CallbackBuilder::default()
    }

    pub fn params(&self) -> &[ValueKind] {
        &self.params
    }

    pub fn results(&self) -> &[ValueKind] {
        &self.results
    }

    pub(crate) fn invoke(&self, args: &[HostValue]) -> anyhow::Result<Vec<HostValue>> {
        (self.func)(args)
    }

    /// Guest-facing signature: one `i32` per parameter and per result.
    pub fn func_type(&self, engine: &Engine) -> FuncType {
        FuncType::new(
            engine,
            self.params.iter().map(|_| ValType::I32),
            self.results.iter().map(|_| ValType::I32),
        )
    }

    /// Printable guest signature, e.g. `(i32, i32) -> (i32)`.
    pub fn guest_signature(&self) -> String {
        signature(self.params.len(), self.results.len())
    }

    fn check_kinds(&self, namespace: &str, name: &str) -> PluginResult<()> {
        let unsupported = self
            .params
            .iter()
            .chain(self.results.iter())
            .enumerate()
            .find(|(_, kind)| !kind.is_callback_kind());

        match unsupported {
            Some((position, kind)) => Err(PluginError::UnsupportedCallbackType {
                namespace: namespace.to_string(),
                name: name.to_string(),
                position,
                kind: *kind,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("params", &self.params)
            .field("results", &self.results)
            .finish_non_exhaustive()
    }
}

pub(crate) fn signature(params: usize, results: usize) -> String {
    let list = |n: usize| vec!["i32"; n].join(", ");
    format!("({}) -> ({})", list(params), list(results))
}

/// Builder returned by [`Callback::builder`].
#[derive(Default)]
pub struct CallbackBuilder {
    params: Vec<ValueKind>,
    results: Vec<ValueKind>,
}

impl CallbackBuilder {
    pub fn param(mut self, kind: ValueKind) -> Self {
        self.params.push(kind);
        self
    }

    pub fn result(mut self, kind: ValueKind) -> Self {
        self.results.push(kind);
        self
    }

    pub fn build<F>(self, func: F) -> Callback
    where
        F: Fn(&[HostValue]) -> anyhow::Result<Vec<HostValue>> + Send + Sync + 'static,
    {
        Callback::new(self.params, self.results, func)
    }
}

/// Host functions keyed by `(namespace, name)`.
///
/// Names only need to be unique within a namespace. Adding a callback under an
/// existing key replaces it.
#[derive(Clone, Default)]
pub struct Callbacks {
    entries: BTreeMap<String, BTreeMap<String, Callback>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `callback` as `namespace.name`.
    ///
    /// Fails with `UnsupportedCallbackType` if a parameter or result kind is
    /// not `Int32` or `String`; positions count parameters first, then results.
    pub fn add_callback(
        &mut self,
        namespace: &str,
        name: &str,
        callback: Callback,
    ) -> PluginResult<()> {
        callback.check_kinds(namespace, name)?;
        self.entries
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), callback);
        Ok(())
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<&Callback> {
        self.entries.get(namespace)?.get(name)
    }

    pub fn contains(&self, namespace: &str, name: &str) -> bool {
        self.get(namespace, name).is_some()
    }

    /// All callbacks as `(namespace, name, callback)`, ordered by namespace then name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Callback)> {
        self.entries.iter().flat_map(|(namespace, names)| {
            names
                .iter()
                .map(move |(name, callback)| (namespace.as_str(), name.as_str(), callback))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|(ns, name, _)| format!("{ns}.{name}")))
            .finish()
    }
}
