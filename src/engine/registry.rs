// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Plugin registry: compiles modules once and hands out instances.

use crate::callbacks::{define_callback, Callback, Callbacks};
use crate::config::{EngineConfig, PluginConfig};
use crate::engine::defaults::define_defaults;
use crate::engine::imports::{validate_imports, ModuleImport};
use crate::engine::loader::{ensure_core_module, load_wasm_bytes};
use crate::engine::wasi::build_wasi_ctx;
use crate::errors::{PluginError, PluginResult};
use crate::instance::{Instance, InstanceState, InstanceStatus};
use crate::observability::messages::engine::{
    InstanceCreated, InstanceStateChanged, PluginRegistered, PluginRegistrationFailed,
};
use std::collections::HashMap;
use std::path::Path;
use wasmtime::{Config, Engine, Linker, Module, Store};

/// A compiled module plus the configuration it was registered with.
pub struct Plugin {
    name: String,
    module: Module,
    config: PluginConfig,
    imports: Vec<ModuleImport>,
}

impl Plugin {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Imports the module declares, with how each one is satisfied.
    pub fn imports(&self) -> &[ModuleImport] {
        &self.imports
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }
}

/// Creates a Wasmtime engine for core modules
///
/// Security-focused defaults:
/// - `wasm_component_model(false)` - core modules only
/// - Disabled features: threads, SIMD, multi-memory, memory64
/// - `consume_fuel` only when a per-call fuel budget is configured
pub fn create_engine(config: &EngineConfig) -> PluginResult<Engine> {
    let mut wasm_config = Config::new();

    wasm_config.wasm_component_model(false);
    wasm_config.wasm_threads(false);
    wasm_config.wasm_simd(false);
    wasm_config.wasm_relaxed_simd(false);
    wasm_config.wasm_multi_memory(false);
    wasm_config.wasm_memory64(false);
    wasm_config.consume_fuel(config.fuel.is_some());
    wasm_config.epoch_interruption(false);

    Engine::new(&wasm_config).map_err(|e| PluginError::Engine(format!("{e:#}")))
}

/// Registry of named plugins sharing one VM engine.
///
/// Registration compiles and validates a module once; `get_instance` then
/// produces any number of independent instances from it. `&self` methods may
/// be called from several threads at once.
pub struct PluginEngine {
    engine: Engine,
    config: EngineConfig,
    callbacks: Callbacks,
    plugins: HashMap<String, Plugin>,
}

impl PluginEngine {
    pub fn new() -> PluginResult<Self> {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> PluginResult<Self> {
        Ok(Self {
            engine: create_engine(&config)?,
            config,
            callbacks: Callbacks::new(),
            plugins: HashMap::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Adds a callback available to every plugin registered afterwards.
    ///
    /// A per-plugin callback under the same `(namespace, name)` takes precedence.
    pub fn add_callback(
        &mut self,
        namespace: &str,
        name: &str,
        callback: Callback,
    ) -> PluginResult<()> {
        self.callbacks.add_callback(namespace, name, callback)
    }

    /// Compiles the module at `path`, validates its imports and stores it as `name`.
    ///
    /// Registering an existing name replaces the previous plugin; instances
    /// already created from it keep running the old module.
    pub fn register_plugin<P: AsRef<Path>>(
        &mut self,
        name: &str,
        path: P,
        config: PluginConfig,
    ) -> PluginResult<()> {
        let path = path.as_ref();
        let result = load_wasm_bytes(path, self.config.max_module_size())
            .and_then(|bytes| self.register(name, &path.display().to_string(), &bytes, config));

        if let Err(error) = &result {
            tracing::error!("{}", PluginRegistrationFailed { plugin: name, error });
        }
        result
    }

    /// Same as [`register_plugin`](Self::register_plugin) for module bytes already in memory.
    pub fn register_plugin_bytes(
        &mut self,
        name: &str,
        bytes: &[u8],
        config: PluginConfig,
    ) -> PluginResult<()> {
        let result = self.register(name, name, bytes, config);

        if let Err(error) = &result {
            tracing::error!("{}", PluginRegistrationFailed { plugin: name, error });
        }
        result
    }

    fn register(
        &mut self,
        name: &str,
        module_path: &str,
        bytes: &[u8],
        config: PluginConfig,
    ) -> PluginResult<()> {
        ensure_core_module(module_path, bytes)?;

        let module = Module::new(&self.engine, bytes).map_err(|e| PluginError::Compilation {
            path: module_path.to_string(),
            reason: format!("{e:#}"),
        })?;

        let imports = validate_imports(&module, &config.callbacks, &self.callbacks)?;

        let plugin = Plugin {
            name: name.to_string(),
            module,
            config,
            imports,
        };

        tracing::info!(
            "{}",
            PluginRegistered {
                plugin: name,
                import_count: plugin.imports.len(),
                callback_count: plugin.config.callbacks.len(),
                replaced: self.plugins.contains_key(name),
            }
        );

        self.plugins.insert(name.to_string(), plugin);
        Ok(())
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn plugin(&self, name: &str) -> Option<&Plugin> {
        self.plugins.get(name)
    }

    /// Registered plugin names, sorted.
    pub fn plugin_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Creates a new, isolated instance of plugin `name`.
    ///
    /// `workspace`, when given, is mounted at `/workspace` inside the guest.
    /// The directory belongs to the caller and is left in place on removal.
    pub fn get_instance(&self, name: &str, workspace: Option<&Path>) -> PluginResult<Instance> {
        let plugin = self
            .plugins
            .get(name)
            .ok_or_else(|| PluginError::PluginNotFound(name.to_string()))?;

        let wasi = build_wasi_ctx(&plugin.config, workspace)?;
        let mut store = Store::new(&self.engine, InstanceState::new(name, wasi));
        log_state(name, InstanceStatus::Created);

        let linker = self.build_linker(plugin)?;
        log_state(name, InstanceStatus::Bound);

        let fuel = self.config.fuel_per_call();
        if let Some(fuel) = fuel {
            store
                .set_fuel(fuel)
                .map_err(|e| PluginError::Engine(format!("{e:#}")))?;
        }

        let handle = linker
            .instantiate(&mut store, &plugin.module)
            .map_err(|e| PluginError::Instantiation {
                plugin: name.to_string(),
                reason: format!("{e:#}"),
            })?;
        store.data_mut().handle = Some(handle);

        // An error the start function raised has no call to report it, so it fails creation
        if let Some(message) = store.data_mut().pending_error.take() {
            return Err(PluginError::GuestRaised(message));
        }
        log_state(name, InstanceStatus::Instantiated);

        let workspace = workspace.map(|dir| dir.display().to_string());
        tracing::info!(
            "{}",
            InstanceCreated {
                plugin: name,
                workspace: workspace.as_deref(),
                fuel_per_call: fuel,
            }
        );

        Ok(Instance::new(name, store, fuel))
    }

    /// Import table for one instance, lowest precedence first: the system
    /// shim, default imports, engine callbacks, plugin callbacks. Later
    /// definitions shadow earlier ones.
    fn build_linker(&self, plugin: &Plugin) -> PluginResult<Linker<InstanceState>> {
        let mut linker = Linker::new(&self.engine);
        linker.allow_shadowing(true);

        wasmtime_wasi::p1::add_to_linker_sync(&mut linker, |state: &mut InstanceState| {
            &mut state.wasi
        })
        .map_err(|e| PluginError::Wasi(format!("{e:#}")))?;

        define_defaults(&mut linker)?;

        for (namespace, name, callback) in self.callbacks.iter() {
            define_callback(&mut linker, namespace, name, callback)?;
        }
        for (namespace, name, callback) in plugin.config.callbacks.iter() {
            define_callback(&mut linker, namespace, name, callback)?;
        }

        // Whatever is left can only be a `wasi_unstable` function other than fd_write
        linker
            .define_unknown_imports_as_traps(&plugin.module)
            .map_err(|e| PluginError::Engine(format!("{e:#}")))?;

        Ok(linker)
    }
}

fn log_state(plugin: &str, status: InstanceStatus) {
    tracing::debug!(
        "{}",
        InstanceStateChanged {
            plugin,
            state: &status.to_string(),
        }
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const EMPTY_MODULE: &str = r#"(module (memory (export "memory") 1))"#;

    #[test]
    fn test_register_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&wat::parse_str(EMPTY_MODULE).unwrap())
            .unwrap();

        let mut engine = PluginEngine::new().unwrap();
        engine
            .register_plugin("empty", file.path(), PluginConfig::default())
            .unwrap();

        assert!(engine.has_plugin("empty"));
        assert_eq!(engine.plugin_names(), vec!["empty"]);
    }

    #[test]
    fn test_malformed_bytecode_fails_registration() {
        let mut engine = PluginEngine::new().unwrap();
        let result = engine.register_plugin_bytes("bad", b"\0asm\x01\0\0\0\xff", PluginConfig::default());

        assert!(matches!(result, Err(PluginError::Compilation { .. })));
        assert!(!engine.has_plugin("bad"));
    }

    #[test]
    fn test_module_size_limit_comes_from_config() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&wat::parse_str(EMPTY_MODULE).unwrap())
            .unwrap();

        let mut engine = PluginEngine::with_config(EngineConfig {
            fuel: None,
            max_module_size: Some(8),
        })
        .unwrap();
        let result = engine.register_plugin("empty", file.path(), PluginConfig::default());

        assert!(matches!(result, Err(PluginError::ModuleTooLarge { max: 8, .. })));
    }

    #[test]
    fn test_unknown_plugin() {
        let engine = PluginEngine::new().unwrap();
        let result = engine.get_instance("nope", None);
        assert!(matches!(result, Err(PluginError::PluginNotFound(name)) if name == "nope"));
    }

    #[test]
    fn test_reregistration_replaces_plugin() {
        let mut engine = PluginEngine::new().unwrap();
        let first = wat::parse_str(EMPTY_MODULE).unwrap();
        let second = wat::parse_str(r#"(module (memory (export "memory") 2))"#).unwrap();

        engine
            .register_plugin_bytes("p", &first, PluginConfig::default())
            .unwrap();
        engine
            .register_plugin_bytes("p", &second, PluginConfig::default())
            .unwrap();

        assert_eq!(engine.plugin_names(), vec!["p"]);
        let mut instance = engine.get_instance("p", None).unwrap();
        let size = instance.with_context(|ctx| crate::abi::GuestMemory::size(ctx));
        assert_eq!(size.unwrap(), 2 * 64 * 1024);
    }

    #[test]
    fn test_engine_with_fuel_builds_instances() {
        let mut engine = PluginEngine::with_config(EngineConfig {
            fuel: Some(5_000_000),
            max_module_size: None,
        })
        .unwrap();
        engine
            .register_plugin_bytes(
                "p",
                &wat::parse_str(EMPTY_MODULE).unwrap(),
                PluginConfig::default(),
            )
            .unwrap();

        let instance = engine.get_instance("p", None).unwrap();
        assert_eq!(instance.status(), InstanceStatus::Instantiated);
    }
}
