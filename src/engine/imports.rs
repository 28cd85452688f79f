// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Import validation at registration time.
//!
//! Every import a module declares must be satisfied before the plugin is
//! accepted, so a missing callback fails `register_plugin` instead of a later
//! call. An import is satisfied by, in order of precedence:
//!
//! 1. a per-plugin callback
//! 2. an engine-wide callback
//! 3. a default import (`env.abort`, `env.raise_error`)
//! 4. the system shim, for any namespace starting with `wasi`

use crate::callbacks::{signature, Callback, Callbacks};
use crate::config::consts::WASI_NAMESPACE_PREFIX;
use crate::engine::defaults::is_default_import;
use crate::errors::{PluginError, PluginResult};
use std::fmt;
use wasmtime::{ExternType, FuncType, Module, ValType};

/// How an import will be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportSource {
    Wasi,
    Default,
    PluginCallback,
    EngineCallback,
}

impl fmt::Display for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportSource::Wasi => "wasi",
            ImportSource::Default => "default",
            ImportSource::PluginCallback => "plugin callback",
            ImportSource::EngineCallback => "engine callback",
        };
        f.write_str(name)
    }
}

/// One import declared by a module, with its resolved source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImport {
    pub namespace: String,
    pub name: String,
    pub source: ImportSource,
}

/// Resolves every import `module` declares, failing on the first one nothing satisfies.
pub fn validate_imports(
    module: &Module,
    plugin_callbacks: &Callbacks,
    engine_callbacks: &Callbacks,
) -> PluginResult<Vec<ModuleImport>> {
    module
        .imports()
        .map(|import| {
            let namespace = import.module();
            let name = import.name();

            let callback = plugin_callbacks
                .get(namespace, name)
                .map(|cb| (cb, ImportSource::PluginCallback))
                .or_else(|| {
                    engine_callbacks
                        .get(namespace, name)
                        .map(|cb| (cb, ImportSource::EngineCallback))
                });

            let source = match callback {
                Some((callback, source)) => {
                    check_signature(namespace, name, &import.ty(), callback)?;
                    source
                }
                None if namespace.starts_with(WASI_NAMESPACE_PREFIX) => ImportSource::Wasi,
                None if is_default_import(namespace, name) => ImportSource::Default,
                None => {
                    return Err(PluginError::ImportNotFound {
                        name: name.to_string(),
                        namespace: namespace.to_string(),
                    })
                }
            };

            Ok(ModuleImport {
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            })
        })
        .collect()
}

fn check_signature(
    namespace: &str,
    name: &str,
    declared: &ExternType,
    callback: &Callback,
) -> PluginResult<()> {
    let mismatch = |expected: String| PluginError::ImportSignature {
        namespace: namespace.to_string(),
        name: name.to_string(),
        expected,
        actual: callback.guest_signature(),
    };

    let ExternType::Func(func_type) = declared else {
        return Err(mismatch(format!("a non-function import ({declared:?})")));
    };

    let all_i32 = func_type
        .params()
        .chain(func_type.results())
        .all(|ty| matches!(ty, ValType::I32));
    if !all_i32 {
        return Err(mismatch(describe(func_type)));
    }

    // The guest has one return slot per declared result
    if func_type.results().len() != callback.results().len() {
        return Err(PluginError::CallbackArity {
            namespace: namespace.to_string(),
            name: name.to_string(),
            expected: func_type.results().len(),
            actual: callback.results().len(),
        });
    }

    if func_type.params().len() != callback.params().len() {
        return Err(mismatch(describe(func_type)));
    }
    Ok(())
}

fn describe(func_type: &FuncType) -> String {
    if func_type
        .params()
        .chain(func_type.results())
        .all(|ty| matches!(ty, ValType::I32))
    {
        return signature(func_type.params().len(), func_type.results().len());
    }

    let list = |types: Vec<String>| types.join(", ");
    format!(
        "({}) -> ({})",
        list(func_type.params().map(|ty| ty.to_string()).collect()),
        list(func_type.results().map(|ty| ty.to_string()).collect())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{HostValue, ValueKind};
    use wasmtime::Engine;

    fn module(wat: &str) -> (Engine, Module) {
        let engine = Engine::default();
        let module = Module::new(&engine, wat::parse_str(wat).unwrap()).unwrap();
        (engine, module)
    }

    fn string_to_string() -> Callback {
        Callback::builder()
            .param(ValueKind::String)
            .result(ValueKind::String)
            .build(|args| Ok(args.to_vec()))
    }

    const IMPORTS_FNX: &str = r#"(module
        (import "nsA" "fnX" (func (param i32) (result i32)))
        (import "env" "abort" (func (param i32 i32 i32 i32)))
        (import "wasi_snapshot_preview1" "proc_exit" (func (param i32))))"#;

    #[test]
    fn test_missing_callback_names_import_and_namespace() {
        let (_engine, module) = module(IMPORTS_FNX);
        let result = validate_imports(&module, &Callbacks::new(), &Callbacks::new());

        match result {
            Err(PluginError::ImportNotFound { name, namespace }) => {
                assert_eq!(name, "fnX");
                assert_eq!(namespace, "nsA");
            }
            other => panic!("Expected ImportNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_callback_satisfies_import() {
        let (_engine, module) = module(IMPORTS_FNX);
        let mut callbacks = Callbacks::new();
        callbacks
            .add_callback("nsA", "fnX", string_to_string())
            .unwrap();

        let imports = validate_imports(&module, &callbacks, &Callbacks::new()).unwrap();
        let sources: Vec<_> = imports.iter().map(|i| i.source).collect();
        assert_eq!(
            sources,
            vec![
                ImportSource::PluginCallback,
                ImportSource::Default,
                ImportSource::Wasi
            ]
        );
    }

    #[test]
    fn test_plugin_callback_shadows_engine_callback() {
        let (_engine, module) = module(IMPORTS_FNX);
        let mut plugin = Callbacks::new();
        plugin.add_callback("nsA", "fnX", string_to_string()).unwrap();
        let mut engine_wide = Callbacks::new();
        engine_wide
            .add_callback("nsA", "fnX", string_to_string())
            .unwrap();

        let imports = validate_imports(&module, &plugin, &engine_wide).unwrap();
        assert_eq!(imports[0].source, ImportSource::PluginCallback);

        let imports = validate_imports(&module, &Callbacks::new(), &engine_wide).unwrap();
        assert_eq!(imports[0].source, ImportSource::EngineCallback);
    }

    #[test]
    fn test_user_callback_wins_over_default_import() {
        let (_engine, module) = module(IMPORTS_FNX);
        let mut callbacks = Callbacks::new();
        callbacks.add_callback("nsA", "fnX", string_to_string()).unwrap();
        callbacks
            .add_callback(
                "env",
                "abort",
                Callback::new(vec![ValueKind::Int32; 4], vec![], |_| Ok(vec![])),
            )
            .unwrap();

        let imports = validate_imports(&module, &callbacks, &Callbacks::new()).unwrap();
        assert_eq!(imports[1].source, ImportSource::PluginCallback);
    }

    #[test]
    fn test_extra_callback_result_is_an_arity_error() {
        let (_engine, module) = module(IMPORTS_FNX);
        let mut callbacks = Callbacks::new();
        let two_results = Callback::new(
            vec![ValueKind::String],
            vec![ValueKind::String, ValueKind::String],
            |_| Ok(vec![HostValue::from("a"), HostValue::from("b")]),
        );
        callbacks.add_callback("nsA", "fnX", two_results).unwrap();

        match validate_imports(&module, &callbacks, &Callbacks::new()) {
            Err(PluginError::CallbackArity {
                namespace,
                name,
                expected,
                actual,
            }) => {
                assert_eq!((namespace.as_str(), name.as_str()), ("nsA", "fnX"));
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected CallbackArity, got {other:?}"),
        }
    }

    #[test]
    fn test_parameter_count_mismatch_is_a_signature_error() {
        let (_engine, module) = module(IMPORTS_FNX);
        let mut callbacks = Callbacks::new();
        let two_params = Callback::new(
            vec![ValueKind::String, ValueKind::Int32],
            vec![ValueKind::String],
            |_| Ok(vec![HostValue::from("a")]),
        );
        callbacks.add_callback("nsA", "fnX", two_params).unwrap();

        match validate_imports(&module, &callbacks, &Callbacks::new()) {
            Err(PluginError::ImportSignature {
                expected, actual, ..
            }) => {
                assert_eq!(expected, "(i32) -> (i32)");
                assert_eq!(actual, "(i32, i32) -> (i32)");
            }
            other => panic!("Expected ImportSignature, got {other:?}"),
        }
    }

    #[test]
    fn test_non_i32_import_type_is_reported() {
        let (_engine, module) =
            module(r#"(module (import "env" "wide" (func (param i64) (result i32))))"#);
        let mut callbacks = Callbacks::new();
        callbacks
            .add_callback(
                "env",
                "wide",
                Callback::new(vec![ValueKind::Int32], vec![ValueKind::Int32], |args| {
                    Ok(args.to_vec())
                }),
            )
            .unwrap();

        match validate_imports(&module, &callbacks, &Callbacks::new()) {
            Err(PluginError::ImportSignature { expected, .. }) => {
                assert_eq!(expected, "(i64) -> (i32)")
            }
            other => panic!("Expected ImportSignature, got {other:?}"),
        }
    }

    #[test]
    fn test_non_function_import_needs_a_provider() {
        let (_engine, module) = module(r#"(module (import "env" "memory" (memory 1)))"#);
        let result = validate_imports(&module, &Callbacks::new(), &Callbacks::new());
        assert!(matches!(
            result,
            Err(PluginError::ImportNotFound { name, .. }) if name == "memory"
        ));
    }
}
