// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use wasp::abi::{HostValue, ValueKind};
use wasp::callbacks::Callback;
use wasp::config::{load_config, PluginConfig};
use wasp::engine::PluginEngine;
use wasp::instance::Instance;

const DEMO_PLUGIN: &str = "demo";

/// Exported functions the demo calls on every plugin.
fn demo_calls() -> Vec<(&'static str, ValueKind, Vec<HostValue>)> {
    vec![
        ("sum", ValueKind::Int32, vec![HostValue::from(3), HostValue::from(2)]),
        ("hello", ValueKind::String, vec![HostValue::from("Nic")]),
        ("reverse", ValueKind::Bytes, vec![HostValue::from(vec![1u8, 2, 3])]),
        ("callback", ValueKind::String, vec![]),
    ]
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Host function bound to `env.call_me` in the demo plugin.
fn greeter() -> Callback {
    Callback::builder()
        .param(ValueKind::String)
        .result(ValueKind::String)
        .build(|args| {
            let name = args
                .first()
                .and_then(HostValue::as_str)
                .unwrap_or_default();
            Ok(vec![HostValue::from(format!("Hello {name}"))])
        })
}

fn is_config_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "toml")
    )
}

fn build_engine(target: &Path) -> Result<PluginEngine, String> {
    if !is_config_file(target) {
        let mut engine = PluginEngine::new().map_err(|e| e.to_string())?;
        engine
            .add_callback("env", "call_me", greeter())
            .map_err(|e| e.to_string())?;
        engine
            .register_plugin(DEMO_PLUGIN, target, PluginConfig::default())
            .map_err(|e| e.to_string())?;
        return Ok(engine);
    }

    let config = load_config(target).map_err(|e| e.to_string())?;
    let base_dir = target.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut engine = PluginEngine::with_config(config.engine).map_err(|e| e.to_string())?;
    engine
        .add_callback("env", "call_me", greeter())
        .map_err(|e| e.to_string())?;

    for entry in &config.plugins {
        let module: PathBuf = base_dir.join(&entry.module);
        engine
            .register_plugin(&entry.name, &module, entry.plugin_config())
            .map_err(|e| format!("plugin '{}': {}", entry.name, e))?;
    }
    Ok(engine)
}

/// Runs every demo call and returns how many failed.
fn run_calls(instance: &mut Instance) -> usize {
    let mut failures = 0;
    for (function, output, inputs) in demo_calls() {
        let start = Instant::now();
        match instance.call_function(function, output, &inputs) {
            Ok(value) => println!(
                "  ✅ {}({:?}) -> {:?} ({:.2?})",
                function,
                inputs,
                value,
                start.elapsed()
            ),
            Err(e) => {
                println!("  ❌ {}({:?}) failed: {}", function, inputs, e);
                failures += 1;
            }
        }
    }
    failures
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let verbose = args.iter().skip(1).any(|a| a == "-v" || a == "--verbose");
    let targets: Vec<&String> = args
        .iter()
        .skip(1)
        .filter(|a| *a != "-v" && *a != "--verbose")
        .collect();

    if targets.len() != 1 {
        eprintln!("Usage: {} [-v] <module.wasm | host-config.yaml>", args[0]);
        eprintln!("Example: {} wasm_modules/demo_plugin.wasm", args[0]);
        eprintln!("Example: {} -v configs/demo.yaml", args[0]);
        std::process::exit(1);
    }

    init_tracing(verbose);

    let target = Path::new(targets[0].as_str());
    let engine = match build_engine(target) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {}", target.display(), e);
            std::process::exit(1);
        }
    };

    println!("🚀 wasp plugin host");
    println!("═══════════════════");

    let mut failures = 0;
    for name in engine.plugin_names() {
        println!("\n🧩 Plugin: {}", name);
        let mut instance = match engine.get_instance(name, None) {
            Ok(instance) => instance,
            Err(e) => {
                println!("  ❌ instantiation failed: {}", e);
                failures += 1;
                continue;
            }
        };

        failures += run_calls(&mut instance);

        if let Err(e) = instance.remove() {
            println!("  ⚠️ remove failed: {}", e);
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
    println!("\n🎉 Done!");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_calls_are_counted() {
        let wat = r#"(module
            (memory (export "memory") 1)
            (func (export "sum") (param i32 i32) (result i32)
              (i32.add (local.get 0) (local.get 1))))"#;

        let mut engine = PluginEngine::new().unwrap();
        engine
            .register_plugin_bytes("partial", &wat::parse_str(wat).unwrap(), PluginConfig::default())
            .unwrap();
        let mut instance = engine.get_instance("partial", None).unwrap();

        // only sum succeeds; hello, reverse and callback are not exported
        assert_eq!(run_calls(&mut instance), 3);
    }
}
