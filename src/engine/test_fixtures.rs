// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Guest modules shared by the unit and integration tests.
//!
//! The allocator is a bump allocator starting at 1024, aligned to 8. It never
//! reuses memory but counts live allocations in the exported global
//! `live_allocations`, so tests can check that every allocation was released.

use crate::config::PluginConfig;
use crate::engine::PluginEngine;
use crate::instance::Instance;
use wasmtime::AsContextMut;

macro_rules! abi_functions {
    () => {
        r#"
  (memory (export "memory") 1)
  (global $heap (mut i32) (i32.const 1024))
  (global $live (export "live_allocations") (mut i32) (i32.const 0))

  (data (i32.const 16) "Hello \00")
  (data (i32.const 32) "World\00")
  (data (i32.const 48) "invalid input\00")

  (func $allocate (export "allocate") (param $size i32) (result i32)
    (local $addr i32)
    (local.set $addr (global.get $heap))
    (global.set $heap
      (i32.and
        (i32.add (i32.add (global.get $heap) (local.get $size)) (i32.const 7))
        (i32.const -8)))
    (global.set $live (i32.add (global.get $live) (i32.const 1)))
    (local.get $addr))

  (func $deallocate (export "deallocate") (param i32 i32)
    (global.set $live (i32.sub (global.get $live) (i32.const 1))))

  (func $strlen (export "get_string_size") (param $addr i32) (result i32)
    (local $len i32)
    (block $done
      (loop $scan
        (br_if $done
          (i32.eqz (i32.load8_u (i32.add (local.get $addr) (local.get $len)))))
        (local.set $len (i32.add (local.get $len) (i32.const 1)))
        (br $scan)))
    (local.get $len))

  (func (export "sum") (param i32 i32) (result i32)
    (i32.add (local.get 0) (local.get 1)))

  (func (export "hello") (param $name i32) (result i32)
    (local $len i32)
    (local $out i32)
    (local.set $len (call $strlen (local.get $name)))
    (local.set $out (call $allocate (i32.add (local.get $len) (i32.const 7))))
    (memory.copy (local.get $out) (i32.const 16) (i32.const 6))
    (memory.copy
      (i32.add (local.get $out) (i32.const 6))
      (local.get $name)
      (i32.add (local.get $len) (i32.const 1)))
    (local.get $out))

  (func (export "reverse") (param $in i32) (result i32)
    (local $len i32)
    (local $out i32)
    (local $i i32)
    (local.set $len (i32.load (local.get $in)))
    (local.set $out (call $allocate (i32.add (local.get $len) (i32.const 4))))
    (i32.store (local.get $out) (local.get $len))
    (block $done
      (loop $copy
        (br_if $done (i32.ge_u (local.get $i) (local.get $len)))
        (i32.store8
          (i32.add (i32.add (local.get $out) (i32.const 4)) (local.get $i))
          (i32.load8_u
            (i32.add
              (i32.add (local.get $in) (i32.const 3))
              (i32.sub (local.get $len) (local.get $i)))))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $copy)))
    (local.get $out))

  (func (export "wide") (param i64 f64) (result i32)
    (i32.add
      (i32.wrap_i64 (local.get 0))
      (i32.trunc_f64_s (local.get 1))))

  (func (export "explode") (result i32)
    unreachable)

  (func (export "spin") (result i32)
    (loop $forever (br $forever))
    (i32.const 0))

  (func (export "nothing"))
"#
    };
}

/// ABI exports plus `sum`, `hello`, `reverse` and a few misbehaving exports.
pub const ABI_MODULE_WAT: &str = concat!("(module", abi_functions!(), ")");

/// [`ABI_MODULE_WAT`] plus exports that call back into the host.
///
/// * `callback() -> string` copies "World" into a fresh allocation and
///   returns whatever `env.call_me` makes of it
/// * `fail(code) -> i32` reports "invalid input" through `env.raise_error`
///   and returns `code`
/// * `shout(s) -> i32` writes `s` to stdout via `fd_write`
pub const DEMO_MODULE_WAT: &str = concat!(
    "(module\n",
    r#"
  (import "env" "call_me" (func $call_me (param i32) (result i32)))
  (import "env" "raise_error" (func $raise_error (param i32)))
  (import "wasi_snapshot_preview1" "fd_write"
    (func $fd_write (param i32 i32 i32 i32) (result i32)))
"#,
    abi_functions!(),
    r#"
  (func (export "callback") (result i32)
    (local $arg i32)
    (local.set $arg (call $allocate (i32.const 6)))
    (memory.copy (local.get $arg) (i32.const 32) (i32.const 6))
    (call $call_me (local.get $arg)))

  (func (export "fail") (param $code i32) (result i32)
    (local $msg i32)
    (local.set $msg (call $allocate (i32.const 14)))
    (memory.copy (local.get $msg) (i32.const 48) (i32.const 14))
    (call $raise_error (local.get $msg))
    (local.get $code))

  (func (export "shout") (param $s i32) (result i32)
    ;; iovec at 128: { buf = $s, buf_len = strlen($s) }, nwritten at 136
    (i32.store (i32.const 128) (local.get $s))
    (i32.store (i32.const 132) (call $strlen (local.get $s)))
    (drop (call $fd_write (i32.const 1) (i32.const 128) (i32.const 1) (i32.const 136)))
    (i32.load (i32.const 136)))

  (func (export "write_file") (result i32)
    (call $fd_write (i32.const 5) (i32.const 128) (i32.const 0) (i32.const 136)))
)"#
);

/// Registers `wat` as plugin "fixture" on a fresh engine and instantiates it.
pub fn instance_from_wat(wat: &str) -> Instance {
    let mut engine = PluginEngine::new().unwrap();
    engine
        .register_plugin_bytes(
            "fixture",
            &wat::parse_str(wat).unwrap(),
            PluginConfig::default(),
        )
        .unwrap();
    engine.get_instance("fixture", None).unwrap()
}

/// Value of the guest's `live_allocations` counter.
pub fn live_allocations(instance: &mut Instance) -> i32 {
    exported_global(instance, "live_allocations")
}

/// Value of the exported i32 global `name`.
pub fn exported_global(instance: &mut Instance, name: &str) -> i32 {
    instance.with_context(|ctx| {
        let handle = ctx.data().handle.unwrap();
        let global = handle.get_global(ctx.as_context_mut(), name).unwrap();
        global.get(ctx.as_context_mut()).i32().unwrap()
    })
}
