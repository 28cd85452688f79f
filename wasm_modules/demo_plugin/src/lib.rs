// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Guest plugin exercising the wasp host ABI.
//!
//! Build with `cargo build --release --target wasm32-unknown-unknown` (or
//! `wasm32-wasip1`) and pass the resulting `.wasm` to the `wasp` binary.
//!
//! Strings cross the boundary NUL-terminated; byte arrays carry a 4-byte
//! little-endian length prefix.
//!
//! Ownership: every pointer passed to a host import, or returned from an
//! export, must come from [`allocate`]. The host releases it with
//! [`deallocate`] once it has read the value, so static data is always copied
//! to the heap first.

use std::alloc::{alloc, dealloc, Layout};
use std::ffi::CStr;
use std::os::raw::c_char;

/// Every block starts with its own size so `deallocate` does not depend on
/// the size the host passes back.
const HEADER: usize = 8;

#[link(wasm_import_module = "env")]
extern "C" {
    fn call_me(name: *const c_char) -> *const c_char;
    fn raise_error(message: *const c_char);
}

fn layout(size: usize) -> Layout {
    // HEADER keeps the user pointer 8-byte aligned
    unsafe { Layout::from_size_align_unchecked(size + HEADER, HEADER) }
}

#[no_mangle]
pub extern "C" fn allocate(size: i32) -> *mut u8 {
    if size < 0 {
        return std::ptr::null_mut();
    }
    let size = size as usize;
    unsafe {
        let block = alloc(layout(size));
        if block.is_null() {
            return block;
        }
        (block as *mut usize).write(size);
        block.add(HEADER)
    }
}

/// # Safety
///
/// `ptr` must come from [`allocate`] and not have been released already.
#[no_mangle]
pub unsafe extern "C" fn deallocate(ptr: *mut u8, _size: i32) {
    if ptr.is_null() {
        return;
    }
    let block = ptr.sub(HEADER);
    let size = (block as *const usize).read();
    dealloc(block, layout(size));
}

/// # Safety
///
/// `ptr` must point at a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn get_string_size(ptr: *const c_char) -> i32 {
    CStr::from_ptr(ptr).to_bytes().len() as i32
}

fn leak_string(value: &str) -> *mut u8 {
    let ptr = allocate(value.len() as i32 + 1);
    if !ptr.is_null() {
        unsafe {
            std::ptr::copy_nonoverlapping(value.as_ptr(), ptr, value.len());
            ptr.add(value.len()).write(0);
        }
    }
    ptr
}

fn leak_bytes(value: &[u8]) -> *mut u8 {
    let ptr = allocate(value.len() as i32 + 4);
    if !ptr.is_null() {
        unsafe {
            std::ptr::copy_nonoverlapping((value.len() as u32).to_le_bytes().as_ptr(), ptr, 4);
            std::ptr::copy_nonoverlapping(value.as_ptr(), ptr.add(4), value.len());
        }
    }
    ptr
}

#[no_mangle]
pub extern "C" fn sum(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

/// # Safety
///
/// `name` must point at a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn hello(name: *const c_char) -> *mut u8 {
    let name = CStr::from_ptr(name).to_string_lossy();
    leak_string(&format!("Hello {name}"))
}

/// # Safety
///
/// `input` must point at a length-prefixed byte array.
#[no_mangle]
pub unsafe extern "C" fn reverse(input: *const u8) -> *mut u8 {
    let mut len = [0u8; 4];
    std::ptr::copy_nonoverlapping(input, len.as_mut_ptr(), 4);
    let data = std::slice::from_raw_parts(input.add(4), u32::from_le_bytes(len) as usize);

    let mut reversed = data.to_vec();
    reversed.reverse();
    leak_bytes(&reversed)
}

/// Asks the host to greet "World" and hands the host's string straight back.
#[no_mangle]
pub extern "C" fn callback() -> *const c_char {
    let name = leak_string("World");
    unsafe { call_me(name as *const c_char) }
}

#[no_mangle]
pub extern "C" fn divide(a: i32, b: i32) -> i32 {
    if b == 0 {
        let message = leak_string("division by zero");
        unsafe { raise_error(message as *const c_char) };
        return 0;
    }
    a.wrapping_div(b)
}
