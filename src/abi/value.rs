// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Host-native values exchanged with guest functions.

use std::fmt;

/// Kind tag for a host value crossing the boundary.
///
/// Numeric kinds map directly onto WebAssembly value types. `String` and
/// `Bytes` are passed to the guest as an `i32` address into linear memory.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Bytes,
}

impl ValueKind {
    /// Kinds a callback may take or return.
    #[inline]
    pub fn is_callback_kind(self) -> bool {
        matches!(self, Self::Int32 | Self::String)
    }

    /// Kinds an exported function call can decode its result into.
    #[inline]
    pub fn is_output_kind(self) -> bool {
        matches!(self, Self::Int32 | Self::String | Self::Bytes)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Int32 => "Int32",
            ValueKind::Int64 => "Int64",
            ValueKind::Float32 => "Float32",
            ValueKind::Float64 => "Float64",
            ValueKind::String => "String",
            ValueKind::Bytes => "Bytes",
        };
        f.write_str(name)
    }
}

/// A value on the host side of a call.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl HostValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            HostValue::I32(_) => ValueKind::Int32,
            HostValue::I64(_) => ValueKind::Int64,
            HostValue::F32(_) => ValueKind::Float32,
            HostValue::F64(_) => ValueKind::Float64,
            HostValue::String(_) => ValueKind::String,
            HostValue::Bytes(_) => ValueKind::Bytes,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            HostValue::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            HostValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl From<i32> for HostValue {
    fn from(v: i32) -> Self {
        HostValue::I32(v)
    }
}

impl From<i64> for HostValue {
    fn from(v: i64) -> Self {
        HostValue::I64(v)
    }
}

impl From<f32> for HostValue {
    fn from(v: f32) -> Self {
        HostValue::F32(v)
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        HostValue::F64(v)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::String(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::String(s)
    }
}

impl From<Vec<u8>> for HostValue {
    fn from(b: Vec<u8>) -> Self {
        HostValue::Bytes(b)
    }
}

impl From<&[u8]> for HostValue {
    fn from(b: &[u8]) -> Self {
        HostValue::Bytes(b.to_vec())
    }
}

/// Output slot for [`Instance::call_into`](crate::instance::Instance::call_into).
///
/// The slot's type selects how the guest's return value is decoded.
pub trait FromHostValue: Sized {
    const KIND: ValueKind;

    fn from_host_value(value: HostValue) -> Option<Self>;
}

impl FromHostValue for i32 {
    const KIND: ValueKind = ValueKind::Int32;

    fn from_host_value(value: HostValue) -> Option<Self> {
        value.as_i32()
    }
}

impl FromHostValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn from_host_value(value: HostValue) -> Option<Self> {
        match value {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl FromHostValue for Vec<u8> {
    const KIND: ValueKind = ValueKind::Bytes;

    fn from_host_value(value: HostValue) -> Option<Self> {
        match value {
            HostValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}
