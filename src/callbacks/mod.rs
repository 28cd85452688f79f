// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Host functions exposed to guests.
//!
//! A [`Callback`] describes a host function by the kinds of its parameters and
//! results; [`Callbacks`] collects them under `(namespace, name)`. The bridge
//! turns each one into a linker import the guest can call with plain `i32`s.

mod bridge;
mod callback;

pub use bridge::define_callback;
pub(crate) use callback::signature;
pub use callback::{Callback, CallbackBuilder, Callbacks, HostFunction};
