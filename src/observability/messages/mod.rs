// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements the `Display` trait to provide consistent,
//! human-readable output.
//!
//! # Organization
//!
//! * `engine` - Module loading, plugin registration and instance lifecycle events
//! * `call` - Exported calls, callbacks, guest output and memory cleanup events
//!
//! # Usage Pattern
//!
//! ```rust
//! use wasp::observability::messages::engine::InstanceRemoved;
//!
//! let msg = InstanceRemoved { plugin: "demo" };
//!
//! tracing::info!("{}", msg);
//! ```

pub mod call;
pub mod engine;
