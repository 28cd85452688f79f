// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging.
//!
//! Log lines are built from message structs with a `Display` implementation
//! instead of format strings scattered through the engine:
//!
//! * `messages::engine` - registration and instance lifecycle
//! * `messages::call` - calls across the host/guest boundary
//!
//! # Usage
//!
//! ```rust
//! use wasp::observability::messages::call::CallStarted;
//!
//! let msg = CallStarted {
//!     plugin: "demo",
//!     function: "sum",
//!     input_count: 2,
//! };
//!
//! tracing::debug!("{}", msg);
//! ```

pub mod messages;
