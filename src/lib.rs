// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod abi;          // marshaling codec + guest memory
pub mod callbacks;    // host functions exposed to guests
pub mod config;       // host + plugin configuration
pub mod engine;       // plugin registry and linking
pub mod errors;       // error handling
pub mod instance;     // instance lifecycle
pub mod observability;
