// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod defaults;
pub mod imports;
pub mod loader;
mod registry;
pub mod wasi;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use imports::{ImportSource, ModuleImport};
pub use registry::{create_engine, Plugin, PluginEngine};
