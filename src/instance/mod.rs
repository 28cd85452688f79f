// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod plugin_instance;
mod state;

pub use plugin_instance::{Instance, InstanceStatus};
pub(crate) use state::{capture_exports, lookup_export};
pub use state::{GuestContext, InstanceState};
