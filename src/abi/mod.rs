// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The host/guest calling convention.
//!
//! * `memory` - bounds-checked access to linear memory
//! * `functions` - the guest's allocator exports
//! * `ledger` - per-call record of guest memory the host must release
//! * `codec` - string and byte array wire encodings
//! * `value` - host-native values and kinds

pub mod codec;
mod functions;
mod ledger;
mod memory;
mod value;

pub use functions::AbiFunctions;
pub use ledger::AllocationLedger;
pub use memory::GuestMemory;
pub use value::{FromHostValue, HostValue, ValueKind};
