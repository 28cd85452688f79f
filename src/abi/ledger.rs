// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Allocation ledger: guest memory the host is responsible for releasing.
//!
//! The ledger is a stack of scopes. A scope is opened at every call boundary
//! (an exported function call from the host, or a callback invocation from the
//! guest) and swept when that boundary is left, success or failure. Callbacks
//! run nested inside an exported call, so the stack depth mirrors the
//! host/guest re-entrancy depth.
//!
//! Within a scope the ledger is a mapping from address to length: registering
//! an address twice keeps a single entry with the larger length, so memory is
//! never released twice and never released short of what was allocated.

/// Stack of per-call allocation scopes.
#[derive(Debug, Default)]
pub struct AllocationLedger {
    scopes: Vec<Vec<(i32, i32)>>,
}

impl AllocationLedger {
    pub fn open_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Records `(addr, size)` in the innermost scope, merging with any entry for `addr`.
    ///
    /// Registration outside any call boundary opens a scope so the entry is
    /// still swept by the next `close_scope`.
    pub fn register(&mut self, addr: i32, size: i32) {
        if self.scopes.is_empty() {
            self.open_scope();
        }
        if let Some(scope) = self.scopes.last_mut() {
            insert(scope, addr, size);
        }
    }

    /// Moves `addr` from the innermost scope to its parent.
    ///
    /// Used for values handed to the guest as callback results: they must
    /// outlive the callback and are released when the enclosing call ends.
    /// Returns `false` when there is no parent scope, leaving the entry in place.
    pub fn promote(&mut self, addr: i32) -> bool {
        let depth = self.scopes.len();
        if depth < 2 {
            return false;
        }

        let inner = &mut self.scopes[depth - 1];
        let Some(pos) = inner.iter().position(|(a, _)| *a == addr) else {
            return false;
        };
        let (addr, size) = inner.remove(pos);
        insert(&mut self.scopes[depth - 2], addr, size);
        true
    }

    /// Drops `addr` from the innermost scope without releasing it; the guest owns it now.
    pub fn forget(&mut self, addr: i32) -> bool {
        let Some(scope) = self.scopes.last_mut() else {
            return false;
        };
        let before = scope.len();
        scope.retain(|(a, _)| *a != addr);
        scope.len() != before
    }

    /// Pops the innermost scope and returns its entries for deallocation.
    pub fn close_scope(&mut self) -> Vec<(i32, i32)> {
        self.scopes.pop().unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Number of outstanding allocations across all scopes.
    pub fn len(&self) -> usize {
        self.scopes.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn insert(scope: &mut Vec<(i32, i32)>, addr: i32, size: i32) {
    match scope.iter_mut().find(|(a, _)| *a == addr) {
        Some(entry) => entry.1 = entry.1.max(size),
        None => scope.push((addr, size)),
    }
}
