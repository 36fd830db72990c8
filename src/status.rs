//! The shared "lease good" board.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::lease::{Handle, StatusIndicator};

/// Per-lease "lease good" flags, readable from any thread.
///
/// Clones share the same board. The lock is held only for a single read or update.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    flags: Arc<Mutex<BTreeMap<Handle, bool>>>,
}

impl StatusBoard {
    pub fn new() -> StatusBoard {
        StatusBoard::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<Handle, bool>> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the flag of a discarded lease.
    pub fn forget(&self, lease: Handle) {
        self.lock().remove(&lease);
    }
}

impl StatusIndicator for StatusBoard {
    fn set_lease_good(&self, lease: Handle, good: bool) {
        self.lock().insert(lease, good);
    }

    fn is_lease_good(&self, lease: Handle) -> bool {
        self.lock().get(&lease).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_flags() {
        let board = StatusBoard::new();
        let reader = board.clone();
        let lease = Handle::new(0);

        assert!(!reader.is_lease_good(lease));
        board.set_lease_good(lease, true);
        assert!(reader.is_lease_good(lease));
        assert!(!reader.is_lease_good(Handle::new(1)));
        board.forget(lease);
        assert!(!reader.is_lease_good(lease));
    }
}
