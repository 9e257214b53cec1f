//! Single-slot contact mailbox between the transport and the tick loop.
//!
//! Writers overwrite, the reader takes and clears. The lock is held only for
//! the move in or out, never while a batch is being evaluated.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::slip_friction::ContactBatch;

#[derive(Debug, Clone, Default)]
pub struct ContactMailbox {
    slot: Arc<Mutex<Option<ContactBatch>>>,
}

impl ContactMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written Option.
    fn lock(&self) -> MutexGuard<'_, Option<ContactBatch>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `batch`, replacing any batch not yet taken.
    /// Returns true if an unread batch was dropped.
    pub fn post(&self, batch: ContactBatch) -> bool {
        self.lock().replace(batch).is_some()
    }

    /// Take the held batch, leaving the slot empty.
    pub fn take(&self) -> Option<ContactBatch> {
        self.lock().take()
    }

    pub fn has_batch(&self) -> bool {
        self.lock().is_some()
    }
}
