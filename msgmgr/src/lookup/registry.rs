// Layer 1: Standard library imports
use std::collections::HashSet;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use crate::address::MailboxAddress;

/// Set of remote-type mailbox addresses known to exist anywhere in the
/// fleet: both locally-owned ones and those learned through discovery.
///
/// Set semantics make remote updates idempotent; duplicate inserts and
/// misses are reported to the caller rather than logged here. Snapshot
/// reads take the lock for the full iteration.
#[derive(Debug, Default)]
pub struct NonProxyRegistry {
    inner: Mutex<HashSet<MailboxAddress>>,
}

impl NonProxyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an address; false when it was already present.
    pub fn insert(&self, address: MailboxAddress) -> bool {
        self.inner.lock().insert(address)
    }

    /// Remove an address; false when it was not present.
    pub fn remove(&self, address: &MailboxAddress) -> bool {
        self.inner.lock().remove(address)
    }

    pub fn contains(&self, address: &MailboxAddress) -> bool {
        self.inner.lock().contains(address)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// All registered addresses matching `criteria` (see
    /// [`MailboxAddress::matches`]).
    pub fn snapshot_matching(&self, criteria: &MailboxAddress) -> Vec<MailboxAddress> {
        self.inner
            .lock()
            .iter()
            .filter(|candidate| MailboxAddress::matches(criteria, candidate))
            .cloned()
            .collect()
    }

    /// All registered addresses, sorted by ordering key. Listing aid.
    pub fn sorted(&self) -> Vec<MailboxAddress> {
        let mut addresses: Vec<MailboxAddress> = self.inner.lock().iter().cloned().collect();
        addresses.sort_by_key(MailboxAddress::ordering_key);
        addresses
    }
}
