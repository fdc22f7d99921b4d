use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

/// Keyed async locks serializing state transitions per entity.
///
/// Keyed by visit, two concurrent check-in attempts on the same visit
/// resolve deterministically: the second waits, re-reads, and observes
/// `AlreadyCheckedIn`. Keyed by visitor, two concurrent check-ins of
/// different visits for the same visitor serialize so the one-active-visit
/// invariant holds. Distinct keys never contend.
pub(super) struct KeyedLocks<K> {
    inner: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Copy> KeyedLocks<K> {
    /// Returns the lock for one key, creating it on first use.
    pub(super) fn for_key(&self, key: K) -> Arc<AsyncMutex<()>> {
        let mut map = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        map.entry(key)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drops the lock entry for a key that is no longer needed.
    pub(super) fn release(&self, key: K) {
        let mut map = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Keep the entry if another task still holds a handle to it.
        if map
            .get(&key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_core::VisitId;

    use super::KeyedLocks;

    #[tokio::test]
    async fn same_key_shares_one_lock() {
        let locks = KeyedLocks::default();
        let visit_id = VisitId::new();

        let first = locks.for_key(visit_id);
        let second = locks.for_key(visit_id);
        assert!(std::sync::Arc::ptr_eq(&first, &second));

        let other = locks.for_key(VisitId::new());
        assert!(!std::sync::Arc::ptr_eq(&first, &other));
    }

    #[tokio::test]
    async fn release_keeps_locks_that_are_still_held() {
        let locks = KeyedLocks::default();
        let visit_id = VisitId::new();

        let held = locks.for_key(visit_id);
        locks.release(visit_id);

        // The held handle kept the entry alive; a re-fetch returns it.
        let refetched = locks.for_key(visit_id);
        assert!(std::sync::Arc::ptr_eq(&held, &refetched));

        drop(held);
        drop(refetched);
        locks.release(visit_id);
    }
}
