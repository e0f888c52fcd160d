//! Per-entity async locks.
//!
//! Transitions on different copies run in parallel; transitions on the same
//! copy (or hold-count checks for the same member) are serialized. Entries are
//! created on demand and removed when the last holder releases them.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKey {
    /// A member's hold count
    Member(i32),
    /// A Borrowing+Copy pair, keyed by the copy
    Copy(i32, i32),
}

type LockMap = HashMap<LockKey, Arc<AsyncMutex<()>>>;

#[derive(Clone, Default)]
pub struct KeyedLocks {
    map: Arc<Mutex<LockMap>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: LockKey) -> KeyGuard {
        let mutex = self.entries().entry(key).or_default().clone();
        let guard = mutex.lock_owned().await;
        KeyGuard {
            key,
            map: self.map.clone(),
            _guard: guard,
        }
    }

    /// Member first, then copy. Every caller taking both uses this order.
    pub async fn lock_member_and_copy(&self, member_id: i32, book_id: i32, copy_id: i32) -> [KeyGuard; 2] {
        let member = self.lock(LockKey::Member(member_id)).await;
        let copy = self.lock(LockKey::Copy(book_id, copy_id)).await;
        [member, copy]
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, LockMap> {
        self.map.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Held lock; releasing the last guard of a key prunes its entry
pub struct KeyGuard {
    key: LockKey,
    map: Arc<Mutex<LockMap>>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one in our guard: nobody else is waiting
        if map.get(&self.key).is_some_and(|m| Arc::strong_count(m) == 2) {
            map.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_entries_are_pruned() {
        let locks = KeyedLocks::new();
        {
            let _a = locks.lock(LockKey::Copy(1, 1)).await;
            let _b = locks.lock(LockKey::Member(1)).await;
            assert_eq!(locks.len(), 2);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = KeyedLocks::new();
        let guard = locks.lock(LockKey::Copy(1, 1)).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.lock(LockKey::Copy(1, 1)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock(LockKey::Copy(1, 1)).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock(LockKey::Copy(1, 2))).await;
        assert!(b.is_ok());
    }
}
