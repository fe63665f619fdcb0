use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per key, created on first use and pruned once idle.
///
/// Services hold the guard for a whole check-then-act sequence so two
/// requests for the same student (or teacher) cannot both pass a check
/// before either writes.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Ord + Copy> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().await;
            // entries only the map still references are idle
            locks.retain(|k, lock| *k == key || Arc::strong_count(lock) > 1);
            locks.entry(key).or_default().clone()
        };
        entry.lock_owned().await
    }

    /// Locks several keys in ascending order; duplicates are locked once.
    pub async fn lock_many(&self, keys: &[K]) -> Vec<OwnedMutexGuard<()>> {
        let mut ordered = keys.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for key in ordered {
            guards.push(self.lock(key).await);
        }
        guards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::<u64>::new());
        let guard = locks.lock(1).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_other_keys_do_not_block() {
        let locks = KeyedLocks::<u64>::new();
        let _first = locks.lock(1).await;
        let second = tokio::time::timeout(Duration::from_millis(100), locks.lock(2)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_lock_many_dedups() {
        let locks = KeyedLocks::<u64>::new();
        let guards = locks.lock_many(&[3, 1, 3]).await;
        assert_eq!(guards.len(), 2);
    }

    #[tokio::test]
    async fn test_released_keys_are_pruned() {
        let locks = KeyedLocks::<u64>::new();
        for key in 0..10 {
            drop(locks.lock(key).await);
        }
        let held = locks.lock(100).await;
        let _other = locks.lock(200).await;

        assert_eq!(locks.locks.lock().await.len(), 2);
        drop(held);
    }
}
