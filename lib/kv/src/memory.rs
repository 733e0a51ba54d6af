use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use crate::error::KVError;
use crate::traits::{KVStore, Presence};

/// An entry with its absolute expiry on the store's virtual clock.
struct Entry {
    value: Vec<u8>,
    expires_at: u64,
}

/// In-memory KVStore with TTL support.
///
/// Time is a virtual clock: wall-clock seconds since creation, plus
/// whatever has been added with [`advance`](MemoryStore::advance). Tests
/// drive TTL expiry by advancing the clock instead of sleeping.
///
/// [`set_reachable`](MemoryStore::set_reachable) simulates a store outage:
/// every operation fails with [`KVError::Unreachable`] and `exists` reports
/// [`Presence::Unreachable`]. Entries survive an outage.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    started: Instant,
    offset_secs: AtomicU64,
    reachable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            started: Instant::now(),
            offset_secs: AtomicU64::new(0),
            reachable: AtomicBool::new(true),
        }
    }

    /// Move the virtual clock forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.offset_secs.fetch_add(secs, Ordering::SeqCst);
    }

    /// Toggle simulated reachability.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    fn now(&self) -> u64 {
        self.started.elapsed().as_secs() + self.offset_secs.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<(), KVError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(KVError::Unreachable("memory store marked unreachable".into()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KVStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        self.check_reachable()?;
        let now = self.now();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| KVError::Storage("lock poisoned".into()))?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                // Lazy expiry: drop the dead entry on first sight.
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set_ttl(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), KVError> {
        self.check_reachable()?;
        let expires_at = self.now() + ttl_secs;
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| KVError::Storage("lock poisoned".into()))?;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), KVError> {
        self.check_reachable()?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| KVError::Storage("lock poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Presence {
        match self.get(key) {
            Ok(Some(_)) => Presence::Present,
            Ok(None) => Presence::Absent,
            Err(_) => Presence::Unreachable,
        }
    }

    fn remaining_ttl(&self, key: &str) -> Result<Option<u64>, KVError> {
        self.check_reachable()?;
        let now = self.now();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| KVError::Storage("lock poisoned".into()))?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.expires_at - now)),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_roundtrip() {
        let store = MemoryStore::new();
        store.set_ttl("session:u1", b"tok", 100).unwrap();

        assert_eq!(store.get("session:u1").unwrap(), Some(b"tok".to_vec()));
        assert_eq!(store.get("session:u2").unwrap(), None);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let store = MemoryStore::new();
        store.set_ttl("k", b"v", 10).unwrap();

        store.advance(9);
        assert_eq!(store.exists("k"), Presence::Present);

        store.advance(2);
        assert_eq!(store.get("k").unwrap(), None);
        assert_eq!(store.exists("k"), Presence::Absent);
        assert_eq!(store.remaining_ttl("k").unwrap(), None);
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let store = MemoryStore::new();
        store.set_ttl("k", b"v", 0).unwrap();

        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_remaining_ttl_counts_down() {
        let store = MemoryStore::new();
        store.set_ttl("k", b"v", 100).unwrap();

        store.advance(40);
        assert_eq!(store.remaining_ttl("k").unwrap(), Some(60));
    }

    #[test]
    fn test_overwrite_replaces_value_and_ttl() {
        let store = MemoryStore::new();
        store.set_ttl("k", b"old", 10).unwrap();
        store.set_ttl("k", b"new", 100).unwrap();

        assert_eq!(store.get("k").unwrap(), Some(b"new".to_vec()));
        assert_eq!(store.remaining_ttl("k").unwrap(), Some(100));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.set_ttl("k", b"v", 100).unwrap();

        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);

        // Absent key: still Ok.
        store.delete("k").unwrap();
    }

    #[test]
    fn test_unreachable_store_fails_everything() {
        let store = MemoryStore::new();
        store.set_ttl("k", b"v", 100).unwrap();

        store.set_reachable(false);

        assert!(matches!(store.get("k"), Err(KVError::Unreachable(_))));
        assert!(matches!(
            store.set_ttl("k2", b"v", 100),
            Err(KVError::Unreachable(_))
        ));
        assert!(matches!(store.delete("k"), Err(KVError::Unreachable(_))));
        assert!(matches!(
            store.remaining_ttl("k"),
            Err(KVError::Unreachable(_))
        ));
        assert_eq!(store.exists("k"), Presence::Unreachable);

        // Entries survive the outage.
        store.set_reachable(true);
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
    }
}
