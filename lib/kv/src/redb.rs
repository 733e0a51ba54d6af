use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{Database, ReadableTable, TableDefinition};

use crate::error::KVError;
use crate::traits::{KVStore, Presence};

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

/// RedbStore is a KVStore implementation backed by redb — a pure-Rust
/// embedded key-value database.
///
/// redb has no native TTL, so every stored value is prefixed with an
/// 8-byte big-endian unix-seconds expiry. Expired entries read as absent;
/// [`purge_expired`](RedbStore::purge_expired) reclaims their space.
///
/// Error mapping: transaction begin/commit and table-open failures mean the
/// database cannot be transacted against and map to [`KVError::Unreachable`];
/// per-key read/write failures map to [`KVError::Storage`].
pub struct RedbStore {
    db: Arc<Database>,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn encode(value: &[u8], expires_at: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + value.len());
    buf.extend_from_slice(&expires_at.to_be_bytes());
    buf.extend_from_slice(value);
    buf
}

fn decode(raw: &[u8]) -> Result<(u64, &[u8]), KVError> {
    if raw.len() < 8 {
        return Err(KVError::Storage("truncated entry".into()));
    }
    let (header, payload) = raw.split_at(8);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(header);
    Ok((u64::from_be_bytes(bytes), payload))
}

impl RedbStore {
    /// Open or create a redb database at the given path.
    pub fn open(path: &Path) -> Result<Self, KVError> {
        let db = Database::create(path).map_err(|e| KVError::Unreachable(e.to_string()))?;

        // Ensure the table exists by doing a write transaction.
        let write_txn = db
            .begin_write()
            .map_err(|e| KVError::Unreachable(e.to_string()))?;
        {
            let _table = write_txn
                .open_table(TABLE)
                .map_err(|e| KVError::Unreachable(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| KVError::Unreachable(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Remove every expired entry. Returns how many were purged.
    ///
    /// Reads treat expired entries as absent already; this just reclaims
    /// their space. Meant to be called from a periodic maintenance job.
    pub fn purge_expired(&self) -> Result<u64, KVError> {
        let now = unix_now();
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| KVError::Unreachable(e.to_string()))?;
        let purged;
        {
            let mut table = write_txn
                .open_table(TABLE)
                .map_err(|e| KVError::Unreachable(e.to_string()))?;

            let mut expired = Vec::new();
            {
                let iter = table.iter().map_err(|e| KVError::Storage(e.to_string()))?;
                for entry in iter {
                    let (key, value) = entry.map_err(|e| KVError::Storage(e.to_string()))?;
                    let (expires_at, _) = decode(value.value())?;
                    if expires_at <= now {
                        expired.push(key.value().to_string());
                    }
                }
            }

            for key in &expired {
                table
                    .remove(key.as_str())
                    .map_err(|e| KVError::Storage(e.to_string()))?;
            }
            purged = expired.len() as u64;
        }
        write_txn
            .commit()
            .map_err(|e| KVError::Unreachable(e.to_string()))?;

        if purged > 0 {
            tracing::debug!(purged, "removed expired entries");
        }
        Ok(purged)
    }
}

impl KVStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| KVError::Unreachable(e.to_string()))?;
        let table = read_txn
            .open_table(TABLE)
            .map_err(|e| KVError::Unreachable(e.to_string()))?;

        match table.get(key) {
            Ok(Some(raw)) => {
                let (expires_at, payload) = decode(raw.value())?;
                if expires_at <= unix_now() {
                    Ok(None)
                } else {
                    Ok(Some(payload.to_vec()))
                }
            }
            Ok(None) => Ok(None),
            Err(e) => Err(KVError::Storage(e.to_string())),
        }
    }

    fn set_ttl(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), KVError> {
        let encoded = encode(value, unix_now() + ttl_secs);
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| KVError::Unreachable(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(TABLE)
                .map_err(|e| KVError::Unreachable(e.to_string()))?;
            table
                .insert(key, encoded.as_slice())
                .map_err(|e| KVError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| KVError::Unreachable(e.to_string()))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), KVError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| KVError::Unreachable(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(TABLE)
                .map_err(|e| KVError::Unreachable(e.to_string()))?;
            table
                .remove(key)
                .map_err(|e| KVError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| KVError::Unreachable(e.to_string()))?;
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
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| KVError::Unreachable(e.to_string()))?;
        let table = read_txn
            .open_table(TABLE)
            .map_err(|e| KVError::Unreachable(e.to_string()))?;

        match table.get(key) {
            Ok(Some(raw)) => {
                let (expires_at, _) = decode(raw.value())?;
                let now = unix_now();
                if expires_at <= now {
                    Ok(None)
                } else {
                    Ok(Some(expires_at - now))
                }
            }
            Ok(None) => Ok(None),
            Err(e) => Err(KVError::Storage(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> (RedbStore, tempfile::NamedTempFile) {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let store = RedbStore::open(tmp.path()).unwrap();
        (store, tmp)
    }

    #[test]
    fn test_set_get_roundtrip() {
        let (store, _tmp) = open_store();
        store.set_ttl("session:u1", b"tok", 1000).unwrap();

        assert_eq!(store.get("session:u1").unwrap(), Some(b"tok".to_vec()));
        assert_eq!(store.exists("session:u1"), Presence::Present);
        assert_eq!(store.get("session:u2").unwrap(), None);
        assert_eq!(store.exists("session:u2"), Presence::Absent);
    }

    #[test]
    fn test_zero_ttl_reads_as_absent() {
        let (store, _tmp) = open_store();
        store.set_ttl("k", b"v", 0).unwrap();

        assert_eq!(store.get("k").unwrap(), None);
        assert_eq!(store.exists("k"), Presence::Absent);
        assert_eq!(store.remaining_ttl("k").unwrap(), None);
    }

    #[test]
    fn test_remaining_ttl_tracks_expiry() {
        let (store, _tmp) = open_store();
        store.set_ttl("k", b"v", 1000).unwrap();

        let remaining = store.remaining_ttl("k").unwrap().unwrap();
        assert!(remaining <= 1000 && remaining >= 990);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (store, _tmp) = open_store();
        store.set_ttl("k", b"v", 1000).unwrap();

        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.delete("k").unwrap();
    }

    #[test]
    fn test_purge_expired_keeps_live_entries() {
        let (store, _tmp) = open_store();
        store.set_ttl("dead", b"v", 0).unwrap();
        store.set_ttl("live", b"v", 1000).unwrap();

        assert_eq!(store.purge_expired().unwrap(), 1);
        assert_eq!(store.get("live").unwrap(), Some(b"v".to_vec()));

        // Nothing left to purge.
        assert_eq!(store.purge_expired().unwrap(), 0);
    }

    #[test]
    fn test_entries_survive_reopen() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        {
            let store = RedbStore::open(tmp.path()).unwrap();
            store.set_ttl("k", b"v", 1000).unwrap();
        }

        let store = RedbStore::open(tmp.path()).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
    }
}
