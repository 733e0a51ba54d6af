use crate::error::KVError;

/// Three-way answer for an existence check.
///
/// `Absent` means the store answered and the key is gone (or expired).
/// `Unreachable` means the store could not answer at all. The session
/// layer treats these opposite ways — reject vs. accept-degraded — so
/// they must never collapse into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
    Unreachable,
}

/// KVStore provides key-value storage where every entry expires.
pub trait KVStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist or
    /// its TTL has elapsed.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError>;

    /// Upsert a key-value pair that expires `ttl_secs` seconds from now.
    fn set_ttl(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), KVError>;

    /// Delete a key. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), KVError>;

    /// Check whether a live entry exists for the key.
    ///
    /// Backend read failures collapse to [`Presence::Unreachable`]: for
    /// this call the only question is whether the store can answer.
    fn exists(&self, key: &str) -> Presence;

    /// Seconds until the key expires. None if the key does not exist or
    /// has already expired.
    fn remaining_ttl(&self, key: &str) -> Result<Option<u64>, KVError>;
}
